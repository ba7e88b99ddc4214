use crate::model::item::ItemRef;

/// Assign `order = 0..n-1` following the sequence as it stands.
///
/// Never sorts: the caller has already decided the sequence. Idempotent.
pub fn renumber(mut items: Vec<ItemRef>) -> Vec<ItemRef> {
    renumber_in_place(&mut items);
    items
}

/// In-place variant of [`renumber`].
pub fn renumber_in_place(items: &mut [ItemRef]) {
    for (i, item) in items.iter_mut().enumerate() {
        item.order = i;
    }
}

/// True when `items[i].order == i` for every item.
pub fn is_contiguous(items: &[ItemRef]) -> bool {
    items.iter().enumerate().all(|(i, item)| item.order == i)
}
