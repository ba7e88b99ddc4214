use serde::{Deserialize, Serialize};

use crate::model::collection::Collection;
use crate::model::container::Container;
use crate::model::item::{ContainerId, ItemId};
use crate::ops::order::renumber_in_place;

/// Error type for the reorder engine. Every variant is a precondition
/// violation: the caller passed indices or ids that do not match the
/// current state. Nothing is mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("item not found in source: no item at {container}[{index}] (len {len})")]
    SourceIndexOutOfRange {
        container: ContainerId,
        index: usize,
        len: usize,
    },
    #[error("item not found in source: {item} is not in {container}")]
    ItemNotInSource { item: ItemId, container: ContainerId },
    #[error("item not found in source: {item} is not at {container}[{index}]")]
    ItemIndexMismatch {
        item: ItemId,
        container: ContainerId,
        index: usize,
    },
    #[error("container not found: {0}")]
    ContainerNotFound(ContainerId),
    #[error("source and destination are the same container: {0}")]
    SameContainer(ContainerId),
}

/// One drag-drop gesture. Transient: used to compute the next collection
/// state and the remote calls it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOperation {
    pub item_id: ItemId,
    pub source_container_id: ContainerId,
    pub source_index: usize,
    pub dest_container_id: ContainerId,
    pub dest_index: usize,
}

impl MoveOperation {
    /// Same container and same index.
    pub fn is_noop(&self) -> bool {
        self.source_container_id == self.dest_container_id && self.source_index == self.dest_index
    }

    pub fn is_cross_container(&self) -> bool {
        self.source_container_id != self.dest_container_id
    }
}

/// The container state a move produces.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveEffect {
    /// Nothing changes; no remote call is needed.
    Unchanged,
    /// Same-container reorder.
    Reordered(Container),
    /// Cross-container move. `dest_index` is where the item actually landed
    /// after clamping.
    Moved {
        item_id: ItemId,
        source: Container,
        dest: Container,
        dest_index: usize,
    },
}

impl MoveEffect {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, MoveEffect::Unchanged)
    }

    /// The recomputed containers this effect writes.
    pub fn containers(&self) -> Vec<&Container> {
        match self {
            MoveEffect::Unchanged => Vec::new(),
            MoveEffect::Reordered(container) => vec![container],
            MoveEffect::Moved { source, dest, .. } => vec![source, dest],
        }
    }

    /// Write the recomputed containers into the collection. Containers are
    /// swapped whole, so item backlinks and container listings change
    /// together.
    pub fn apply_to(self, collection: &mut Collection) {
        match self {
            MoveEffect::Unchanged => {}
            MoveEffect::Reordered(container) => collection.replace_container(container),
            MoveEffect::Moved { source, dest, .. } => {
                collection.replace_container(source);
                collection.replace_container(dest);
            }
        }
    }
}

/// Remove the item at `source_index` and reinsert it at `dest_index`, where
/// `dest_index` counts positions in the sequence after removal (standard
/// drag-list semantics). Indices past the end clamp to the end.
pub fn reorder_within_container(
    container: &Container,
    source_index: usize,
    dest_index: usize,
) -> Result<Container, ReorderError> {
    if source_index >= container.len() {
        return Err(ReorderError::SourceIndexOutOfRange {
            container: container.id.clone(),
            index: source_index,
            len: container.len(),
        });
    }
    if source_index == dest_index {
        return Ok(container.clone());
    }

    let mut next = container.clone();
    let item = next.items.remove(source_index);
    let dest_index = dest_index.min(next.items.len());
    next.items.insert(dest_index, item);
    renumber_in_place(&mut next.items);
    Ok(next)
}

/// Take `item_id` out of `source` and splice it into `dest` at `dest_index`
/// (clamped to `0..=dest.len()`). The moved item lands before whatever
/// currently occupies `dest_index`. Both containers are renumbered
/// independently; the item's domain fields are left alone.
pub fn move_between_containers(
    source: &Container,
    dest: &Container,
    item_id: &ItemId,
    dest_index: usize,
) -> Result<(Container, Container), ReorderError> {
    if source.id == dest.id {
        return Err(ReorderError::SameContainer(source.id.clone()));
    }
    let idx = source
        .position(item_id)
        .ok_or_else(|| ReorderError::ItemNotInSource {
            item: item_id.clone(),
            container: source.id.clone(),
        })?;

    let mut next_source = source.clone();
    let mut next_dest = dest.clone();

    let mut item = next_source.items.remove(idx);
    item.container_id = next_dest.id.clone();
    let dest_index = dest_index.min(next_dest.items.len());
    next_dest.items.insert(dest_index, item);

    renumber_in_place(&mut next_source.items);
    renumber_in_place(&mut next_dest.items);
    Ok((next_source, next_dest))
}

/// Compute what a move operation does to a collection, without touching it.
///
/// Fails fast if the stated source position does not hold `op.item_id`:
/// indices from a stale render must not be acted on.
pub fn compute_move(collection: &Collection, op: &MoveOperation) -> Result<MoveEffect, ReorderError> {
    let source = collection
        .container(&op.source_container_id)
        .ok_or_else(|| ReorderError::ContainerNotFound(op.source_container_id.clone()))?;
    let dest = collection
        .container(&op.dest_container_id)
        .ok_or_else(|| ReorderError::ContainerNotFound(op.dest_container_id.clone()))?;

    let at_source = source
        .items
        .get(op.source_index)
        .ok_or_else(|| ReorderError::SourceIndexOutOfRange {
            container: source.id.clone(),
            index: op.source_index,
            len: source.len(),
        })?;
    if at_source.id != op.item_id {
        return Err(if source.contains(&op.item_id) {
            ReorderError::ItemIndexMismatch {
                item: op.item_id.clone(),
                container: source.id.clone(),
                index: op.source_index,
            }
        } else {
            ReorderError::ItemNotInSource {
                item: op.item_id.clone(),
                container: source.id.clone(),
            }
        });
    }

    if !op.is_cross_container() {
        if op.is_noop() {
            return Ok(MoveEffect::Unchanged);
        }
        let next = reorder_within_container(source, op.source_index, op.dest_index)?;
        // Dropping the last item past the end leaves it where it was.
        if next.item_ids() == source.item_ids() {
            return Ok(MoveEffect::Unchanged);
        }
        return Ok(MoveEffect::Reordered(next));
    }

    let (next_source, next_dest) = move_between_containers(source, dest, &op.item_id, op.dest_index)?;
    Ok(MoveEffect::Moved {
        item_id: op.item_id.clone(),
        dest_index: op.dest_index.min(dest.len()),
        source: next_source,
        dest: next_dest,
    })
}
