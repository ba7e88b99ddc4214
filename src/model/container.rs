use serde::{Deserialize, Serialize};

use super::item::{ContainerId, ItemId, ItemRef};

/// An ordered group of items: a board section, a list section, or a
/// portfolio's project list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    /// Section heading shown above the items
    #[serde(default)]
    pub title: String,
    /// Items in display order; `items[i].order == i` when valid
    #[serde(default)]
    pub items: Vec<ItemRef>,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, title: impl Into<String>) -> Self {
        Container {
            id: id.into(),
            title: title.into(),
            items: Vec::new(),
        }
    }

    /// Build a container from items already in display order. Each item is
    /// claimed by this container and numbered by its position.
    pub fn with_items(
        id: impl Into<ContainerId>,
        title: impl Into<String>,
        items: Vec<ItemRef>,
    ) -> Self {
        let id = id.into();
        let items = items
            .into_iter()
            .enumerate()
            .map(|(i, mut item)| {
                item.container_id = id.clone();
                item.order = i;
                item
            })
            .collect();
        Container {
            id,
            title: title.into(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the item with this id, if the container lists it.
    pub fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == item_id)
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.position(item_id).is_some()
    }

    /// Item ids in display order, as sent to the remote store.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }
}
