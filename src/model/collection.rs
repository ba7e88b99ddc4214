use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::container::Container;
use super::item::{ContainerId, ItemId, ItemRef};

/// The full set of containers for one board, list, or portfolio.
///
/// Containers keep the order in which they were loaded. The collection is
/// only ever mutated through [`crate::ops::reorder::MoveEffect::apply_to`],
/// which swaps whole containers so an item and its owning container never
/// disagree once the call returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CollectionRepr", into = "CollectionRepr")]
pub struct Collection {
    parent_id: String,
    containers: IndexMap<ContainerId, Container>,
}

/// On-disk / on-wire shape: containers as an ordered list.
#[derive(Serialize, Deserialize)]
struct CollectionRepr {
    parent_id: String,
    #[serde(default)]
    containers: Vec<Container>,
}

impl TryFrom<CollectionRepr> for Collection {
    type Error = String;

    fn try_from(repr: CollectionRepr) -> Result<Self, Self::Error> {
        let mut collection = Collection::new(repr.parent_id);
        for container in repr.containers {
            if collection.containers.contains_key(&container.id) {
                return Err(format!("duplicate container id: {}", container.id));
            }
            collection.containers.insert(container.id.clone(), container);
        }
        Ok(collection)
    }
}

impl From<Collection> for CollectionRepr {
    fn from(collection: Collection) -> Self {
        CollectionRepr {
            parent_id: collection.parent_id,
            containers: collection.containers.into_values().collect(),
        }
    }
}

impl Collection {
    /// An empty collection for the given parent entity (project, portfolio).
    pub fn new(parent_id: impl Into<String>) -> Self {
        Collection {
            parent_id: parent_id.into(),
            containers: IndexMap::new(),
        }
    }

    /// Builder-style: append a container. A container with the same id is
    /// replaced in place.
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.insert(container.id.clone(), container);
        self
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    /// Containers in display order.
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Total number of items across all containers.
    pub fn item_count(&self) -> usize {
        self.containers.values().map(Container::len).sum()
    }

    /// Find which container lists `item_id` and at what index.
    pub fn locate(&self, item_id: &ItemId) -> Option<(&ContainerId, usize)> {
        self.containers
            .iter()
            .find_map(|(cid, c)| c.position(item_id).map(|idx| (cid, idx)))
    }

    pub fn item(&self, item_id: &ItemId) -> Option<&ItemRef> {
        self.containers
            .values()
            .flat_map(|c| c.items.iter())
            .find(|item| &item.id == item_id)
    }

    pub(crate) fn containers_mut(&mut self) -> impl Iterator<Item = &mut Container> {
        self.containers.values_mut()
    }

    /// Swap in a recomputed container. Only the reorder engine calls this.
    pub(crate) fn replace_container(&mut self, container: Container) {
        if let Some(slot) = self.containers.get_mut(&container.id) {
            *slot = container;
        }
    }
}
