use std::collections::HashMap;

use serde::Serialize;

use crate::model::collection::Collection;
use crate::model::container::Container;
use crate::model::item::{ContainerId, ItemId};

/// Structured result from `bsync check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// An ordering invariant that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// `items[index].order != index`
    #[serde(rename = "order_gap")]
    OrderGap {
        container_id: ContainerId,
        item_id: ItemId,
        index: usize,
        order: usize,
    },
    /// The item's denormalized owner disagrees with the container listing it
    #[serde(rename = "backlink_mismatch")]
    BacklinkMismatch {
        container_id: ContainerId,
        item_id: ItemId,
        claimed: ContainerId,
    },
    /// The same item is listed more than once
    #[serde(rename = "duplicate_item")]
    DuplicateItem {
        item_id: ItemId,
        container_ids: Vec<ContainerId>,
    },
}

/// A non-critical issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    #[serde(rename = "untitled_item")]
    UntitledItem {
        container_id: ContainerId,
        item_id: ItemId,
    },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a collection's ordering invariants. Read-only.
///
/// Checks performed:
/// 1. Every container's `order` values are contiguous from 0
/// 2. Every item's `container_id` matches the container that lists it
/// 3. No item id is listed twice
pub fn check_collection(collection: &Collection) -> CheckResult {
    let mut result = CheckResult::default();

    for (item_id, container_ids) in find_duplicate_items(collection) {
        result.errors.push(CheckError::DuplicateItem {
            item_id,
            container_ids,
        });
    }

    for container in collection.containers() {
        check_container(container, &mut result);
    }

    result.valid = result.errors.is_empty();
    result
}

fn check_container(container: &Container, result: &mut CheckResult) {
    for (index, item) in container.items.iter().enumerate() {
        if item.order != index {
            result.errors.push(CheckError::OrderGap {
                container_id: container.id.clone(),
                item_id: item.id.clone(),
                index,
                order: item.order,
            });
        }
        if item.container_id != container.id {
            result.errors.push(CheckError::BacklinkMismatch {
                container_id: container.id.clone(),
                item_id: item.id.clone(),
                claimed: item.container_id.clone(),
            });
        }
        if item.title.trim().is_empty() {
            result.warnings.push(CheckWarning::UntitledItem {
                container_id: container.id.clone(),
                item_id: item.id.clone(),
            });
        }
    }
}

fn find_duplicate_items(collection: &Collection) -> Vec<(ItemId, Vec<ContainerId>)> {
    let mut seen: HashMap<&ItemId, Vec<ContainerId>> = HashMap::new();
    for container in collection.containers() {
        for item in &container.items {
            seen.entry(&item.id).or_default().push(container.id.clone());
        }
    }
    let mut dups: Vec<(ItemId, Vec<ContainerId>)> = seen
        .into_iter()
        .filter(|(_, cids)| cids.len() > 1)
        .map(|(id, cids)| (id.clone(), cids))
        .collect();
    dups.sort_by(|a, b| a.0.cmp(&b.0));
    dups
}
