use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::model::collection::Collection;
use crate::model::container::Container;
use crate::model::item::{ContainerId, ItemId, ItemRef};
use crate::ops::reorder::{self, MoveEffect};

/// Error type for remote calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("rejected by remote: {0}")]
    Rejected(String),
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
}

/// A single remote call implied by a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RemoteCall {
    /// Persist the full order of one container.
    ReorderItemsInContainer {
        container_id: ContainerId,
        ordered_item_ids: Vec<ItemId>,
    },
    /// Persist an item's new owning container and position.
    MoveItemToContainer {
        item_id: ItemId,
        dest_container_id: ContainerId,
        dest_index: usize,
    },
}

impl RemoteCall {
    /// The calls that persist a computed move: one reorder for a
    /// same-container move; a move followed by a reorder of the destination
    /// for a cross-container move.
    pub fn for_effect(effect: &MoveEffect) -> Vec<RemoteCall> {
        match effect {
            MoveEffect::Unchanged => Vec::new(),
            MoveEffect::Reordered(container) => vec![RemoteCall::ReorderItemsInContainer {
                container_id: container.id.clone(),
                ordered_item_ids: container.item_ids(),
            }],
            MoveEffect::Moved {
                item_id,
                dest,
                dest_index,
                ..
            } => vec![
                RemoteCall::MoveItemToContainer {
                    item_id: item_id.clone(),
                    dest_container_id: dest.id.clone(),
                    dest_index: *dest_index,
                },
                RemoteCall::ReorderItemsInContainer {
                    container_id: dest.id.clone(),
                    ordered_item_ids: dest.item_ids(),
                },
            ],
        }
    }
}

/// The operations the sync controller drives on the remote entity store.
///
/// The controller only ever talks to this trait. [`MemoryRemote`] is an
/// in-process implementation with a call log and fault injection; the
/// file-backed one lives in [`crate::io::file_remote`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn reorder_items_in_container(
        &self,
        container_id: &ContainerId,
        ordered_item_ids: &[ItemId],
    ) -> Result<(), RemoteError>;

    async fn move_item_to_container(
        &self,
        item_id: &ItemId,
        dest_container_id: &ContainerId,
        dest_index: usize,
    ) -> Result<ItemRef, RemoteError>;

    async fn load_collection(&self, parent_id: &str) -> Result<Collection, RemoteError>;
}

/// Issue one [`RemoteCall`] against a store.
pub async fn send(remote: &dyn RemoteStore, call: &RemoteCall) -> Result<(), RemoteError> {
    match call {
        RemoteCall::ReorderItemsInContainer {
            container_id,
            ordered_item_ids,
        } => remote.reorder_items_in_container(container_id, ordered_item_ids).await,
        RemoteCall::MoveItemToContainer {
            item_id,
            dest_container_id,
            dest_index,
        } => remote
            .move_item_to_container(item_id, dest_container_id, *dest_index)
            .await
            .map(|_| ()),
    }
}

// ---------------------------------------------------------------------------
// Store-side semantics shared by the in-memory and file-backed stores
// ---------------------------------------------------------------------------

/// Apply a full-order update. The id list must be a permutation of the
/// container's current items.
pub fn apply_reorder(
    collection: &mut Collection,
    container_id: &ContainerId,
    ordered_item_ids: &[ItemId],
) -> Result<(), RemoteError> {
    let container = collection
        .container(container_id)
        .ok_or_else(|| RemoteError::Rejected(format!("unknown container {}", container_id)))?;

    let current: HashSet<&ItemId> = container.items.iter().map(|i| &i.id).collect();
    let requested: HashSet<&ItemId> = ordered_item_ids.iter().collect();
    if requested.len() != ordered_item_ids.len() || current != requested {
        return Err(RemoteError::Rejected(format!(
            "order for {} does not match its items",
            container_id
        )));
    }

    let mut items = Vec::with_capacity(ordered_item_ids.len());
    for id in ordered_item_ids {
        if let Some(item) = container.items.iter().find(|i| &i.id == id) {
            items.push(item.clone());
        }
    }
    let next = Container::with_items(container.id.clone(), container.title.clone(), items);
    MoveEffect::Reordered(next).apply_to(collection);
    Ok(())
}

/// Move an item to `dest_container_id` at `dest_index`, wherever it
/// currently lives. Returns the updated item.
pub fn apply_move(
    collection: &mut Collection,
    item_id: &ItemId,
    dest_container_id: &ContainerId,
    dest_index: usize,
) -> Result<ItemRef, RemoteError> {
    let rejected = |e: reorder::ReorderError| RemoteError::Rejected(e.to_string());

    let (source_id, source_index) = collection
        .locate(item_id)
        .map(|(cid, idx)| (cid.clone(), idx))
        .ok_or_else(|| RemoteError::Rejected(format!("unknown item {}", item_id)))?;
    let dest = collection
        .container(dest_container_id)
        .ok_or_else(|| RemoteError::Rejected(format!("unknown container {}", dest_container_id)))?;
    let source = collection
        .container(&source_id)
        .ok_or_else(|| RemoteError::Rejected(format!("unknown container {}", source_id)))?;

    let effect = if source_id == *dest_container_id {
        MoveEffect::Reordered(
            reorder::reorder_within_container(source, source_index, dest_index).map_err(rejected)?,
        )
    } else {
        let (source, dest) =
            reorder::move_between_containers(source, dest, item_id, dest_index).map_err(rejected)?;
        MoveEffect::Moved {
            item_id: item_id.clone(),
            dest_index: dest.position(item_id).unwrap_or(0),
            source,
            dest,
        }
    };
    effect.apply_to(collection);

    collection
        .item(item_id)
        .cloned()
        .ok_or_else(|| RemoteError::Rejected(format!("unknown item {}", item_id)))
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-process authoritative store.
///
/// Records every call it receives (including rejected ones) and can be told
/// to reject, hang, or hold calls until released.
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    gate: watch::Sender<bool>,
}

#[derive(Default)]
struct MemoryState {
    collection: Option<Collection>,
    calls: Vec<RemoteCall>,
    reject_moves: Vec<String>,
    reject_reorders: Vec<String>,
    hang: bool,
}

impl MemoryRemote {
    pub fn new(collection: Collection) -> Self {
        let (gate, _) = watch::channel(true);
        MemoryRemote {
            state: Mutex::new(MemoryState {
                collection: Some(collection),
                ..Default::default()
            }),
            gate,
        }
    }

    /// Reject the next `move_item_to_container` call with `reason`.
    pub fn reject_next_move(&self, reason: impl Into<String>) {
        self.lock().reject_moves.push(reason.into());
    }

    /// Reject the next `reorder_items_in_container` call with `reason`.
    pub fn reject_next_reorder(&self, reason: impl Into<String>) {
        self.lock().reject_reorders.push(reason.into());
    }

    /// Make every subsequent call never answer.
    pub fn hang_calls(&self) {
        self.lock().hang = true;
    }

    /// Park incoming calls and loads until [`MemoryRemote::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// The store's current authoritative collection.
    pub fn collection(&self) -> Collection {
        self.lock()
            .collection
            .clone()
            .unwrap_or_else(|| Collection::new(""))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn wait_open(&self) {
        let mut open = self.gate.subscribe();
        let _ = open.wait_for(|is_open| *is_open).await;
    }

    async fn admit(&self, call: RemoteCall) {
        self.wait_open().await;
        let hang = {
            let mut state = self.lock();
            state.calls.push(call);
            state.hang
        };
        if hang {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn reorder_items_in_container(
        &self,
        container_id: &ContainerId,
        ordered_item_ids: &[ItemId],
    ) -> Result<(), RemoteError> {
        self.admit(RemoteCall::ReorderItemsInContainer {
            container_id: container_id.clone(),
            ordered_item_ids: ordered_item_ids.to_vec(),
        })
        .await;

        let mut state = self.lock();
        if !state.reject_reorders.is_empty() {
            return Err(RemoteError::Rejected(state.reject_reorders.remove(0)));
        }
        let collection = state
            .collection
            .as_mut()
            .ok_or_else(|| RemoteError::Transport("store not loaded".into()))?;
        apply_reorder(collection, container_id, ordered_item_ids)
    }

    async fn move_item_to_container(
        &self,
        item_id: &ItemId,
        dest_container_id: &ContainerId,
        dest_index: usize,
    ) -> Result<ItemRef, RemoteError> {
        self.admit(RemoteCall::MoveItemToContainer {
            item_id: item_id.clone(),
            dest_container_id: dest_container_id.clone(),
            dest_index,
        })
        .await;

        let mut state = self.lock();
        if !state.reject_moves.is_empty() {
            return Err(RemoteError::Rejected(state.reject_moves.remove(0)));
        }
        let collection = state
            .collection
            .as_mut()
            .ok_or_else(|| RemoteError::Transport("store not loaded".into()))?;
        apply_move(collection, item_id, dest_container_id, dest_index)
    }

    async fn load_collection(&self, parent_id: &str) -> Result<Collection, RemoteError> {
        self.wait_open().await;
        let state = self.lock();
        match &state.collection {
            Some(c) if c.parent_id() == parent_id => Ok(c.clone()),
            _ => Err(RemoteError::Rejected(format!("unknown parent {}", parent_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn board() -> Collection {
        Collection::new("p")
            .with_container(Container::with_items(
                "todo",
                "To do",
                vec![ItemRef::new("A", "todo", "a"), ItemRef::new("B", "todo", "b")],
            ))
            .with_container(Container::new("done", "Done"))
    }

    fn ids(c: &Collection, container: &str) -> Vec<String> {
        c.container(&ContainerId::new(container))
            .unwrap()
            .items
            .iter()
            .map(|i| i.id.to_string())
            .collect()
    }

    #[test]
    fn test_apply_reorder_permutation() {
        let mut c = board();
        apply_reorder(&mut c, &ContainerId::new("todo"), &[ItemId::new("B"), ItemId::new("A")]).unwrap();
        assert_eq!(ids(&c, "todo"), vec!["B", "A"]);
        assert_eq!(c.item(&ItemId::new("A")).unwrap().order, 1);
    }

    #[test]
    fn test_apply_reorder_rejects_non_permutation() {
        let mut c = board();
        let err = apply_reorder(&mut c, &ContainerId::new("todo"), &[ItemId::new("A"), ItemId::new("A")])
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
        let err = apply_reorder(&mut c, &ContainerId::new("todo"), &[ItemId::new("A")]).unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
        assert_eq!(c, board());
    }

    #[test]
    fn test_apply_move_cross_container() {
        let mut c = board();
        let item = apply_move(&mut c, &ItemId::new("A"), &ContainerId::new("done"), 3).unwrap();
        assert_eq!(item.container_id, ContainerId::new("done"));
        assert_eq!(item.order, 0);
        assert_eq!(ids(&c, "todo"), vec!["B"]);
        assert_eq!(ids(&c, "done"), vec!["A"]);
    }

    #[test]
    fn test_apply_move_within_container() {
        let mut c = board();
        apply_move(&mut c, &ItemId::new("A"), &ContainerId::new("todo"), 1).unwrap();
        assert_eq!(ids(&c, "todo"), vec!["B", "A"]);
    }

    #[test]
    fn test_calls_for_cross_container_effect() {
        let c = board();
        let effect = reorder::compute_move(
            &c,
            &reorder::MoveOperation {
                item_id: ItemId::new("A"),
                source_container_id: ContainerId::new("todo"),
                source_index: 0,
                dest_container_id: ContainerId::new("done"),
                dest_index: 0,
            },
        )
        .unwrap();
        assert_eq!(
            RemoteCall::for_effect(&effect),
            vec![
                RemoteCall::MoveItemToContainer {
                    item_id: ItemId::new("A"),
                    dest_container_id: ContainerId::new("done"),
                    dest_index: 0,
                },
                RemoteCall::ReorderItemsInContainer {
                    container_id: ContainerId::new("done"),
                    ordered_item_ids: vec![ItemId::new("A")],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_memory_remote_records_rejected_calls() {
        let remote = MemoryRemote::new(board());
        remote.reject_next_move("validation failed");
        let err = remote
            .move_item_to_container(&ItemId::new("A"), &ContainerId::new("done"), 0)
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Rejected("validation failed".into()));
        assert_eq!(remote.calls().len(), 1);
        assert_eq!(remote.collection(), board());

        // Fault is consumed; the next call goes through.
        remote
            .move_item_to_container(&ItemId::new("A"), &ContainerId::new("done"), 0)
            .await
            .unwrap();
        assert_eq!(ids(&remote.collection(), "done"), vec!["A"]);
    }

    #[tokio::test]
    async fn test_memory_remote_load() {
        let remote = MemoryRemote::new(board());
        assert_eq!(remote.load_collection("p").await.unwrap(), board());
        assert!(remote.load_collection("other").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_remote_hold_parks_load() {
        let remote = Arc::new(MemoryRemote::new(board()));
        remote.hold();
        let load = tokio::spawn({
            let remote = remote.clone();
            async move { remote.load_collection("p").await }
        });
        tokio::task::yield_now().await;
        assert!(!load.is_finished());

        remote.release();
        assert_eq!(load.await.unwrap().unwrap(), board());
        assert!(remote.calls().is_empty());
    }
}
