use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::model::collection::Collection;
use crate::model::config::SyncSettings;
use crate::model::item::ItemId;
use crate::ops::order::is_contiguous;
use crate::ops::reorder::{self, MoveOperation, ReorderError};

use super::handle::{self, CollectionHandle, Notice, NoticeKind, SyncPhase};
use super::remote::{self, RemoteCall, RemoteError, RemoteStore};

/// Error type for sync controller operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("a move is already in flight for {0}")]
    Busy(String),
    #[error(transparent)]
    Precondition(#[from] ReorderError),
    #[error("collection is no longer mounted")]
    Closed,
    #[error("reload failed: {0}")]
    Reload(RemoteError),
    #[error("no tokio runtime to confirm the move on")]
    NoRuntime,
}

/// Terminal state of one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The move changed nothing; no remote call was made.
    Unchanged,
    /// Every remote call succeeded.
    Committed,
    /// A remote call failed; the collection was restored.
    RolledBack { error: RemoteError },
    /// The collection was replaced or unmounted while confirming; the answer
    /// was dropped.
    Discarded,
}

/// A move that has been applied locally and still needs confirming.
///
/// Holds the pre-move collection. Dropping an unsettled move (an aborted
/// confirmation task, a runtime shutting down) restores that collection and
/// reopens dragging, as a failed confirmation would.
#[must_use = "a pending move keeps dragging disabled until it is confirmed"]
#[derive(Debug)]
pub struct PendingMove {
    op: MoveOperation,
    calls: Vec<RemoteCall>,
    handle: CollectionHandle,
    generation: u64,
    /// `None` once the move has settled.
    snapshot: Option<Collection>,
}

impl PendingMove {
    pub fn operation(&self) -> &MoveOperation {
        &self.op
    }

    /// The remote calls [`SyncController::confirm`] will issue, in order.
    pub fn calls(&self) -> &[RemoteCall] {
        &self.calls
    }

    fn settle(&mut self) -> Option<Collection> {
        self.snapshot.take()
    }
}

impl Drop for PendingMove {
    fn drop(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        let mut shared = self.handle.lock();
        if !shared.live || shared.generation != self.generation {
            return;
        }
        warn!(item = %self.op.item_id, phase = ?shared.phase, "move abandoned before confirmation, rolling back");
        shared.collection = snapshot;
        shared.phase = SyncPhase::Idle;
        shared
            .notices
            .push(failure_notice(&self.op.item_id, self.op.is_cross_container()));
    }
}

/// Marks a collection as reloading. Dropped without a new collection (load
/// failed, or the reload future was cancelled) it reopens dragging.
struct ReloadClaim {
    handle: CollectionHandle,
    generation: u64,
}

impl ReloadClaim {
    fn finish(self, collection: Collection) -> Result<(), SyncError> {
        let mut shared = self.handle.lock();
        if !shared.live {
            return Err(SyncError::Closed);
        }
        if shared.generation != self.generation {
            debug!("collection replaced during reload; keeping the newer one");
            return Ok(());
        }
        shared.collection = handle::normalize(collection);
        shared.generation += 1;
        shared.phase = SyncPhase::Idle;
        Ok(())
    }
}

impl Drop for ReloadClaim {
    fn drop(&mut self) {
        let mut shared = self.handle.lock();
        if shared.generation == self.generation && shared.phase == SyncPhase::Reloading {
            shared.phase = SyncPhase::Idle;
        }
    }
}

/// Drives moves for one collection against a remote store.
///
/// A move goes Idle → AppliedLocally → Confirming and ends Committed or
/// RolledBack. If any remote call fails, including only the second of two,
/// the pre-move collection is written back verbatim. At most one move or
/// reload per collection is past Idle.
#[derive(Clone)]
pub struct SyncController {
    handle: CollectionHandle,
    remote: Arc<dyn RemoteStore>,
    settings: SyncSettings,
}

impl SyncController {
    pub fn new(handle: CollectionHandle, remote: Arc<dyn RemoteStore>, settings: SyncSettings) -> Self {
        SyncController {
            handle,
            remote,
            settings,
        }
    }

    pub fn handle(&self) -> &CollectionHandle {
        &self.handle
    }

    /// Apply a move and wait for the remote store to confirm it.
    pub async fn submit(&self, op: MoveOperation) -> Result<Outcome, SyncError> {
        match self.begin(op)? {
            Some(pending) => Ok(self.confirm(pending).await),
            None => Ok(Outcome::Unchanged),
        }
    }

    /// Synchronous half of a move: compute the new state and write it into
    /// the collection. Returns `None` when the move changes nothing.
    ///
    /// Fails without touching anything if another move or a reload is in
    /// flight, or the operation does not match the current state.
    pub fn begin(&self, op: MoveOperation) -> Result<Option<PendingMove>, SyncError> {
        let mut shared = self.handle.lock();
        if !shared.live {
            return Err(SyncError::Closed);
        }
        if shared.phase != SyncPhase::Idle {
            warn!(item = %op.item_id, phase = ?shared.phase, "move rejected: collection is busy");
            return Err(SyncError::Busy(shared.collection.parent_id().to_string()));
        }

        let effect = match reorder::compute_move(&shared.collection, &op) {
            Ok(effect) => effect,
            Err(e) => {
                error!(item = %op.item_id, container = %op.source_container_id, "move precondition failed: {e}");
                return Err(e.into());
            }
        };
        if effect.is_unchanged() {
            debug!(item = %op.item_id, "move is a no-op");
            return Ok(None);
        }

        debug_assert!(effect.containers().iter().all(|c| is_contiguous(&c.items)));
        let calls = RemoteCall::for_effect(&effect);
        let snapshot = shared.collection.clone();
        effect.apply_to(&mut shared.collection);
        shared.phase = SyncPhase::AppliedLocally;

        debug!(
            item = %op.item_id,
            from = %op.source_container_id,
            to = %op.dest_container_id,
            index = op.dest_index,
            "applied locally"
        );
        Ok(Some(PendingMove {
            op,
            calls,
            handle: self.handle.clone(),
            generation: shared.generation,
            snapshot: Some(snapshot),
        }))
    }

    /// Asynchronous half of a move: issue the remote calls and commit or roll
    /// back. Never writes into a collection that was replaced or unmounted
    /// since [`SyncController::begin`].
    pub async fn confirm(&self, mut pending: PendingMove) -> Outcome {
        {
            let mut shared = self.handle.lock();
            if !self.is_current(shared.live, shared.generation, &pending) {
                pending.settle();
                return Outcome::Discarded;
            }
            shared.phase = SyncPhase::Confirming;
        }

        let result = self.send_all(&pending.calls).await;

        let mut shared = self.handle.lock();
        let snapshot = pending.settle();
        if !self.is_current(shared.live, shared.generation, &pending) {
            debug!(item = %pending.op.item_id, "collection went stale while confirming; dropping result");
            return Outcome::Discarded;
        }
        shared.phase = SyncPhase::Idle;

        match result {
            Ok(()) => {
                info!(item = %pending.op.item_id, calls = pending.calls.len(), "move committed");
                Outcome::Committed
            }
            Err(e) => {
                warn!(item = %pending.op.item_id, "move failed, rolling back: {e}");
                if let Some(snapshot) = snapshot {
                    shared.collection = snapshot;
                }
                shared
                    .notices
                    .push(failure_notice(&pending.op.item_id, pending.op.is_cross_container()));
                Outcome::RolledBack { error: e }
            }
        }
    }

    /// Fetch the collection again and replace the local state with it.
    /// Dragging is disabled until the fetch settles.
    pub async fn reload(&self) -> Result<(), SyncError> {
        let (parent_id, claim) = {
            let mut shared = self.handle.lock();
            if !shared.live {
                return Err(SyncError::Closed);
            }
            if shared.phase != SyncPhase::Idle {
                return Err(SyncError::Busy(shared.collection.parent_id().to_string()));
            }
            shared.phase = SyncPhase::Reloading;
            let claim = ReloadClaim {
                handle: self.handle.clone(),
                generation: shared.generation,
            };
            (shared.collection.parent_id().to_string(), claim)
        };

        let timeout = self.settings.remote_timeout();
        let collection = tokio::time::timeout(timeout, self.remote.load_collection(&parent_id))
            .await
            .unwrap_or(Err(RemoteError::Timeout(timeout)))
            .map_err(SyncError::Reload)?;
        claim.finish(collection)
    }

    fn is_current(&self, live: bool, generation: u64, pending: &PendingMove) -> bool {
        live && generation == pending.generation
    }

    /// Issue calls in order, stopping at the first failure. Each call is
    /// bounded by the configured timeout.
    async fn send_all(&self, calls: &[RemoteCall]) -> Result<(), RemoteError> {
        let timeout: Duration = self.settings.remote_timeout();
        for call in calls {
            match tokio::time::timeout(timeout, remote::send(self.remote.as_ref(), call)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(RemoteError::Timeout(timeout)),
            }
        }
        Ok(())
    }
}

fn failure_notice(item_id: &ItemId, cross_container: bool) -> Notice {
    if cross_container {
        Notice::new(NoticeKind::Move, format!("failed to move {}; reverted", item_id))
    } else {
        Notice::new(NoticeKind::Reorder, format!("failed to reorder {}; reverted", item_id))
    }
}
