use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::model::collection::Collection;
use crate::ops::order::renumber_in_place;

/// Where the collection stands with respect to the one in-flight move or reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No operation in flight; dragging is enabled.
    Idle,
    /// New state written locally, remote calls not yet issued.
    AppliedLocally,
    /// Remote calls issued, awaiting their answers.
    Confirming,
    /// Fetching the collection again; the fetched copy replaces the local one.
    Reloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Reorder,
    Move,
}

/// A transient, dismissible message for the user.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: DateTime<Local>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Notice {
            kind,
            message: message.into(),
            raised_at: Local::now(),
        }
    }
}

/// Shared owner of one view's collection.
///
/// The view holds a handle and renders from [`CollectionHandle::snapshot`];
/// the sync controller holds a clone and is the only writer. `replace` and
/// `close` invalidate whatever move is in flight: its eventual answer is
/// dropped instead of being written over the new state.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    inner: Arc<Mutex<Shared>>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) collection: Collection,
    pub(crate) phase: SyncPhase,
    pub(crate) generation: u64,
    pub(crate) live: bool,
    pub(crate) notices: Vec<Notice>,
}

impl CollectionHandle {
    /// Mount a freshly loaded collection. Orders are taken from each
    /// container's sequence; stored `order` values may be missing or stale.
    pub fn new(collection: Collection) -> Self {
        CollectionHandle {
            inner: Arc::new(Mutex::new(Shared {
                collection: normalize(collection),
                phase: SyncPhase::Idle,
                generation: 0,
                live: true,
                notices: Vec::new(),
            })),
        }
    }

    /// Clone of the current state, for rendering or comparison.
    pub fn snapshot(&self) -> Collection {
        self.lock().collection.clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Collection) -> R) -> R {
        f(&self.lock().collection)
    }

    pub fn phase(&self) -> SyncPhase {
        self.lock().phase
    }

    /// Dragging is only offered while nothing is in flight.
    pub fn is_drag_enabled(&self) -> bool {
        let shared = self.lock();
        shared.live && shared.phase == SyncPhase::Idle
    }

    pub fn is_live(&self) -> bool {
        self.lock().live
    }

    /// Rebuild wholesale (reload, or the parent entity was switched).
    pub fn replace(&self, collection: Collection) {
        let mut shared = self.lock();
        shared.collection = normalize(collection);
        shared.generation += 1;
        shared.phase = SyncPhase::Idle;
    }

    /// The view unmounted.
    pub fn close(&self) {
        let mut shared = self.lock();
        shared.live = false;
        shared.generation += 1;
        shared.phase = SyncPhase::Idle;
    }

    /// Drain pending notices; the UI shows them and forgets them.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.lock().notices)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Renumber every container from its sequence.
pub(crate) fn normalize(mut collection: Collection) -> Collection {
    for container in collection.containers_mut() {
        renumber_in_place(&mut container.items);
    }
    collection
}
