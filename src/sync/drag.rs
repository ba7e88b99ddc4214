use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::item::{ContainerId, ItemId};
use crate::ops::reorder::MoveOperation;

use super::controller::{Outcome, SyncController, SyncError};

/// A position reported by the pointer-drag library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub container_id: ContainerId,
    pub index: usize,
}

/// Drag-end event. `destination` is `None` when the item was dropped
/// outside every container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragEndEvent {
    pub dragged_item_id: ItemId,
    pub source: DragLocation,
    pub destination: Option<DragLocation>,
}

/// What happened to a drag-end event.
#[derive(Debug)]
pub enum DragResponse {
    /// Dropped outside any container.
    Cancelled,
    /// Dropped where it started, or the move changed nothing.
    NoOp,
    /// Refused without touching state (move or reload in flight, stale
    /// indices, view unmounted, no runtime).
    Rejected(SyncError),
    /// Applied locally; confirmation runs in the background.
    Dispatched(JoinHandle<Outcome>),
}

/// Routes drag-end events to a [`SyncController`]. Does no ordering itself.
#[derive(Clone)]
pub struct DragAdapter {
    controller: SyncController,
}

impl DragAdapter {
    pub fn new(controller: SyncController) -> Self {
        DragAdapter { controller }
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    /// Whether the UI should let a drag start.
    pub fn drag_enabled(&self) -> bool {
        self.controller.handle().is_drag_enabled()
    }

    /// Handle a pointer release. Returns as soon as local state is updated;
    /// remote confirmation is spawned onto the current tokio runtime. Called
    /// outside a runtime, the drop is refused and nothing changes.
    pub fn on_drag_end(&self, event: DragEndEvent) -> DragResponse {
        let Some(destination) = event.destination else {
            debug!(item = %event.dragged_item_id, "drag cancelled");
            return DragResponse::Cancelled;
        };
        if destination == event.source {
            return DragResponse::NoOp;
        }

        let op = MoveOperation {
            item_id: event.dragged_item_id,
            source_container_id: event.source.container_id,
            source_index: event.source.index,
            dest_container_id: destination.container_id,
            dest_index: destination.index,
        };

        // Nothing is applied unless a confirmation task can be spawned.
        let Ok(runtime) = Handle::try_current() else {
            warn!(item = %op.item_id, "drag-end outside a tokio runtime");
            return DragResponse::Rejected(SyncError::NoRuntime);
        };

        match self.controller.begin(op) {
            Ok(None) => DragResponse::NoOp,
            Ok(Some(pending)) => {
                let controller = self.controller.clone();
                DragResponse::Dispatched(runtime.spawn(async move { controller.confirm(pending).await }))
            }
            Err(e) => DragResponse::Rejected(e),
        }
    }
}
