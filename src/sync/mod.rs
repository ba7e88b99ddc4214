pub mod controller;
pub mod drag;
pub mod handle;
pub mod remote;

pub use controller::{Outcome, PendingMove, SyncController, SyncError};
pub use drag::{DragAdapter, DragEndEvent, DragLocation, DragResponse};
pub use handle::{CollectionHandle, Notice, NoticeKind, SyncPhase};
pub use remote::{MemoryRemote, RemoteCall, RemoteError, RemoteStore};
