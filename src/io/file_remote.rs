use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::io::board_io;
use crate::io::lock::BoardLock;
use crate::model::collection::Collection;
use crate::model::item::{ContainerId, ItemId, ItemRef};
use crate::sync::remote::{self, RemoteError, RemoteStore};

/// Remote store backed by a board directory's `board.json`.
///
/// Each call takes the board lock, re-reads the file, applies the change
/// with the same validation as [`remote::MemoryRemote`], and rewrites the
/// file atomically.
#[derive(Debug, Clone)]
pub struct FileRemote {
    board_dir: PathBuf,
    lock_timeout: Duration,
}

impl FileRemote {
    pub fn new(board_dir: impl Into<PathBuf>) -> Self {
        FileRemote {
            board_dir: board_dir.into(),
            lock_timeout: Duration::from_secs(5),
        }
    }

    async fn mutate<T, F>(&self, f: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Collection) -> Result<T, RemoteError> + Send + 'static,
    {
        let dir = self.board_dir.clone();
        let lock_timeout = self.lock_timeout;
        tokio::task::spawn_blocking(move || {
            let _lock = BoardLock::acquire(&dir, lock_timeout).map_err(transport)?;
            let mut collection = board_io::read_board(&dir).map_err(transport)?;
            let out = f(&mut collection)?;
            board_io::write_board(&dir, &collection).map_err(transport)?;
            Ok(out)
        })
        .await
        .map_err(transport)?
    }
}

fn transport(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

#[async_trait]
impl RemoteStore for FileRemote {
    async fn reorder_items_in_container(
        &self,
        container_id: &ContainerId,
        ordered_item_ids: &[ItemId],
    ) -> Result<(), RemoteError> {
        debug!(container = %container_id, "persisting order");
        let container_id = container_id.clone();
        let ordered_item_ids = ordered_item_ids.to_vec();
        self.mutate(move |c| remote::apply_reorder(c, &container_id, &ordered_item_ids))
            .await
    }

    async fn move_item_to_container(
        &self,
        item_id: &ItemId,
        dest_container_id: &ContainerId,
        dest_index: usize,
    ) -> Result<ItemRef, RemoteError> {
        debug!(item = %item_id, container = %dest_container_id, index = dest_index, "persisting move");
        let item_id = item_id.clone();
        let dest_container_id = dest_container_id.clone();
        self.mutate(move |c| remote::apply_move(c, &item_id, &dest_container_id, dest_index))
            .await
    }

    async fn load_collection(&self, parent_id: &str) -> Result<Collection, RemoteError> {
        let dir = self.board_dir.clone();
        let collection = tokio::task::spawn_blocking(move || board_io::read_board(&dir))
            .await
            .map_err(transport)?
            .map_err(transport)?;
        if collection.parent_id() != parent_id {
            return Err(RemoteError::Rejected(format!("unknown parent {}", parent_id)));
        }
        Ok(collection)
    }
}
