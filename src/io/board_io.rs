use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::collection::Collection;

pub const BOARD_FILE: &str = "board.json";

/// Error type for board file I/O
#[derive(Debug, thiserror::Error)]
pub enum BoardIoError {
    #[error("not a board directory: no board.json in {0}")]
    NotABoard(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
}

pub fn board_path(board_dir: &Path) -> PathBuf {
    board_dir.join(BOARD_FILE)
}

/// Load the collection stored in `board.json`.
pub fn read_board(board_dir: &Path) -> Result<Collection, BoardIoError> {
    let path = board_path(board_dir);
    if !path.exists() {
        return Err(BoardIoError::NotABoard(board_dir.to_path_buf()));
    }
    let text = fs::read_to_string(&path).map_err(|e| BoardIoError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| BoardIoError::ParseError { path, source: e })
}

/// Replace `board.json` atomically.
pub fn write_board(board_dir: &Path, collection: &Collection) -> Result<(), BoardIoError> {
    let path = board_path(board_dir);
    let mut content = serde_json::to_vec_pretty(collection).map_err(|e| BoardIoError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    content.push(b'\n');
    atomic_write(&path, &content).map_err(|e| BoardIoError::WriteError { path, source: e })
}

/// Write to a temp file in the same directory, then rename over `path`.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
