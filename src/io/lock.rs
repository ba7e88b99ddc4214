use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_FILE: &str = ".board.lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock on a board directory.
///
/// Held for the whole read-modify-write of `board.json` so two `bsync`
/// processes never interleave writes. Released on drop.
#[derive(Debug)]
pub struct BoardLock {
    _file: File,
}

/// Error type for board locking
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("board at {0} is locked by another process")]
    Busy(PathBuf),
}

impl BoardLock {
    /// Block for up to `timeout` waiting for the lock.
    pub fn acquire(board_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = board_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::Open {
                path: path.clone(),
                source: e,
            })?;

        let deadline = Instant::now() + timeout;
        while try_lock(&file).is_err() {
            if Instant::now() >= deadline {
                return Err(LockError::Busy(board_dir.to_path_buf()));
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
        Ok(BoardLock { _file: file })
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the fd is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

// Advisory only: other platforms get in-process serialization from the
// caller and no cross-process guarantee.
#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reacquire_after_drop() {
        let tmp = TempDir::new().unwrap();
        let first = BoardLock::acquire(tmp.path(), Duration::from_secs(1)).unwrap();
        drop(first);
        assert!(BoardLock::acquire(tmp.path(), Duration::from_secs(1)).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_contention_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = BoardLock::acquire(tmp.path(), Duration::from_secs(1)).unwrap();
        let err = BoardLock::acquire(tmp.path(), Duration::from_millis(40)).unwrap_err();
        assert!(matches!(err, LockError::Busy(_)));
    }
}
