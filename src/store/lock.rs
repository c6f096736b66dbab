//! Advisory file locks used for per-job mutual exclusion and for
//! serializing structural mutations of the active set / DLQ.
//!
//! Uses real OS-level advisory locks (`fs2`, grounded in
//! `other_examples/c53a7c02_w-woloszyn-OpenSub…src-main.rs`'s
//! single-instance guard) rather than a `create_new`-based sentinel file,
//! because spec §5 requires a crashed worker's lock to be released by the
//! OS so the job becomes reclaimable — a sentinel file left behind by a
//! `kill -9`'d process would never auto-release.

use super::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// A held advisory lock. Dropping it releases the OS lock and closes the
/// file descriptor; `release` does the same explicitly so callers can
/// observe failures.
pub struct LockHandle {
    file: File,
    path: PathBuf,
}

impl LockHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Explicitly release the lock. Also happens on drop, but callers that
    /// want to observe I/O errors from the unlock syscall should call this.
    pub fn release(self) -> StoreResult<()> {
        self.file.unlock().map_err(StoreError::Io)
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Try to acquire a non-blocking exclusive lock on `path`, creating the
/// file if it does not exist. Returns `Err(StoreError::LockBusy)` if
/// another process already holds it.
pub fn try_lock(path: &Path) -> StoreResult<LockHandle> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(LockHandle {
            file,
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
            Err(StoreError::LockBusy(path.display().to_string()))
        }
        Err(e) => Err(StoreError::Io(e)),
    }
}
