//! Per-key advisory writer lock
//!
//! Two processes filling the same key would otherwise both truncate and
//! write the same wip file. Writers take an exclusive `flock`-style lock on
//! `<key>.txt.lock` for the whole miss path. Readers never lock: the
//! rename in [`super::store::CacheStore::commit`] already keeps them safe.
//!
//! Lock files stay on disk after a run. Only [`remove_if_free`] deletes
//! them, and only while nobody holds them.

use super::key::CacheKey;
use crate::error::{MemoizeError, MemoizeResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held exclusive lock; released on drop
#[derive(Debug)]
pub struct KeyLock {
    file: File,
    path: PathBuf,
}

impl KeyLock {
    /// Block until the writer lock for `key` under `root` is ours
    pub async fn acquire(root: &Path, key: &CacheKey) -> MemoizeResult<Self> {
        let path = root.join(key.lock_file_name());

        let task_path = path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let mut options = OpenOptions::new();
            options.create(true).truncate(false).write(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let file = options.open(&task_path)?;

            if FileExt::try_lock_exclusive(&file).is_err() {
                debug!("Waiting for writer lock {}", task_path.display());
                FileExt::lock_exclusive(&file)?;
            }
            Ok(file)
        })
        .await
        .map_err(|e| MemoizeError::io("joining lock task", std::io::Error::other(e)))?
        .map_err(|e| MemoizeError::io(format!("locking {}", path.display()), e))?;

        debug!("Acquired writer lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        // Closing the file releases the lock anyway
        let _ = FileExt::unlock(&self.file);
    }
}

/// Delete a lock file unless another process holds it. Returns whether
/// the file was removed.
pub fn remove_if_free(path: &Path) -> std::io::Result<bool> {
    let file = match OpenOptions::new().write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if FileExt::try_lock_exclusive(&file).is_err() {
        debug!("Lock {} is held, leaving it", path.display());
        return Ok(false);
    }

    // Removed while still locked so no writer slips in between
    std::fs::remove_file(path)?;
    let _ = FileExt::unlock(&file);
    Ok(true)
}
