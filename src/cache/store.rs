//! On-disk store of cached command output
//!
//! Layout under the cache root:
//!
//! | File | Meaning |
//! |------|---------|
//! | `<key>.txt` | Committed entry, exact stdout bytes |
//! | `<key>.txt.wip` | Write in progress (or orphaned by a killed run) |
//! | `<key>.txt.lock` | Advisory writer lock, see [`super::lock`] |
//!
//! A wip file only becomes visible as an entry through a rename, so a
//! reader never sees a partial write.

use super::key::CacheKey;
use super::lock;
use crate::error::{MemoizeError, MemoizeResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Read buffer size for replaying entries
const CHUNK_SIZE: usize = 8 * 1024;

/// A committed cache entry as seen by [`CacheStore::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub key: CacheKey,
    pub path: PathBuf,
    pub size: u64,
}

/// Cache store rooted at one directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store over `root`. Nothing is touched on disk until
    /// [`CacheStore::ensure_root`] or a write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the committed entry for `key`
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.entry_file_name())
    }

    /// Path of the in-progress write for `key`
    pub fn wip_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.wip_file_name())
    }

    /// Create the cache root (and its parents) with owner-only permissions
    pub async fn ensure_root(&self) -> MemoizeResult<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);

        builder.create(&self.root).await.map_err(|e| {
            MemoizeError::io(format!("creating cache directory {}", self.root.display()), e)
        })?;

        // Parents that already existed keep their permissions; the root
        // itself is always tightened.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.root, perms).await.map_err(|e| {
                MemoizeError::io(
                    format!("setting permissions on {}", self.root.display()),
                    e,
                )
            })?;
        }

        Ok(())
    }

    /// Whether a committed entry exists for `key`
    pub async fn exists(&self, key: &CacheKey) -> bool {
        let path = self.entry_path(key);
        match fs::try_exists(&path).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed to check cache entry {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Open the committed entry for `key` for reading
    pub async fn read(&self, key: &CacheKey) -> MemoizeResult<EntryReader> {
        let path = self.entry_path(key);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MemoizeError::EntryNotFound(path));
            }
            Err(e) => {
                return Err(MemoizeError::io(
                    format!("opening cache entry {}", path.display()),
                    e,
                ))
            }
        };

        Ok(EntryReader {
            reader: BufReader::new(file),
            path,
        })
    }

    /// Start writing a new entry for `key`.
    ///
    /// A wip file left behind by an earlier run is removed first; it is
    /// never resumed.
    pub async fn begin_write(&self, key: &CacheKey) -> MemoizeResult<WriteHandle> {
        let wip_path = self.wip_path(key);

        match fs::remove_file(&wip_path).await {
            Ok(()) => debug!("Removed stale wip file {}", wip_path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(MemoizeError::io(
                    format!("removing stale wip file {}", wip_path.display()),
                    e,
                ))
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options.open(&wip_path).await.map_err(|e| {
            MemoizeError::io(
                format!("opening wip cache file {} for writing", wip_path.display()),
                e,
            )
        })?;

        debug!("Writing cache entry via {}", wip_path.display());
        Ok(WriteHandle {
            file,
            wip_path,
            entry_path: self.entry_path(key),
            written: 0,
        })
    }

    /// Publish a finished write under the entry name
    pub async fn commit(&self, handle: WriteHandle) -> MemoizeResult<PathBuf> {
        let WriteHandle {
            mut file,
            wip_path,
            entry_path,
            written,
        } = handle;

        file.flush()
            .await
            .map_err(|e| MemoizeError::io(format!("flushing {}", wip_path.display()), e))?;
        file.sync_all()
            .await
            .map_err(|e| MemoizeError::io(format!("syncing {}", wip_path.display()), e))?;
        drop(file);

        fs::rename(&wip_path, &entry_path).await.map_err(|e| {
            MemoizeError::io(
                format!(
                    "renaming {} to {}",
                    wip_path.display(),
                    entry_path.display()
                ),
                e,
            )
        })?;

        debug!("Committed {} bytes to {}", written, entry_path.display());
        Ok(entry_path)
    }

    /// Throw away an unfinished write without publishing it
    pub async fn discard(&self, handle: WriteHandle) -> MemoizeResult<()> {
        let WriteHandle { file, wip_path, .. } = handle;
        drop(file);

        match fs::remove_file(&wip_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemoizeError::io(
                format!("removing wip file {}", wip_path.display()),
                e,
            )),
        }
    }

    /// Delete the committed entry for `key`, if there is one
    pub async fn invalidate(&self, key: &CacheKey) -> MemoizeResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Invalidated cache entry {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemoizeError::io(
                format!("removing cache entry {}", path.display()),
                e,
            )),
        }
    }

    /// List committed entries, sorted by key
    pub async fn list(&self) -> MemoizeResult<Vec<EntryInfo>> {
        let mut entries = Vec::new();

        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(MemoizeError::io("reading cache directory", e)),
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| MemoizeError::io("reading cache entry", e))?
        {
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(CacheKey::from_entry_file_name) else {
                continue;
            };
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| MemoizeError::io("reading cache entry metadata", e))?;
            entries.push(EntryInfo {
                key,
                path: entry.path(),
                size: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        Ok(entries)
    }

    /// Remove every entry, orphaned wip file and unheld lock file,
    /// returning how many files were deleted
    pub async fn clear(&self) -> MemoizeResult<usize> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(MemoizeError::io("reading cache directory", e)),
        };

        let mut removed = 0;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| MemoizeError::io("reading cache entry", e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let is_entry = CacheKey::from_entry_file_name(name).is_some();
            let is_wip = name
                .strip_suffix(".wip")
                .is_some_and(|stem| CacheKey::from_entry_file_name(stem).is_some());
            let is_lock = name
                .strip_suffix(".lock")
                .is_some_and(|stem| CacheKey::from_entry_file_name(stem).is_some());

            if is_lock {
                let path = entry.path();
                let freed = tokio::task::spawn_blocking(move || lock::remove_if_free(&path))
                    .await
                    .map_err(|e| MemoizeError::io("joining lock task", std::io::Error::other(e)))?
                    .map_err(|e| {
                        MemoizeError::io(format!("removing {}", entry.path().display()), e)
                    })?;
                if freed {
                    removed += 1;
                }
                continue;
            }
            if !(is_entry || is_wip) {
                continue;
            }

            fs::remove_file(entry.path()).await.map_err(|e| {
                MemoizeError::io(format!("removing {}", entry.path().display()), e)
            })?;
            removed += 1;
        }

        debug!("Removed {} files from {}", removed, self.root.display());
        Ok(removed)
    }
}

/// Sequential reader over a committed entry. Finite and not restartable;
/// open the entry again to re-read it.
pub struct EntryReader {
    reader: BufReader<File>,
    path: PathBuf,
}

impl EntryReader {
    /// Next chunk of the entry, or `None` at end of file
    pub async fn next_chunk(&mut self) -> MemoizeResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = self.reader.read(&mut buf).await.map_err(|e| {
            MemoizeError::io(format!("reading cache entry {}", self.path.display()), e)
        })?;

        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// An open wip file. Publish it with [`CacheStore::commit`]; dropping it
/// leaves the wip file on disk for the next run to clean up.
#[derive(Debug)]
pub struct WriteHandle {
    file: File,
    wip_path: PathBuf,
    entry_path: PathBuf,
    written: u64,
}

impl WriteHandle {
    /// Append bytes to the wip file
    pub async fn append(&mut self, bytes: &[u8]) -> MemoizeResult<()> {
        self.file.write_all(bytes).await.map_err(|e| {
            MemoizeError::io(format!("writing {}", self.wip_path.display()), e)
        })?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Path of the wip file being written
    pub fn wip_path(&self) -> &Path {
        &self.wip_path
    }

    /// Number of bytes appended so far
    pub fn written(&self) -> u64 {
        self.written
    }
}
