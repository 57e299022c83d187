//! Execution pipeline: replay a cached entry or run the command and cache it
//!
//! ```text
//! START -> KEY_COMPUTED -> HIT  -> DONE   (replay entry)
//!                       -> MISS -> DONE   (run, tee, commit)
//! ```

use crate::audit::MissLog;
use crate::cache::{fingerprint, CacheKey, CacheStore, KeyLock, WriteHandle};
use crate::config::{cache_root, schema::CacheConfig, Config, Paths};
use crate::error::{MemoizeError, MemoizeResult};
use crate::shell::{CommandLine, ShellLauncher};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Pipe read size on the miss path
const CHUNK_SIZE: usize = 8 * 1024;

/// One memoized command run
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Command words
    pub command: CommandLine,
    /// Drop any existing entry and run the command again
    pub reset: bool,
    /// Working directory; empty if it could not be determined
    pub cwd: PathBuf,
}

/// How an invocation was served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Replayed from the cache without running the command
    Hit { key: CacheKey },
    /// Ran the command. `cached` is false when nothing was committed.
    Miss {
        key: CacheKey,
        status: ExitStatus,
        cached: bool,
    },
}

impl Outcome {
    pub fn key(&self) -> &CacheKey {
        match self {
            Self::Hit { key } | Self::Miss { key, .. } => key,
        }
    }
}

/// Miss-path behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Take the per-key writer lock before running
    pub lock_writers: bool,
    /// Commit output of commands that exit non-zero
    pub cache_failures: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            lock_writers: config.lock_writers,
            cache_failures: config.cache_failures,
        }
    }
}

/// Runs invocations against one cache store
pub struct Memoizer {
    store: CacheStore,
    launcher: ShellLauncher,
    miss_log: MissLog,
    policy: CachePolicy,
}

impl Memoizer {
    pub fn new(store: CacheStore, launcher: ShellLauncher, miss_log: MissLog) -> Self {
        Self {
            store,
            launcher,
            miss_log,
            policy: CachePolicy::default(),
        }
    }

    /// Build everything from loaded configuration
    pub fn from_config(config: &Config, paths: &Paths) -> Self {
        Self::new(
            CacheStore::new(cache_root(config, paths)),
            ShellLauncher::new(&config.shell),
            MissLog::new(config, paths),
        )
        .with_policy(CachePolicy::from(&config.cache))
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Serve `invocation`, writing the command's output to `out`
    pub async fn run<W>(&self, invocation: &Invocation, out: &mut W) -> MemoizeResult<Outcome>
    where
        W: AsyncWrite + Unpin,
    {
        let text = invocation.command.text();
        let key = fingerprint(&text, &invocation.cwd);
        debug!(
            "Key {} for {:?} in {}",
            key,
            text,
            invocation.cwd.display()
        );

        if invocation.reset {
            if let Err(e) = self.store.invalidate(&key).await {
                warn!("{}", e);
            }
        } else if self.store.exists(&key).await {
            if let Some(outcome) = self.try_replay(&key, out).await? {
                return Ok(outcome);
            }
        }

        self.run_miss(invocation, &text, key, out).await
    }

    /// Replay the entry for `key`. `None` if it vanished before it could
    /// be opened.
    async fn try_replay<W>(&self, key: &CacheKey, out: &mut W) -> MemoizeResult<Option<Outcome>>
    where
        W: AsyncWrite + Unpin,
    {
        let mut reader = match self.store.read(key).await {
            Ok(reader) => reader,
            Err(MemoizeError::EntryNotFound(path)) => {
                debug!("Entry {} removed before replay", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        info!("Cache hit {}", key);
        while let Some(chunk) = reader.next_chunk().await? {
            if let Err(e) = forward(out, &chunk).await {
                if e.kind() == ErrorKind::BrokenPipe {
                    debug!("Output closed during replay");
                    break;
                }
                return Err(MemoizeError::io("writing cached output", e));
            }
        }

        Ok(Some(Outcome::Hit { key: key.clone() }))
    }

    async fn run_miss<W>(
        &self,
        invocation: &Invocation,
        text: &str,
        key: CacheKey,
        out: &mut W,
    ) -> MemoizeResult<Outcome>
    where
        W: AsyncWrite + Unpin,
    {
        if let Err(e) = self.store.ensure_root().await {
            warn!("{}", e);
        }

        let lock = if self.policy.lock_writers {
            match KeyLock::acquire(self.store.root(), &key).await {
                Ok(lock) => Some(lock),
                Err(e) => {
                    warn!("{}; continuing without writer lock", e);
                    None
                }
            }
        } else {
            None
        };

        // Someone else may have filled the entry while we waited on the lock
        if lock.is_some() && !invocation.reset && self.store.exists(&key).await {
            if let Some(outcome) = self.try_replay(&key, out).await? {
                return Ok(outcome);
            }
        }

        info!("Cache miss {}, running {:?}", key, text);
        self.miss_log
            .record(&self.store.entry_path(&key), &invocation.cwd, text)
            .await;

        let mut handle = match self.store.begin_write(&key).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("{}; output will not be cached", e);
                None
            }
        };

        // On spawn failure the open wip file is dropped, not removed; the
        // next run with this key cleans it up.
        let mut child = self.launcher.spawn(text, &invocation.cwd)?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            MemoizeError::io(
                format!("capturing stdout of '{}'", text),
                std::io::Error::other("stdout was not piped"),
            )
        })?;

        let mut forwarding = true;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = stdout
                .read(&mut buf)
                .await
                .map_err(|e| MemoizeError::io(format!("reading output of '{}'", text), e))?;
            if n == 0 {
                break;
            }
            let chunk = &buf[..n];

            if forwarding {
                if let Err(e) = forward(out, chunk).await {
                    // Keep filling the entry so the next run gets all of it
                    if e.kind() != ErrorKind::BrokenPipe {
                        warn!("Failed to write output: {}", e);
                    }
                    forwarding = false;
                }
            }

            let failed = match handle.as_mut() {
                Some(writer) => writer.append(chunk).await.err(),
                None => None,
            };
            if let Some(e) = failed {
                warn!("{}; output will not be cached", e);
                if let Some(writer) = handle.take() {
                    self.discard(writer).await;
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| MemoizeError::io(format!("waiting for '{}'", text), e))?;
        debug!("'{}' exited with {}", text, status);

        let cached = match handle {
            Some(writer) if status.success() || self.policy.cache_failures => {
                self.store.commit(writer).await?;
                true
            }
            Some(writer) => {
                info!("Not caching output of failed command ({})", status);
                self.discard(writer).await;
                false
            }
            None => false,
        };

        Ok(Outcome::Miss {
            key,
            status,
            cached,
        })
    }

    async fn discard(&self, writer: WriteHandle) {
        if let Err(e) = self.store.discard(writer).await {
            warn!("{}", e);
        }
    }
}

/// Write one chunk to the caller and flush it so interactive consumers
/// see output as it arrives
async fn forward<W>(out: &mut W, chunk: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(chunk).await?;
    out.flush().await
}

/// Current working directory, or an empty path if it cannot be read
pub fn resolve_cwd() -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            warn!("Failed to get current working directory: {}", e);
            PathBuf::new()
        }
    }
}
