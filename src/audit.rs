//! Miss log
//!
//! Appends one JSON line per cache miss to `~/.memoize/log.txt`. The file
//! is write-only: nothing in memoize reads it back.

use crate::config::{schema::Config, Paths};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based miss logger that appends JSON lines
#[derive(Debug, Clone)]
pub struct MissLog {
    enabled: bool,
    path: PathBuf,
}

impl MissLog {
    /// Create a new miss logger from config
    pub fn new(config: &Config, paths: &Paths) -> Self {
        Self {
            enabled: config.log.enabled,
            path: paths.log_path(),
        }
    }

    /// Logger that never writes
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
        }
    }

    /// Record a miss.
    ///
    /// IO failures are reported and dropped; logging never stops the
    /// command from running.
    pub async fn record(&self, entry: &Path, cwd: &Path, command: &str) {
        if !self.enabled {
            return;
        }

        let line = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "entry": entry.display().to_string(),
            "cwd": cwd.display().to_string(),
            "command": command,
        });

        let mut line = match serde_json::to_string(&line) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize miss log line: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write miss log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
