//! Configuration management for memoize

pub mod schema;

pub use schema::Config;

use crate::error::{MemoizeError, MemoizeResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Well-known locations under `~/.memoize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base: PathBuf,
}

impl Paths {
    /// Resolve paths from the user's home directory (`$HOME` on Unix)
    pub fn resolve() -> MemoizeResult<Self> {
        let home = dirs::home_dir().ok_or(MemoizeError::HomeNotFound)?;
        Ok(Self::from_home(home))
    }

    /// Paths rooted at an explicit home directory
    pub fn from_home(home: impl AsRef<Path>) -> Self {
        Self {
            base: home.as_ref().join(".memoize"),
        }
    }

    /// `~/.memoize`
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Default cache root, `~/.memoize/history`
    pub fn history_dir(&self) -> PathBuf {
        self.base.join("history")
    }

    /// Miss log, `~/.memoize/log.txt`
    pub fn log_path(&self) -> PathBuf {
        self.base.join("log.txt")
    }

    /// Default config file, `~/.memoize/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }
}

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Config manager for the default location under `paths`
    pub fn new(paths: &Paths) -> Self {
        Self {
            config_path: paths.config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load configuration, falling back to defaults if the file is absent
    pub async fn load(&self) -> MemoizeResult<Config> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> MemoizeResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| MemoizeError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| MemoizeError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Cache root for this configuration: the configured override, or
/// `~/.memoize/history`
pub fn cache_root(config: &Config, paths: &Paths) -> PathBuf {
    config
        .cache
        .root
        .clone()
        .unwrap_or_else(|| paths.history_dir())
}
