//! Configuration schema for memoize
//!
//! Configuration is read from `~/.memoize/config.toml`. Every key is
//! optional.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache behaviour
    pub cache: CacheConfig,

    /// Shell used to run commands
    pub shell: ShellConfig,

    /// Miss log settings
    pub log: LogConfig,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Override for the cache root (default `~/.memoize/history`)
    pub root: Option<PathBuf>,

    /// Serialize concurrent writers of the same key with a lock file
    pub lock_writers: bool,

    /// Cache output of commands that exit non-zero
    pub cache_failures: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            lock_writers: true,
            cache_failures: true,
        }
    }
}

/// Shell settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell program
    pub program: String,

    /// Flag that makes the shell run its next argument as a command
    pub flag: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            flag: "-c".to_string(),
        }
    }
}

/// Miss log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Append a line to `~/.memoize/log.txt` on every cache miss
    pub enabled: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
