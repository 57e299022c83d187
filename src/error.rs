//! Error types for memoize
//!
//! All modules use `MemoizeResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for memoize operations
pub type MemoizeResult<T> = Result<T, MemoizeError>;

/// All errors that can occur in memoize
#[derive(Error, Debug)]
pub enum MemoizeError {
    // Configuration errors
    #[error("Could not resolve the home directory ($HOME is unset)")]
    HomeNotFound,

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Cache errors
    #[error("Cache entry not found: {0}")]
    EntryNotFound(PathBuf),

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Usage errors
    #[error("No command given")]
    Usage,
}

impl MemoizeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a spawn error for a shell command
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source,
        }
    }

    /// Whether this error should turn into a non-zero exit code.
    ///
    /// Everything else is reported on stderr and the invocation still
    /// exits successfully.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HomeNotFound | Self::ConfigInvalid { .. } | Self::Usage
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::HomeNotFound => Some("Set HOME to a writable directory"),
            Self::ConfigInvalid { .. } => Some("Fix or remove ~/.memoize/config.toml"),
            Self::Spawn { .. } => Some("Check that the shell configured in [shell] exists"),
            Self::Usage => Some("Run: memoize --help"),
            _ => None,
        }
    }
}
