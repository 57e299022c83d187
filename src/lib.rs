//! Memoize - cached shell command output
//!
//! Runs a shell command, tees its stdout into a cache entry keyed by the
//! command text and working directory, and replays that entry on later
//! runs until it is reset.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod shell;

pub use error::{MemoizeError, MemoizeResult};
