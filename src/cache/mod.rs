//! Command output cache
//!
//! Entries are keyed by an FNV-1a fingerprint of the command text and the
//! working directory, and stored as plain files under the cache root.
//!
//! # Entry States
//!
//! | State | On disk | Description |
//! |-------|---------|-------------|
//! | Miss | nothing | Command has never run here, or was reset |
//! | Writing | `<key>.txt.wip` | In progress, or orphaned by a killed run |
//! | Committed | `<key>.txt` | Replayed verbatim until reset |
//!
//! An orphaned wip file is removed by the next run with the same key.

pub mod key;
pub mod lock;
pub mod store;

pub use key::{fingerprint, CacheKey};
pub use lock::KeyLock;
pub use store::{CacheStore, EntryInfo, EntryReader, WriteHandle};
