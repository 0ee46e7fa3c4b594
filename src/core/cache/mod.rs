//! # Cache Module
//!
//! Persists extracted metadata records so later runs skip re-extraction.
//!
//! ## Identity Keys
//! Entries are keyed by (path, size, mtime). When a file's size or
//! modification time changes, its entry is considered stale and is
//! overwritten by the next extraction. At most one entry exists per path.
//!
//! ## Backends
//! - `SqliteStore` - persistent storage using SQLite (WAL mode)
//! - `InMemoryStore` - for testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::MetadataStore;

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Truncate a timestamp to whole seconds.
///
/// Identity comparisons happen at second precision because that is what the
/// store persists; sub-second drift must not invalidate entries.
pub(crate) fn mtime_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs() as i64
}

/// Store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of cached records
    pub total_entries: usize,
    /// Oldest entry timestamp (unix seconds)
    pub oldest_entry: Option<i64>,
    /// Newest entry timestamp (unix seconds)
    pub newest_entry: Option<i64>,
}
