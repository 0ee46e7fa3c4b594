//! Metadata store trait definition.

use super::StoreStats;
use crate::core::metadata::MetadataRecord;
use crate::error::CacheError;
use std::path::Path;
use std::time::SystemTime;

/// Trait for metadata store backends.
///
/// Implementations must serialize read-modify-write per key; concurrent
/// readers of distinct keys should not block each other where the backend
/// allows it.
pub trait MetadataStore: Send + Sync {
    /// Get a cached record if it exists and its identity key still matches.
    fn get(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
    ) -> Result<Option<MetadataRecord>, CacheError>;

    /// Store a record under the file's identity key, replacing any stale entry.
    fn set(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
        record: &MetadataRecord,
    ) -> Result<(), CacheError>;

    /// Remove a specific entry
    fn remove(&self, path: &Path) -> Result<(), CacheError>;

    /// Clear all cached records
    fn clear(&self) -> Result<(), CacheError>;

    /// Get store statistics
    fn stats(&self) -> Result<StoreStats, CacheError>;

    /// Remove entries for files that no longer exist.
    ///
    /// Returns the number of entries removed.
    fn prune_orphans(&self) -> Result<usize, CacheError>;
}
