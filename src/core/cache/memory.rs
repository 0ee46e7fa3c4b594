//! In-memory store backend for testing.

use super::{mtime_secs, MetadataStore, StoreStats};
use crate::core::metadata::MetadataRecord;
use crate::error::CacheError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

struct Entry {
    size: u64,
    modified_secs: i64,
    record: MetadataRecord,
    cached_at: i64,
}

/// In-memory metadata store, lost when the process exits.
pub struct InMemoryStore {
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore for InMemoryStore {
    fn get(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
    ) -> Result<Option<MetadataRecord>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Corrupted {
            path: path.to_path_buf(),
        })?;

        Ok(entries.get(path).and_then(|entry| {
            if entry.size == size && entry.modified_secs == mtime_secs(modified) {
                Some(entry.record.clone())
            } else {
                None
            }
        }))
    }

    fn set(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
        record: &MetadataRecord,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Corrupted {
            path: path.to_path_buf(),
        })?;

        entries.insert(
            path.to_path_buf(),
            Entry {
                size,
                modified_secs: mtime_secs(modified),
                record: record.clone(),
                cached_at: mtime_secs(SystemTime::now()),
            },
        );

        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Corrupted {
            path: path.to_path_buf(),
        })?;
        entries.remove(path);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Corrupted {
            path: PathBuf::new(),
        })?;
        entries.clear();
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Corrupted {
            path: PathBuf::new(),
        })?;

        Ok(StoreStats {
            total_entries: entries.len(),
            oldest_entry: entries.values().map(|e| e.cached_at).min(),
            newest_entry: entries.values().map(|e| e.cached_at).max(),
        })
    }

    fn prune_orphans(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Corrupted {
            path: PathBuf::new(),
        })?;

        let before = entries.len();
        entries.retain(|path, _| path.exists());
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn mtime() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn stores_and_retrieves() {
        let store = InMemoryStore::new();
        let record = MetadataRecord {
            iso: Some(100),
            ..Default::default()
        };

        store.set(Path::new("/a.jpg"), 10, mtime(), &record).unwrap();

        let restored = store.get(Path::new("/a.jpg"), 10, mtime()).unwrap();
        assert_eq!(restored.unwrap().iso, Some(100));
    }

    #[test]
    fn stale_identity_returns_none() {
        let store = InMemoryStore::new();
        store
            .set(Path::new("/a.jpg"), 10, mtime(), &MetadataRecord::default())
            .unwrap();

        assert!(store.get(Path::new("/a.jpg"), 11, mtime()).unwrap().is_none());
        let later = mtime() + Duration::from_secs(5);
        assert!(store.get(Path::new("/a.jpg"), 10, later).unwrap().is_none());
    }

    #[test]
    fn remove_and_clear() {
        let store = InMemoryStore::new();
        store
            .set(Path::new("/a.jpg"), 10, mtime(), &MetadataRecord::default())
            .unwrap();
        store
            .set(Path::new("/b.jpg"), 10, mtime(), &MetadataRecord::default())
            .unwrap();

        store.remove(Path::new("/a.jpg")).unwrap();
        assert_eq!(store.stats().unwrap().total_entries, 1);

        store.clear().unwrap();
        assert_eq!(store.stats().unwrap().total_entries, 0);
    }
}
