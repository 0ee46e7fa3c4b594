//! Persistent place cache keyed by rounded coordinates.
//!
//! A plain JSON file: coordinates do not move, so entries never expire and
//! the format needs no migrations.

use super::PlaceInfo;
use crate::error::GeocodeError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Rounded-coordinate -> place mapping, persisted across runs.
pub struct PlaceCache {
    path: PathBuf,
    entries: HashMap<String, PlaceInfo>,
}

impl PlaceCache {
    /// Load the cache from disk, starting empty when the file is missing or
    /// unreadable.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "place cache unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self { path, entries }
    }

    pub fn get(&self, key: &str) -> Option<&PlaceInfo> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, place: PlaceInfo) {
        self.entries.insert(key, place);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the cache back to disk.
    pub fn flush(&self) -> Result<(), GeocodeError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GeocodeError::CacheIo {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            GeocodeError::CacheIo {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        std::fs::write(&self.path, json).map_err(|e| GeocodeError::CacheIo {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}
