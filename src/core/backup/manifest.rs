//! Destination manifest: what a backup destination is known to contain.

use crate::error::BackupError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// File name of the manifest at a destination root. Excluded from diff walks.
pub const MANIFEST_FILE: &str = ".shutter-sort-manifest.json";

/// One manifest entry per backed-up file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// SHA-256 of the content, lowercase hex
    pub checksum: String,
    /// Size in bytes
    pub size: u64,
    /// Source modification time, unix seconds
    pub modified: i64,
}

/// Relative path -> entry mapping for one destination.
///
/// Read before a sync pass to compute the diff set, rewritten after. A file
/// whose copy or verification failed is withheld so a future run retries it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest from a destination root; missing or unreadable
    /// manifests start empty (every file then looks new).
    pub fn load(destination: &Path) -> Self {
        let path = destination.join(MANIFEST_FILE);
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "manifest unreadable, treating as empty");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Write the manifest to the destination root.
    pub fn save(&self, destination: &Path) -> Result<(), BackupError> {
        let path = destination.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| BackupError::ManifestWrite {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        std::fs::write(&path, json).map_err(|e| BackupError::ManifestWrite {
            path,
            reason: e.to_string(),
        })
    }

    pub fn get(&self, relative: &str) -> Option<&ManifestEntry> {
        self.entries.get(relative)
    }

    pub fn insert(&mut self, relative: String, entry: ManifestEntry) {
        self.entries.insert(relative, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(checksum: &str) -> ManifestEntry {
        ManifestEntry {
            checksum: checksum.to_string(),
            size: 100,
            modified: 1_700_000_000,
        }
    }

    #[test]
    fn missing_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(Manifest::load(dir.path()).is_empty());
    }

    #[test]
    fn manifest_round_trips() {
        let dir = TempDir::new().unwrap();

        let mut manifest = Manifest::default();
        manifest.insert("2024/03/a.jpg".to_string(), entry("abc123"));
        manifest.save(dir.path()).unwrap();

        let reloaded = Manifest::load(dir.path());
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("2024/03/a.jpg").unwrap().checksum, "abc123");
    }

    #[test]
    fn corrupt_manifest_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), b"{ broken").unwrap();

        assert!(Manifest::load(dir.path()).is_empty());
    }
}
