//! Filesystem-attribute fallback engine.
//!
//! The last link of every chain: always available, never fails, and
//! guarantees the capture-time invariant by supplying the file mtime.

use super::{systemtime_to_naive, MetadataEngine};
use crate::core::metadata::MetadataRecord;
use crate::core::scanner::MediaFile;
use crate::error::ExtractError;

/// Engine populating a record from filesystem attributes only.
pub struct FilesystemEngine;

impl FilesystemEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilesystemEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataEngine for FilesystemEngine {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn available(&self) -> bool {
        true
    }

    fn extract(&self, file: &MediaFile) -> Result<MetadataRecord, ExtractError> {
        let mut record = MetadataRecord::default();
        record.file_modified = Some(systemtime_to_naive(file.modified));
        Ok(record)
    }
}
