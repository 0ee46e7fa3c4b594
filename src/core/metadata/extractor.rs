//! Cache-first metadata extraction.

use super::engines::{
    default_image_chain, default_video_chain, systemtime_to_naive, FilesystemEngine,
    MetadataEngine,
};
use super::MetadataRecord;
use crate::core::cache::MetadataStore;
use crate::core::scanner::{MediaFile, MediaKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of an extraction, noting whether the cache served it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: MetadataRecord,
    pub from_cache: bool,
}

/// Extracts normalized metadata records, caching by file identity.
///
/// `extract` never fails: on any engine error it degrades to a record built
/// from filesystem attributes and logs the condition as a warning.
pub struct MetadataExtractor {
    store: Arc<dyn MetadataStore>,
    image_chain: Vec<Box<dyn MetadataEngine>>,
    video_chain: Vec<Box<dyn MetadataEngine>>,
    fallback: FilesystemEngine,
}

impl MetadataExtractor {
    /// Create an extractor with the default engine chains.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self::with_chains(store, default_image_chain(), default_video_chain())
    }

    /// Create an extractor with explicit engine chains (strongest first).
    pub fn with_chains(
        store: Arc<dyn MetadataStore>,
        image_chain: Vec<Box<dyn MetadataEngine>>,
        video_chain: Vec<Box<dyn MetadataEngine>>,
    ) -> Self {
        Self {
            store,
            image_chain,
            video_chain,
            fallback: FilesystemEngine::new(),
        }
    }

    /// Extract a metadata record for a file.
    ///
    /// Consults the store by identity key (path + size + mtime) first. On a
    /// miss, runs the engine chain for the file kind, merging results so that
    /// earlier engines win, then writes the merged record back to the store.
    pub fn extract(&self, file: &MediaFile) -> Extraction {
        match self.store.get(&file.path, file.size, file.modified) {
            Ok(Some(record)) => {
                debug!(path = %file.path.display(), "metadata cache hit");
                return Extraction {
                    record,
                    from_cache: true,
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "metadata cache read failed");
            }
        }

        let chain: &[Box<dyn MetadataEngine>] = match file.kind {
            MediaKind::Image | MediaKind::RawImage => &self.image_chain,
            MediaKind::Video => &self.video_chain,
            MediaKind::Unknown => &[],
        };

        let mut merged = MetadataRecord::default();
        for engine in chain {
            if !engine.available() {
                debug!(engine = engine.name(), "engine not available, skipping");
                continue;
            }
            match engine.extract(file) {
                Ok(record) => merged.fill_missing_from(record),
                Err(e) => {
                    warn!(
                        path = %file.path.display(),
                        engine = engine.name(),
                        error = %e,
                        "extraction engine failed, falling through"
                    );
                }
            }
        }

        // The capture-time invariant: the filesystem mtime is always resolvable.
        if merged.file_modified.is_none() {
            if let Ok(record) = self.fallback.extract(file) {
                merged.fill_missing_from(record);
            }
            if merged.file_modified.is_none() {
                merged.file_modified = Some(systemtime_to_naive(file.modified));
            }
        }

        if let Err(e) = self
            .store
            .set(&file.path, file.size, file.modified, &merged)
        {
            warn!(path = %file.path.display(), error = %e, "metadata cache write failed");
        }

        Extraction {
            record: merged,
            from_cache: false,
        }
    }
}
