//! # Dedupe Module
//!
//! Tiered duplicate detection against a running in-run index.
//!
//! ## Tiers
//! | Tier | Applies to | Signal |
//! |------|-----------|--------|
//! | 1    | every file | streamed SHA-256, exact match |
//! | 2    | images, when enabled | perceptual fingerprint, Hamming distance |
//!
//! Tier 2 compares linearly against fingerprints in the same dimension
//! class; the index is bounded by batch size, so a bucketed index is not
//! needed for correctness.

mod decode;
mod fingerprint;

pub use decode::{decode_image, resize_to_grayscale};
pub use fingerprint::{Fingerprint, FingerprintEngine, FingerprintKind};

use crate::core::checksum::sha256_file;
use crate::core::metadata::MetadataRecord;
use crate::core::scanner::{MediaFile, MediaKind};
use crate::error::DedupeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Which tiers to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeMethod {
    /// Exact content hash only
    Hash,
    /// Content hash plus perceptual similarity for images
    Perceptual,
    /// Alias for running every tier
    Both,
}

impl DedupeMethod {
    fn perceptual_enabled(&self) -> bool {
        matches!(self, DedupeMethod::Perceptual | DedupeMethod::Both)
    }
}

/// What the orchestrator does with a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    /// Leave the duplicate unorganized
    Skip,
    /// Organize it under a suffixed name
    Rename,
    /// Move it into the quarantine folder
    Quarantine,
    /// Ask a registered callback to decide
    Defer,
}

/// Verdict for one checked file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DuplicateVerdict {
    /// No earlier file matches
    Unique,
    /// Byte-identical to an earlier file
    ExactDuplicateOf { original: PathBuf },
    /// Perceptually similar to an earlier file
    SimilarTo { original: PathBuf, score: f64 },
}

impl DuplicateVerdict {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DuplicateVerdict::Unique)
    }
}

/// Configuration for the detector
#[derive(Debug, Clone)]
pub struct DedupeConfig {
    pub method: DedupeMethod,
    pub fingerprint: FingerprintKind,
    /// Minimum similarity (1 - distance/width) to call two images similar
    pub similarity_threshold: f64,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            method: DedupeMethod::Hash,
            fingerprint: FingerprintKind::Difference,
            similarity_threshold: 0.92,
        }
    }
}

/// Rough shape bucket so portraits are never compared against landscapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DimensionClass {
    Landscape,
    Portrait,
    Square,
    Unclassified,
}

impl DimensionClass {
    fn of(record: &MetadataRecord) -> Self {
        match (record.width, record.height) {
            (Some(w), Some(h)) if w > h => DimensionClass::Landscape,
            (Some(w), Some(h)) if w < h => DimensionClass::Portrait,
            (Some(_), Some(_)) => DimensionClass::Square,
            _ => DimensionClass::Unclassified,
        }
    }
}

/// Detects duplicates among the files of one run.
///
/// The index grows monotonically: every checked file is registered so later
/// files can match against it.
pub struct DuplicateDetector {
    config: DedupeConfig,
    engine: FingerprintEngine,
    by_hash: HashMap<String, Vec<PathBuf>>,
    by_fingerprint: HashMap<DimensionClass, Vec<(PathBuf, Fingerprint)>>,
}

impl DuplicateDetector {
    pub fn new(config: DedupeConfig) -> Self {
        let engine = FingerprintEngine::new(config.fingerprint);
        Self {
            config,
            engine,
            by_hash: HashMap::new(),
            by_fingerprint: HashMap::new(),
        }
    }

    /// Check a file against everything seen so far, then register it.
    pub fn check(
        &mut self,
        file: &MediaFile,
        record: &MetadataRecord,
    ) -> Result<DuplicateVerdict, DedupeError> {
        // Tier 1: exact content hash, always
        let digest = sha256_file(&file.path).map_err(|e| DedupeError::Io {
            path: file.path.clone(),
            source: e,
        })?;

        let existing = self
            .by_hash
            .get(&digest)
            .and_then(|originals| originals.first().cloned());
        if let Some(original) = existing {
            self.register(file, record, digest, None);
            return Ok(DuplicateVerdict::ExactDuplicateOf { original });
        }

        // Tier 2: perceptual similarity, images only
        let mut fingerprint = None;
        let mut verdict = DuplicateVerdict::Unique;

        if self.config.method.perceptual_enabled() && file.kind == MediaKind::Image {
            match self.engine.of_file(&file.path) {
                Ok(fp) => {
                    let class = DimensionClass::of(record);
                    if let Some(best) = self.best_match(class, &fp) {
                        verdict = best;
                    }
                    fingerprint = Some(fp);
                }
                Err(e) => {
                    // Degrades to hash-only for this file
                    warn!(path = %file.path.display(), error = %e, "fingerprint failed");
                }
            }
        }

        self.register(file, record, digest, fingerprint);
        Ok(verdict)
    }

    fn best_match(&self, class: DimensionClass, fingerprint: &Fingerprint) -> Option<DuplicateVerdict> {
        let candidates = self.by_fingerprint.get(&class)?;

        let mut best: Option<(f64, &PathBuf)> = None;
        for (path, existing) in candidates {
            let score = fingerprint.similarity(existing);
            if score >= self.config.similarity_threshold {
                match best {
                    Some((best_score, _)) if best_score >= score => {}
                    _ => best = Some((score, path)),
                }
            }
        }

        best.map(|(score, path)| DuplicateVerdict::SimilarTo {
            original: path.clone(),
            score,
        })
    }

    fn register(
        &mut self,
        file: &MediaFile,
        record: &MetadataRecord,
        digest: String,
        fingerprint: Option<Fingerprint>,
    ) {
        self.by_hash
            .entry(digest)
            .or_default()
            .push(file.path.clone());

        if let Some(fp) = fingerprint {
            self.by_fingerprint
                .entry(DimensionClass::of(record))
                .or_default()
                .push((file.path.clone(), fp));
        }
    }

    /// Number of distinct content hashes seen.
    pub fn distinct_hashes(&self) -> usize {
        self.by_hash.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn media_file(path: &Path, kind: MediaKind) -> MediaFile {
        MediaFile {
            path: path.to_path_buf(),
            size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            modified: SystemTime::UNIX_EPOCH,
            kind,
        }
    }

    fn hash_only_detector() -> DuplicateDetector {
        DuplicateDetector::new(DedupeConfig {
            method: DedupeMethod::Hash,
            ..Default::default()
        })
    }

    #[test]
    fn identical_content_is_exact_duplicate_regardless_of_name() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("original.jpg");
        let nested = dir.path().join("copies");
        std::fs::create_dir(&nested).unwrap();
        let second = nested.join("totally_different_name.jpg");

        std::fs::write(&first, b"identical bytes").unwrap();
        std::fs::write(&second, b"identical bytes").unwrap();

        let mut detector = hash_only_detector();
        let record = MetadataRecord::default();

        let v1 = detector
            .check(&media_file(&first, MediaKind::Image), &record)
            .unwrap();
        let v2 = detector
            .check(&media_file(&second, MediaKind::Image), &record)
            .unwrap();

        assert_eq!(v1, DuplicateVerdict::Unique);
        assert_eq!(
            v2,
            DuplicateVerdict::ExactDuplicateOf { original: first }
        );
    }

    #[test]
    fn different_content_is_unique() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"first content").unwrap();
        std::fs::write(&b, b"second content").unwrap();

        let mut detector = hash_only_detector();
        let record = MetadataRecord::default();

        assert_eq!(
            detector.check(&media_file(&a, MediaKind::Image), &record).unwrap(),
            DuplicateVerdict::Unique
        );
        assert_eq!(
            detector.check(&media_file(&b, MediaKind::Image), &record).unwrap(),
            DuplicateVerdict::Unique
        );
        assert_eq!(detector.distinct_hashes(), 2);
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let mut detector = hash_only_detector();
        let record = MetadataRecord::default();
        let missing = media_file(Path::new("/nonexistent/x.jpg"), MediaKind::Image);

        assert!(detector.check(&missing, &record).is_err());
    }

    #[test]
    fn perceptual_tier_flags_similar_images() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");

        // Same gradient, differently encoded bytes (different dimensions of
        // the same visual ramp) so tier 1 misses but tier 2 matches.
        save_gradient(&a, 64);
        save_gradient(&b, 96);

        let mut detector = DuplicateDetector::new(DedupeConfig {
            method: DedupeMethod::Perceptual,
            similarity_threshold: 0.9,
            ..Default::default()
        });

        let record = MetadataRecord {
            width: Some(64),
            height: Some(32),
            ..Default::default()
        };
        let record_b = MetadataRecord {
            width: Some(96),
            height: Some(48),
            ..Default::default()
        };

        let v1 = detector
            .check(&media_file(&a, MediaKind::Image), &record)
            .unwrap();
        let v2 = detector
            .check(&media_file(&b, MediaKind::Image), &record_b)
            .unwrap();

        assert_eq!(v1, DuplicateVerdict::Unique);
        match v2 {
            DuplicateVerdict::SimilarTo { original, score } => {
                assert_eq!(original, a);
                assert!(score >= 0.9);
            }
            other => panic!("expected SimilarTo, got {:?}", other),
        }
    }

    #[test]
    fn different_dimension_classes_are_not_compared() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("landscape.png");
        let b = dir.path().join("portrait.png");
        save_gradient(&a, 64);
        save_gradient(&b, 96);

        let mut detector = DuplicateDetector::new(DedupeConfig {
            method: DedupeMethod::Perceptual,
            similarity_threshold: 0.5,
            ..Default::default()
        });

        let landscape = MetadataRecord {
            width: Some(64),
            height: Some(32),
            ..Default::default()
        };
        let portrait = MetadataRecord {
            width: Some(48),
            height: Some(96),
            ..Default::default()
        };

        detector
            .check(&media_file(&a, MediaKind::Image), &landscape)
            .unwrap();
        let verdict = detector
            .check(&media_file(&b, MediaKind::Image), &portrait)
            .unwrap();

        assert_eq!(verdict, DuplicateVerdict::Unique);
    }

    #[test]
    fn videos_skip_the_perceptual_tier() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("clip.mp4");
        std::fs::write(&a, b"not decodable as an image").unwrap();

        let mut detector = DuplicateDetector::new(DedupeConfig {
            method: DedupeMethod::Both,
            ..Default::default()
        });

        // Would fail decoding if tier 2 ran; it must not
        let verdict = detector
            .check(&media_file(&a, MediaKind::Video), &MetadataRecord::default())
            .unwrap();

        assert_eq!(verdict, DuplicateVerdict::Unique);
    }

    /// Write a horizontal grayscale ramp as a PNG, 2:1 aspect.
    fn save_gradient(path: &Path, width: u32) {
        let height = width / 2;
        let img = image::ImageBuffer::from_fn(width, height, |x, _| {
            let b = (x * 255 / (width - 1)) as u8;
            image::Rgb([b, b, b])
        });
        image::DynamicImage::ImageRgb8(img).save(path).unwrap();
    }
}
