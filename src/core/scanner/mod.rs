//! # Scanner Module
//!
//! Discovers photo and video files in a source tree.
//!
//! ## Classification
//! Files are classified by extension into one of four kinds:
//! - **Image** - jpg, jpeg, png, heic, heif, webp, gif, bmp, tiff, tif
//! - **RawImage** - cr2, cr3, nef, nrw, arw, orf, rw2, dng, raf, pef, srw, x3f
//! - **Video** - mp4, mov, avi, mkv, wmv, m4v, mpg, mpeg, mts, m2ts, 3gp, webm
//! - **Unknown** - anything else
//!
//! ## Example
//! ```rust,ignore
//! use shutter_sort::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let result = scanner.scan(&"/Users/photos".into())?;
//! ```

mod filter;
mod walker;

pub use filter::MediaFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Immutable identity of a discovered media file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified time
    pub modified: SystemTime,
    /// Classification by extension
    pub kind: MediaKind,
}

impl MediaFile {
    /// Build a `MediaFile` from a path by querying the filesystem.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|e| ScanError::ReadDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            kind: MediaKind::from_path(path),
        })
    }

    /// The lowercase extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Media file classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    RawImage,
    Video,
    Unknown,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "webp", "gif", "bmp", "tiff", "tif",
];

const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "nef", "nrw", "arw", "orf", "rw2", "dng", "raf", "pef", "srw", "x3f",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "m4v", "mpg", "mpeg", "mts", "m2ts", "3gp", "webm",
];

impl MediaKind {
    /// Detect kind from a file extension
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if RAW_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::RawImage
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }

    /// Detect kind from a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Unknown)
    }

    /// Whether this kind holds still-image content (processed or raw)
    pub fn is_image(&self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::RawImage)
    }

    /// Whether this is a recognized media kind
    pub fn is_media(&self) -> bool {
        !matches!(self, MediaKind::Unknown)
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Successfully discovered media files
    pub files: Vec<MediaFile>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for media scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait MediaScanner: Send + Sync {
    /// Scan a source root and return discovered media files
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension_images() {
        assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("JPEG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("heic"), MediaKind::Image);
    }

    #[test]
    fn kind_from_extension_raw() {
        assert_eq!(MediaKind::from_extension("cr2"), MediaKind::RawImage);
        assert_eq!(MediaKind::from_extension("NEF"), MediaKind::RawImage);
        assert_eq!(MediaKind::from_extension("dng"), MediaKind::RawImage);
    }

    #[test]
    fn kind_from_extension_video() {
        assert_eq!(MediaKind::from_extension("mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("MOV"), MediaKind::Video);
    }

    #[test]
    fn unknown_extension_returns_unknown() {
        assert_eq!(MediaKind::from_extension("txt"), MediaKind::Unknown);
        assert_eq!(MediaKind::from_extension("pdf"), MediaKind::Unknown);
    }

    #[test]
    fn raw_counts_as_image() {
        assert!(MediaKind::RawImage.is_image());
        assert!(MediaKind::Image.is_image());
        assert!(!MediaKind::Video.is_image());
    }

    #[test]
    fn kind_from_path_without_extension() {
        assert_eq!(MediaKind::from_path(Path::new("/tmp/README")), MediaKind::Unknown);
    }
}
