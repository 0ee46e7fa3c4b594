//! # Metadata Module
//!
//! Normalized metadata records and the extraction engine chain.
//!
//! ## Extracted Fields
//! - Capture / digitized / modify timestamps plus the filesystem mtime
//! - Camera make, model and lens
//! - Exposure settings (ISO, aperture, shutter speed, focal length)
//! - Pixel dimensions
//! - GPS position in decimal degrees
//! - Software and artist tags
//!
//! ## Extraction Chain
//! Engines are tried in priority order (exiftool, embedded EXIF reader,
//! filesystem attributes for images; ffprobe, filesystem for videos). Fields
//! from a later, weaker engine never overwrite fields an earlier engine
//! already populated.

pub mod engines;
mod extractor;

pub use engines::{default_image_chain, default_video_chain, MetadataEngine};
pub use extractor::{Extraction, MetadataExtractor};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A GPS position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPosition {
    /// Latitude, negative = southern hemisphere
    pub latitude: f64,
    /// Longitude, negative = western hemisphere
    pub longitude: f64,
    /// Altitude in meters, if recorded
    pub altitude: Option<f64>,
}

impl GpsPosition {
    /// Check that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Normalized metadata for a single media file.
///
/// Produced once per file by the extractor and owned by its cache entry;
/// read-only thereafter. Every field is optional - a record built from
/// filesystem attributes alone is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Original capture time (DateTimeOriginal)
    pub capture_time: Option<NaiveDateTime>,
    /// Digitization time (CreateDate)
    pub digitized_time: Option<NaiveDateTime>,
    /// Generic embedded modification time (DateTime)
    pub modify_time: Option<NaiveDateTime>,
    /// Filesystem modification time
    pub file_modified: Option<NaiveDateTime>,
    /// Camera manufacturer (e.g., "Canon")
    pub camera_make: Option<String>,
    /// Camera model (e.g., "EOS R5")
    pub camera_model: Option<String>,
    /// Lens model
    pub lens_model: Option<String>,
    /// ISO sensitivity
    pub iso: Option<u32>,
    /// Aperture as an f-number
    pub aperture: Option<f64>,
    /// Shutter speed, as recorded (e.g., "1/250")
    pub shutter_speed: Option<String>,
    /// Focal length in millimeters
    pub focal_length: Option<f64>,
    /// Image width in pixels
    pub width: Option<u32>,
    /// Image height in pixels
    pub height: Option<u32>,
    /// GPS position
    pub gps: Option<GpsPosition>,
    /// Processing software tag
    pub software: Option<String>,
    /// Artist / creator tag
    pub artist: Option<String>,
}

impl MetadataRecord {
    /// Resolve the best capture time available.
    ///
    /// Priority: original capture tag, create-date tag, generic datetime tag,
    /// filesystem mtime. Returns `None` when none of these are present.
    pub fn best_capture_time(&self) -> Option<NaiveDateTime> {
        self.capture_time
            .or(self.digitized_time)
            .or(self.modify_time)
            .or(self.file_modified)
    }

    /// Check if any embedded metadata was extracted (beyond filesystem attributes)
    pub fn has_embedded_data(&self) -> bool {
        self.capture_time.is_some()
            || self.digitized_time.is_some()
            || self.camera_make.is_some()
            || self.camera_model.is_some()
            || self.gps.is_some()
            || self.width.is_some()
            || self.height.is_some()
    }

    /// Get a display string for the camera
    pub fn camera_display(&self) -> Option<String> {
        match (&self.camera_make, &self.camera_model) {
            (Some(make), Some(model)) => {
                // Avoid duplication like "Apple Apple iPhone"
                if model.starts_with(make) {
                    Some(model.clone())
                } else {
                    Some(format!("{} {}", make, model))
                }
            }
            (None, Some(model)) => Some(model.clone()),
            (Some(make), None) => Some(make.clone()),
            (None, None) => None,
        }
    }

    /// Fill every `None` field of `self` from `other`.
    ///
    /// Used by the engine chain: earlier engines populate first, later ones
    /// only supply what is still missing.
    pub fn fill_missing_from(&mut self, other: MetadataRecord) {
        macro_rules! fill {
            ($($field:ident),+ $(,)?) => {
                $(if self.$field.is_none() { self.$field = other.$field; })+
            };
        }
        fill!(
            capture_time,
            digitized_time,
            modify_time,
            file_modified,
            camera_make,
            camera_model,
            lens_model,
            iso,
            aperture,
            shutter_speed,
            focal_length,
            width,
            height,
            gps,
            software,
            artist,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn best_capture_time_prefers_original_tag() {
        let record = MetadataRecord {
            capture_time: Some(dt(2024, 3, 15, 14, 30)),
            digitized_time: Some(dt(2024, 3, 16, 9, 0)),
            file_modified: Some(dt(2024, 4, 1, 0, 0)),
            ..Default::default()
        };
        assert_eq!(record.best_capture_time(), Some(dt(2024, 3, 15, 14, 30)));
    }

    #[test]
    fn best_capture_time_falls_back_to_file_mtime() {
        let record = MetadataRecord {
            file_modified: Some(dt(2024, 4, 1, 0, 0)),
            ..Default::default()
        };
        assert_eq!(record.best_capture_time(), Some(dt(2024, 4, 1, 0, 0)));
    }

    #[test]
    fn best_capture_time_absent_is_none_not_error() {
        let record = MetadataRecord::default();
        assert_eq!(record.best_capture_time(), None);
    }

    #[test]
    fn camera_display_combines_make_model() {
        let record = MetadataRecord {
            camera_make: Some("Canon".to_string()),
            camera_model: Some("EOS R5".to_string()),
            ..Default::default()
        };
        assert_eq!(record.camera_display(), Some("Canon EOS R5".to_string()));
    }

    #[test]
    fn camera_display_avoids_duplication() {
        let record = MetadataRecord {
            camera_make: Some("Apple".to_string()),
            camera_model: Some("Apple iPhone 15 Pro".to_string()),
            ..Default::default()
        };
        assert_eq!(record.camera_display(), Some("Apple iPhone 15 Pro".to_string()));
    }

    #[test]
    fn fill_missing_never_overwrites() {
        let mut primary = MetadataRecord {
            camera_model: Some("EOS R5".to_string()),
            iso: Some(100),
            ..Default::default()
        };
        let secondary = MetadataRecord {
            camera_model: Some("Weaker Engine Model".to_string()),
            iso: Some(6400),
            lens_model: Some("RF 24-70mm".to_string()),
            ..Default::default()
        };

        primary.fill_missing_from(secondary);

        assert_eq!(primary.camera_model.as_deref(), Some("EOS R5"));
        assert_eq!(primary.iso, Some(100));
        assert_eq!(primary.lens_model.as_deref(), Some("RF 24-70mm"));
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = MetadataRecord {
            capture_time: Some(dt(2024, 3, 15, 14, 30)),
            camera_make: Some("Canon".to_string()),
            gps: Some(GpsPosition {
                latitude: 48.8584,
                longitude: 2.2945,
                altitude: None,
            }),
            iso: Some(400),
            ..Default::default()
        };

        let json = serde_json::to_string(&record).unwrap();
        let restored: MetadataRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record, restored);
        // Absent fields stay absent
        assert!(restored.lens_model.is_none());
        assert!(restored.gps.unwrap().altitude.is_none());
    }

    #[test]
    fn gps_validity_ranges() {
        let valid = GpsPosition { latitude: 48.85, longitude: 2.29, altitude: None };
        let invalid = GpsPosition { latitude: 91.0, longitude: 2.29, altitude: None };
        assert!(valid.is_valid());
        assert!(!invalid.is_valid());
    }
}
