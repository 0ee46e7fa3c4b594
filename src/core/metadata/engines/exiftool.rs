//! External `exiftool` engine.
//!
//! The strongest extractor when the binary is installed: it understands
//! maker notes, XMP and video containers alike. Invoked as
//! `exiftool -json -n <file>` so GPS arrives as signed decimals and
//! numeric tags arrive unformatted.

use super::{parse_exif_datetime, run_tool, MetadataEngine};
use crate::core::metadata::{GpsPosition, MetadataRecord};
use crate::core::scanner::MediaFile;
use crate::error::ExtractError;
use serde_json::Value;
use std::process::Command;
use std::time::Duration;

const TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine shelling out to the `exiftool` binary.
pub struct ExifToolEngine {
    available: bool,
}

impl ExifToolEngine {
    /// Probe for the binary once at construction.
    pub fn new() -> Self {
        let available = Command::new("exiftool")
            .arg("-ver")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        Self { available }
    }

    fn parse_output(raw: &[u8], file: &MediaFile) -> Result<MetadataRecord, ExtractError> {
        let parsed: Value =
            serde_json::from_slice(raw).map_err(|e| ExtractError::Parse {
                path: file.path.clone(),
                reason: e.to_string(),
            })?;

        let tags = parsed
            .as_array()
            .and_then(|a| a.first())
            .ok_or_else(|| ExtractError::Parse {
                path: file.path.clone(),
                reason: "empty exiftool output".to_string(),
            })?;

        let mut record = MetadataRecord::default();

        record.capture_time = str_tag(tags, "DateTimeOriginal").and_then(|s| parse_exif_datetime(&s));
        record.digitized_time = str_tag(tags, "CreateDate").and_then(|s| parse_exif_datetime(&s));
        record.modify_time = str_tag(tags, "ModifyDate").and_then(|s| parse_exif_datetime(&s));

        record.camera_make = str_tag(tags, "Make");
        record.camera_model = str_tag(tags, "Model");
        record.lens_model = str_tag(tags, "LensModel").or_else(|| str_tag(tags, "LensInfo"));

        record.iso = num_tag(tags, "ISO").map(|v| v as u32);
        record.aperture = num_tag(tags, "FNumber").or_else(|| num_tag(tags, "Aperture"));
        record.shutter_speed = num_tag(tags, "ExposureTime").map(format_shutter);
        record.focal_length = num_tag(tags, "FocalLength");

        record.width = num_tag(tags, "ImageWidth").map(|v| v as u32);
        record.height = num_tag(tags, "ImageHeight").map(|v| v as u32);

        // -n mode emits signed decimal degrees directly
        if let (Some(lat), Some(lon)) = (num_tag(tags, "GPSLatitude"), num_tag(tags, "GPSLongitude"))
        {
            let position = GpsPosition {
                latitude: lat,
                longitude: lon,
                altitude: num_tag(tags, "GPSAltitude"),
            };
            if position.is_valid() {
                record.gps = Some(position);
            }
        }

        record.software = str_tag(tags, "Software");
        record.artist = str_tag(tags, "Artist");

        Ok(record)
    }
}

impl Default for ExifToolEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataEngine for ExifToolEngine {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    fn available(&self) -> bool {
        self.available
    }

    fn extract(&self, file: &MediaFile) -> Result<MetadataRecord, ExtractError> {
        if !self.available {
            return Err(ExtractError::Unavailable { engine: self.name() });
        }

        let mut command = Command::new("exiftool");
        command.arg("-json").arg("-n").arg(&file.path);

        let stdout = run_tool(command, &file.path, TOOL_TIMEOUT)?;
        Self::parse_output(&stdout, file)
    }
}

fn str_tag(tags: &Value, name: &str) -> Option<String> {
    match tags.get(name) {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn num_tag(tags: &Value, name: &str) -> Option<f64> {
    match tags.get(name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Format a numeric exposure time the way photographers write it.
fn format_shutter(seconds: f64) -> String {
    if seconds <= 0.0 {
        return seconds.to_string();
    }
    if seconds < 1.0 {
        format!("1/{}", (1.0 / seconds).round() as u64)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaKind;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn test_file() -> MediaFile {
        MediaFile {
            path: PathBuf::from("/photos/a.jpg"),
            size: 1000,
            modified: SystemTime::UNIX_EPOCH,
            kind: MediaKind::Image,
        }
    }

    #[test]
    fn parses_exiftool_json() {
        let json = br#"[{
            "DateTimeOriginal": "2024:03:15 14:30:22",
            "Make": "Canon",
            "Model": "EOS R5",
            "ISO": 400,
            "FNumber": 2.8,
            "ExposureTime": 0.004,
            "FocalLength": 50,
            "ImageWidth": 8192,
            "ImageHeight": 5464,
            "GPSLatitude": 48.8584,
            "GPSLongitude": 2.2945
        }]"#;

        let record = ExifToolEngine::parse_output(json, &test_file()).unwrap();

        assert_eq!(record.camera_make.as_deref(), Some("Canon"));
        assert_eq!(record.camera_model.as_deref(), Some("EOS R5"));
        assert_eq!(record.iso, Some(400));
        assert_eq!(record.aperture, Some(2.8));
        assert_eq!(record.shutter_speed.as_deref(), Some("1/250"));
        assert_eq!(record.width, Some(8192));
        let gps = record.gps.unwrap();
        assert!((gps.latitude - 48.8584).abs() < 1e-9);
        assert!((gps.longitude - 2.2945).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_gps() {
        let json = br#"[{"GPSLatitude": 123.0, "GPSLongitude": 500.0}]"#;
        let record = ExifToolEngine::parse_output(json, &test_file()).unwrap();
        assert!(record.gps.is_none());
    }

    #[test]
    fn empty_output_is_a_parse_error() {
        let result = ExifToolEngine::parse_output(b"[]", &test_file());
        assert!(result.is_err());
    }

    #[test]
    fn shutter_formatting() {
        assert_eq!(format_shutter(0.004), "1/250");
        assert_eq!(format_shutter(0.5), "1/2");
        assert_eq!(format_shutter(2.0), "2s");
    }
}
