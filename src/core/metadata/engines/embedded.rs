//! Embedded EXIF reader engine.
//!
//! Pure-Rust fallback using the `exif` crate (kamadak-exif). Requires no
//! external binary, so it is always available, but understands fewer
//! containers than exiftool (JPEG and TIFF mainly).

use super::{parse_exif_datetime, MetadataEngine};
use crate::core::metadata::{GpsPosition, MetadataRecord};
use crate::core::scanner::MediaFile;
use crate::error::ExtractError;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;

/// Engine reading EXIF directly from the file with the `exif` crate.
pub struct EmbeddedExifEngine;

impl EmbeddedExifEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmbeddedExifEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataEngine for EmbeddedExifEngine {
    fn name(&self) -> &'static str {
        "embedded-exif"
    }

    fn available(&self) -> bool {
        true
    }

    fn extract(&self, file: &MediaFile) -> Result<MetadataRecord, ExtractError> {
        let handle = File::open(&file.path).map_err(|e| ExtractError::Io {
            path: file.path.clone(),
            source: e,
        })?;

        let mut reader = BufReader::new(&handle);
        let exif = Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| ExtractError::Parse {
                path: file.path.clone(),
                reason: e.to_string(),
            })?;

        let mut record = MetadataRecord::default();

        record.capture_time =
            ascii_value(&exif, Tag::DateTimeOriginal).and_then(|s| parse_exif_datetime(&s));
        record.digitized_time =
            ascii_value(&exif, Tag::DateTimeDigitized).and_then(|s| parse_exif_datetime(&s));
        record.modify_time = ascii_value(&exif, Tag::DateTime).and_then(|s| parse_exif_datetime(&s));

        record.camera_make = ascii_value(&exif, Tag::Make);
        record.camera_model = ascii_value(&exif, Tag::Model);
        record.lens_model = ascii_value(&exif, Tag::LensModel);

        record.iso = uint_value(&exif, Tag::PhotographicSensitivity);
        record.aperture = rational_value(&exif, Tag::FNumber);
        record.shutter_speed = shutter_value(&exif);
        record.focal_length = rational_value(&exif, Tag::FocalLength);

        record.width = uint_value(&exif, Tag::PixelXDimension)
            .or_else(|| uint_value(&exif, Tag::ImageWidth));
        record.height = uint_value(&exif, Tag::PixelYDimension)
            .or_else(|| uint_value(&exif, Tag::ImageLength));

        record.gps = gps_value(&exif);

        record.software = ascii_value(&exif, Tag::Software);
        record.artist = ascii_value(&exif, Tag::Artist);

        Ok(record)
    }
}

fn ascii_value(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Ascii(ref vec) = field.value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

fn uint_value(exif: &Exif, tag: Tag) -> Option<u32> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Long(ref vec) => vec.first().copied(),
        Value::Short(ref vec) => vec.first().map(|v| *v as u32),
        _ => None,
    }
}

fn rational_value(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Rational(ref vec) = field.value {
        return vec.first().map(|r| r.to_f64());
    }
    None
}

/// Shutter speed as photographers write it: "1/250" for sub-second exposures.
fn shutter_value(exif: &Exif) -> Option<String> {
    let field = exif.get_field(Tag::ExposureTime, In::PRIMARY)?;
    if let Value::Rational(ref vec) = field.value {
        let r = vec.first()?;
        if r.denom == 0 {
            return None;
        }
        if r.num < r.denom {
            return Some(format!("{}/{}", r.num, r.denom));
        }
        return Some(format!("{}s", r.to_f64()));
    }
    None
}

/// Decimal degrees from degree/minute/second rationals plus hemisphere refs.
fn gps_value(exif: &Exif) -> Option<GpsPosition> {
    let latitude = dms_value(exif, Tag::GPSLatitude)?;
    let longitude = dms_value(exif, Tag::GPSLongitude)?;

    let lat_sign = hemisphere_sign(exif, Tag::GPSLatitudeRef, "S");
    let lon_sign = hemisphere_sign(exif, Tag::GPSLongitudeRef, "W");

    let position = GpsPosition {
        latitude: latitude * lat_sign,
        longitude: longitude * lon_sign,
        altitude: rational_value(exif, Tag::GPSAltitude),
    };

    position.is_valid().then_some(position)
}

fn dms_value(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Rational(ref parts) = field.value {
        let degrees = parts.first()?.to_f64();
        let minutes = parts.get(1).map(|r| r.to_f64()).unwrap_or(0.0);
        let seconds = parts.get(2).map(|r| r.to_f64()).unwrap_or(0.0);
        return Some(degrees + minutes / 60.0 + seconds / 3600.0);
    }
    None
}

fn hemisphere_sign(exif: &Exif, tag: Tag, negative_ref: &str) -> f64 {
    match ascii_value(exif, tag) {
        Some(ref s) if s.eq_ignore_ascii_case(negative_ref) => -1.0,
        _ => 1.0,
    }
}
