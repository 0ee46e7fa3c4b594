//! External `ffprobe` engine for video containers.
//!
//! Reads the container-level creation timestamp and the dimensions of the
//! first video stream. Anything beyond that (codec, bitrate) is not part of
//! the normalized record.

use super::{run_tool, MetadataEngine};
use crate::core::metadata::MetadataRecord;
use crate::core::scanner::MediaFile;
use crate::error::ExtractError;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::process::Command;
use std::time::Duration;

const TOOL_TIMEOUT: Duration = Duration::from_secs(15);

/// Engine shelling out to the `ffprobe` binary.
pub struct FfprobeEngine {
    available: bool,
}

impl FfprobeEngine {
    /// Probe for the binary once at construction.
    pub fn new() -> Self {
        let available = Command::new("ffprobe")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        Self { available }
    }

    fn parse_output(raw: &[u8], file: &MediaFile) -> Result<MetadataRecord, ExtractError> {
        let parsed: Value = serde_json::from_slice(raw).map_err(|e| ExtractError::Parse {
            path: file.path.clone(),
            reason: e.to_string(),
        })?;

        let mut record = MetadataRecord::default();

        record.capture_time = parsed
            .pointer("/format/tags/creation_time")
            .and_then(|v| v.as_str())
            .and_then(parse_iso_datetime);

        if let Some(streams) = parsed.get("streams").and_then(|s| s.as_array()) {
            let video_stream = streams
                .iter()
                .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"));
            if let Some(stream) = video_stream {
                record.width = stream.get("width").and_then(|v| v.as_u64()).map(|v| v as u32);
                record.height = stream.get("height").and_then(|v| v.as_u64()).map(|v| v as u32);
                // Some phones stamp the creation time per stream instead
                if record.capture_time.is_none() {
                    record.capture_time = stream
                        .pointer("/tags/creation_time")
                        .and_then(|v| v.as_str())
                        .and_then(parse_iso_datetime);
                }
            }
        }

        Ok(record)
    }
}

impl Default for FfprobeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataEngine for FfprobeEngine {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn available(&self) -> bool {
        self.available
    }

    fn extract(&self, file: &MediaFile) -> Result<MetadataRecord, ExtractError> {
        if !self.available {
            return Err(ExtractError::Unavailable { engine: self.name() });
        }

        let mut command = Command::new("ffprobe");
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(&file.path);

        let stdout = run_tool(command, &file.path, TOOL_TIMEOUT)?;
        Self::parse_output(&stdout, file)
    }
}

/// Parse the ISO-8601 timestamps ffprobe emits ("2024-03-15T14:30:22.000000Z").
fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    let head = raw.trim().get(..19)?;
    NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaKind;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn test_file() -> MediaFile {
        MediaFile {
            path: PathBuf::from("/videos/clip.mp4"),
            size: 1000,
            modified: SystemTime::UNIX_EPOCH,
            kind: MediaKind::Video,
        }
    }

    #[test]
    fn parses_format_creation_time_and_dimensions() {
        let json = br#"{
            "format": { "tags": { "creation_time": "2024-03-15T14:30:22.000000Z" } },
            "streams": [
                { "codec_type": "audio" },
                { "codec_type": "video", "width": 3840, "height": 2160 }
            ]
        }"#;

        let record = FfprobeEngine::parse_output(json, &test_file()).unwrap();

        assert!(record.capture_time.is_some());
        assert_eq!(record.width, Some(3840));
        assert_eq!(record.height, Some(2160));
    }

    #[test]
    fn falls_back_to_stream_creation_time() {
        let json = br#"{
            "format": {},
            "streams": [
                { "codec_type": "video", "width": 1920, "height": 1080,
                  "tags": { "creation_time": "2023-07-01T08:00:00.000000Z" } }
            ]
        }"#;

        let record = FfprobeEngine::parse_output(json, &test_file()).unwrap();
        assert!(record.capture_time.is_some());
    }

    #[test]
    fn missing_tags_yield_empty_record() {
        let record = FfprobeEngine::parse_output(b"{}", &test_file()).unwrap();
        assert!(record.capture_time.is_none());
        assert!(record.width.is_none());
    }
}
