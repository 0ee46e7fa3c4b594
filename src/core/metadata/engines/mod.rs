//! Capability-typed extraction engines.
//!
//! Each engine reports whether it is usable on this system and extracts
//! whatever fields it can. Absence of an engine costs completeness, never
//! correctness.

mod embedded;
mod exiftool;
mod ffprobe;
mod filesystem;

pub use embedded::EmbeddedExifEngine;
pub use exiftool::ExifToolEngine;
pub use ffprobe::FfprobeEngine;
pub use filesystem::FilesystemEngine;

use super::MetadataRecord;
use crate::core::scanner::MediaFile;
use crate::error::ExtractError;
use chrono::NaiveDateTime;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant, SystemTime};

/// A single metadata extraction engine.
pub trait MetadataEngine: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Whether the engine can run on this system
    fn available(&self) -> bool;

    /// Extract whatever fields this engine understands.
    fn extract(&self, file: &MediaFile) -> Result<MetadataRecord, ExtractError>;
}

/// The default engine chain for still images, strongest first.
pub fn default_image_chain() -> Vec<Box<dyn MetadataEngine>> {
    vec![
        Box::new(ExifToolEngine::new()),
        Box::new(EmbeddedExifEngine::new()),
        Box::new(FilesystemEngine::new()),
    ]
}

/// The default engine chain for videos.
pub fn default_video_chain() -> Vec<Box<dyn MetadataEngine>> {
    vec![
        Box::new(FfprobeEngine::new()),
        Box::new(FilesystemEngine::new()),
    ]
}

/// Run an external tool, killing it if it exceeds the timeout.
///
/// Stdout is read after exit; the JSON emitted for a single file fits the
/// pipe buffer, so there is no drain thread.
pub(crate) fn run_tool(
    mut command: Command,
    path: &Path,
    timeout: Duration,
) -> Result<Vec<u8>, ExtractError> {
    command.stdout(Stdio::piped()).stderr(Stdio::null());

    let mut child = command.spawn().map_err(|e| ExtractError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let output = child.wait_with_output().map_err(|e| ExtractError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                if !status.success() {
                    return Err(ExtractError::ToolFailed {
                        path: path.to_path_buf(),
                        reason: format!("exit status {}", status),
                    });
                }
                return Ok(output.stdout);
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExtractError::ToolTimeout {
                        path: path.to_path_buf(),
                        seconds: timeout.as_secs(),
                    });
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => {
                return Err(ExtractError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

/// Convert a filesystem timestamp into a naive local datetime.
pub(crate) fn systemtime_to_naive(time: SystemTime) -> NaiveDateTime {
    let local: chrono::DateTime<chrono::Local> = time.into();
    local.naive_local()
}

/// Parse an EXIF-style timestamp ("YYYY:MM:DD HH:MM:SS", optional zone suffix).
pub(crate) fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let head = raw.trim().get(..19)?;
    NaiveDateTime::parse_from_str(head, "%Y:%m:%d %H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_exif_datetime() {
        let dt = parse_exif_datetime("2024:03:15 14:30:22").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-15 14:30:22");
    }

    #[test]
    fn parses_datetime_with_zone_suffix() {
        let dt = parse_exif_datetime("2024:03:15 14:30:22+02:00").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "14:30:22");
    }

    #[test]
    fn rejects_malformed_datetime() {
        assert!(parse_exif_datetime("0000:00:00").is_none());
        assert!(parse_exif_datetime("not a date at all!").is_none());
    }
}
