//! # Resolve Module
//!
//! Composes the final destination path for a file: kind-based subfolder,
//! rendered folder template, rendered filename, and collision-free sequence
//! numbering.
//!
//! ## Collision Policy
//! When the resolved path exists and is not the same file as the source, a
//! trailing zero-padded sequence number is appended. The next number comes
//! from scanning existing siblings for the highest sequence, not from a
//! counter starting at 1 - earlier runs may have left gaps.

use crate::core::geocode::PlaceInfo;
use crate::core::metadata::MetadataRecord;
use crate::core::scanner::{MediaFile, MediaKind};
use crate::core::template::{sanitize_component, sanitize_folder, CameraSlugger, Pattern, TemplateVars};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind-based subfolder routing, each independently toggleable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRules {
    /// Subfolder for raw images, None = no subfolder
    pub raw: Option<String>,
    /// Subfolder for processed images
    pub image: Option<String>,
    /// Subfolder for videos
    pub video: Option<String>,
    /// Subfolder for unrecognized files
    pub unknown: Option<String>,
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            raw: Some("RAW".to_string()),
            image: Some("JPG".to_string()),
            video: Some("VIDEOS".to_string()),
            unknown: Some("UNKNOWN".to_string()),
        }
    }
}

impl RoutingRules {
    /// No kind subfolders at all.
    pub fn flat() -> Self {
        Self {
            raw: None,
            image: None,
            video: None,
            unknown: None,
        }
    }

    fn folder_for(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::RawImage => self.raw.as_deref(),
            MediaKind::Image => self.image.as_deref(),
            MediaKind::Video => self.video.as_deref(),
            MediaKind::Unknown => self.unknown.as_deref(),
        }
    }
}

/// Resolves destination paths from templates, routing rules and collision
/// scanning.
pub struct PathResolver {
    naming: Pattern,
    folder: Pattern,
    routing: RoutingRules,
    slugger: CameraSlugger,
    sequence_width: usize,
    lowercase_extension: bool,
}

impl PathResolver {
    pub fn new(naming_pattern: &str, folder_pattern: &str, routing: RoutingRules) -> Self {
        Self {
            naming: Pattern::parse(naming_pattern),
            folder: Pattern::parse(folder_pattern),
            routing,
            slugger: CameraSlugger::new(),
            sequence_width: 2,
            lowercase_extension: true,
        }
    }

    /// Replace the default slugger (custom camera mappings).
    pub fn with_slugger(mut self, slugger: CameraSlugger) -> Self {
        self.slugger = slugger;
        self
    }

    /// Width of the zero-padded collision sequence number.
    pub fn with_sequence_width(mut self, width: usize) -> Self {
        self.sequence_width = width.max(1);
        self
    }

    /// Resolve the full destination path for a file.
    ///
    /// The returned path is free at resolution time; directories are not
    /// created here.
    pub fn resolve(
        &self,
        file: &MediaFile,
        record: &MetadataRecord,
        place: Option<&PlaceInfo>,
        destination_root: &Path,
    ) -> PathBuf {
        let directory = self.resolve_directory(file, record, place, destination_root);
        let stem = self.resolve_stem(file, record, place);
        let extension = self.resolve_extension(file);

        next_available_path(&directory, &stem, &extension, self.sequence_width, &file.path)
    }

    /// The destination directory: root / kind subfolder / rendered folders.
    pub fn resolve_directory(
        &self,
        file: &MediaFile,
        record: &MetadataRecord,
        place: Option<&PlaceInfo>,
        destination_root: &Path,
    ) -> PathBuf {
        let mut directory = destination_root.to_path_buf();

        if let Some(subfolder) = self.routing.folder_for(file.kind) {
            directory.push(subfolder);
        }

        let vars = self.vars_for(file, record, place);
        let rendered = sanitize_folder(&self.folder.render(&vars));
        for segment in rendered.split('/').filter(|s| !s.is_empty()) {
            directory.push(segment);
        }

        directory
    }

    fn resolve_stem(
        &self,
        file: &MediaFile,
        record: &MetadataRecord,
        place: Option<&PlaceInfo>,
    ) -> String {
        let vars = self.vars_for(file, record, place);
        let rendered = sanitize_component(&self.naming.render(&vars));

        if rendered.is_empty() {
            // Fully collapsed name: fall back to the original stem
            file.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string()
        } else {
            rendered
        }
    }

    fn resolve_extension(&self, file: &MediaFile) -> String {
        let ext = file
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        if self.lowercase_extension {
            ext.to_lowercase()
        } else {
            ext
        }
    }

    fn vars_for(
        &self,
        file: &MediaFile,
        record: &MetadataRecord,
        place: Option<&PlaceInfo>,
    ) -> TemplateVars {
        let original_name = file
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed");
        TemplateVars::from_record(record, original_name, place, &self.slugger)
    }
}

/// Find the next free path for `stem.ext` in `directory`.
///
/// If the plain name is taken by a different file, existing `stem_NN.ext`
/// siblings are scanned for the highest sequence and the next one is used.
pub fn next_available_path(
    directory: &Path,
    stem: &str,
    extension: &str,
    width: usize,
    source: &Path,
) -> PathBuf {
    let file_name = join_name(stem, extension);
    let candidate = directory.join(&file_name);

    if !candidate.exists() {
        return candidate;
    }
    if is_same_file(&candidate, source) {
        return candidate;
    }

    let mut max_sequence = highest_existing_sequence(directory, stem, extension);

    loop {
        max_sequence += 1;
        let name = join_name(&format!("{}_{:0width$}", stem, max_sequence, width = width), extension);
        let next = directory.join(name);
        if !next.exists() {
            return next;
        }
    }
}

fn highest_existing_sequence(directory: &Path, stem: &str, extension: &str) -> u32 {
    let pattern = match Regex::new(&format!(r"^{}_(\d+)$", regex::escape(stem))) {
        Ok(re) => re,
        Err(_) => return 0,
    };

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut max_sequence = 0;
    for entry in entries.flatten() {
        let path = entry.path();

        let same_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(extension.is_empty());
        if !same_ext {
            continue;
        }

        if let Some(name_stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Some(caps) = pattern.captures(name_stem) {
                if let Ok(sequence) = caps[1].parse::<u32>() {
                    max_sequence = max_sequence.max(sequence);
                }
            }
        }
    }

    max_sequence
}

fn join_name(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn media_file(path: &Path, kind: MediaKind) -> MediaFile {
        MediaFile {
            path: path.to_path_buf(),
            size: 100,
            modified: SystemTime::UNIX_EPOCH,
            kind,
        }
    }

    fn dated_record() -> MetadataRecord {
        MetadataRecord {
            capture_time: NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(14, 30, 22),
            camera_make: Some("Canon".to_string()),
            camera_model: Some("EOS R5".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn routes_by_kind_and_renders_folders() {
        let resolver = PathResolver::new(
            "{date}_{original_name}",
            "{year}/{month:02d}",
            RoutingRules::default(),
        );
        let file = media_file(Path::new("/src/IMG_1.CR2"), MediaKind::RawImage);

        let resolved = resolver.resolve(&file, &dated_record(), None, Path::new("/dest"));

        assert_eq!(
            resolved,
            PathBuf::from("/dest/RAW/2024/03/20240315_IMG_1.cr2")
        );
    }

    #[test]
    fn disabled_routing_omits_subfolder() {
        let resolver =
            PathResolver::new("{original_name}", "{year}", RoutingRules::flat());
        let file = media_file(Path::new("/src/IMG_1.jpg"), MediaKind::Image);

        let resolved = resolver.resolve(&file, &dated_record(), None, Path::new("/dest"));

        assert_eq!(resolved, PathBuf::from("/dest/2024/IMG_1.jpg"));
    }

    #[test]
    fn collision_scans_for_next_free_sequence() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("IMG_001.jpg")).unwrap();
        File::create(dir.path().join("IMG_001_01.jpg")).unwrap();

        let next = next_available_path(dir.path(), "IMG_001", "jpg", 2, Path::new("/elsewhere/x.jpg"));

        assert_eq!(next, dir.path().join("IMG_001_02.jpg"));
    }

    #[test]
    fn collision_never_reuses_gap_below_highest() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("shot.jpg")).unwrap();
        // A previous run left 03 without 01/02
        File::create(dir.path().join("shot_03.jpg")).unwrap();

        let next = next_available_path(dir.path(), "shot", "jpg", 2, Path::new("/elsewhere/x.jpg"));

        assert_eq!(next, dir.path().join("shot_04.jpg"));
    }

    #[test]
    fn free_name_needs_no_sequence() {
        let dir = TempDir::new().unwrap();

        let next = next_available_path(dir.path(), "fresh", "jpg", 2, Path::new("/elsewhere/x.jpg"));

        assert_eq!(next, dir.path().join("fresh.jpg"));
    }

    #[test]
    fn same_source_file_keeps_its_name() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("mine.jpg");
        File::create(&existing).unwrap();

        let next = next_available_path(dir.path(), "mine", "jpg", 2, &existing);

        assert_eq!(next, existing);
    }

    #[test]
    fn collapsed_name_falls_back_to_original_stem() {
        let resolver = PathResolver::new("{city}", "", RoutingRules::flat());
        let file = media_file(Path::new("/src/IMG_4032.jpg"), MediaKind::Image);
        let record = MetadataRecord::default();

        let resolved = resolver.resolve(&file, &record, None, Path::new("/dest"));

        assert_eq!(resolved, PathBuf::from("/dest/IMG_4032.jpg"));
    }

    #[test]
    fn extension_is_lowercased() {
        let resolver = PathResolver::new("{original_name}", "", RoutingRules::flat());
        let file = media_file(Path::new("/src/SHOT.JPG"), MediaKind::Image);

        let resolved = resolver.resolve(&file, &dated_record(), None, Path::new("/dest"));

        assert_eq!(resolved, PathBuf::from("/dest/SHOT.jpg"));
    }
}
