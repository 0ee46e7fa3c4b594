//! File filtering for the scanner.

use super::MediaKind;
use std::path::Path;

/// Decides which files the scanner keeps.
///
/// By default all recognized media kinds (image, raw, video) are included
/// and hidden files are skipped.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    include_hidden: bool,
    include_unknown: bool,
    extensions: Option<Vec<String>>,
}

impl MediaFilter {
    /// Create a filter with default settings
    pub fn new() -> Self {
        Self {
            include_hidden: false,
            include_unknown: false,
            extensions: None,
        }
    }

    /// Include hidden files (names starting with '.')
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Include files whose extension is not a recognized media kind
    pub fn with_unknown(mut self, include: bool) -> Self {
        self.include_unknown = include;
        self
    }

    /// Restrict to an explicit set of extensions (lowercase, no dot)
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = Some(extensions.into_iter().map(|e| e.to_lowercase()).collect());
        self
    }

    /// Check whether a file should be included in the scan
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_lowercase(),
            None => return self.include_unknown,
        };

        if let Some(ref allowed) = self.extensions {
            return allowed.contains(&ext);
        }

        match MediaKind::from_extension(&ext) {
            MediaKind::Unknown => self.include_unknown,
            _ => true,
        }
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}
