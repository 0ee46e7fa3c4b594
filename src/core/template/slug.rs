//! Camera name slugging.
//!
//! Turns "Canon EOS R5" into "canonr5" for use in naming patterns. Custom
//! exact-match mappings win over the built-in model patterns; anything
//! unmatched falls back to a lowercase alphanumeric squeeze of the model.

use regex::Regex;
use std::collections::HashMap;

/// Built-in model patterns, first match wins. More specific variants come
/// before the generic ones of the same family.
const BUILT_IN_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)iPhone\s+(\d+)\s+Pro\s+Max", "iphone$1promax"),
    (r"(?i)iPhone\s+(\d+)\s+Pro", "iphone$1pro"),
    (r"(?i)iPhone\s+(\d+)\s+Plus", "iphone$1plus"),
    (r"(?i)iPhone\s+(\d+)\s+mini", "iphone$1mini"),
    (r"(?i)iPhone\s+(\d+)", "iphone$1"),
    (r"(?i)iPhone\s+SE", "iphonese"),
    (r"(?i)Canon\s+EOS\s+R(\d+)", "canonr$1"),
    (r"(?i)Canon\s+EOS\s+(\d+)D", "canon$1d"),
    (r"(?i)Canon\s+EOS\s+(\w+)", "canon$1"),
    (r"(?i)Canon\s+PowerShot\s+(\w+)", "canpwr$1"),
    (r"(?i)Nikon\s+D(\d+)", "nikond$1"),
    (r"(?i)Nikon\s+Z\s?(\d+)", "nikonz$1"),
    (r"(?i)Sony\s+ILCE-(\w+)", "sonya$1"),
    (r"(?i)Sony\s+Alpha\s+(\w+)", "sonya$1"),
    (r"(?i)Sony\s+DSC-(\w+)", "sonydsc$1"),
    (r"(?i)Fujifilm\s+X-(\w+)", "fujix$1"),
    (r"(?i)Fujifilm\s+GFX\s?(\d+\w*)", "fujigfx$1"),
    (r"(?i)Panasonic\s+DC-(\w+)", "pandc$1"),
    (r"(?i)Panasonic\s+DMC-(\w+)", "pandmc$1"),
    (r"(?i)GoPro\s+HERO(\d+)", "gopro$1"),
    (r"(?i)DJI\s+(\w+)", "dji$1"),
    (r"(?i)Samsung\s+Galaxy\s+(\w+)", "galaxy$1"),
    (r"(?i)Google\s+Pixel\s+(\d+\w*)", "pixel$1"),
    (r"(?i)OnePlus\s+(\d+\w*)", "oneplus$1"),
];

/// Converts camera make/model pairs to clean, consistent slugs.
pub struct CameraSlugger {
    custom: HashMap<String, String>,
    patterns: Vec<(Regex, &'static str)>,
}

impl CameraSlugger {
    /// Slugger with only the built-in patterns.
    pub fn new() -> Self {
        Self::with_mappings(HashMap::new())
    }

    /// Slugger with user mappings checked first (exact, case-insensitive).
    pub fn with_mappings(custom: HashMap<String, String>) -> Self {
        let patterns = BUILT_IN_PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|re| (re, *replacement))
            })
            .collect();

        Self { custom, patterns }
    }

    /// Create a slug from camera make and model.
    pub fn slug(&self, make: &str, model: &str) -> String {
        let full = format!("{} {}", make.trim(), model.trim())
            .trim()
            .to_string();

        if full.is_empty() {
            return "unknown".to_string();
        }

        for (name, replacement) in &self.custom {
            if name.eq_ignore_ascii_case(&full) {
                return clean_slug(replacement);
            }
        }

        for (re, replacement) in &self.patterns {
            if let Some(caps) = re.captures(&full) {
                let mut slug = replacement.to_string();
                for (i, group) in caps.iter().skip(1).enumerate() {
                    if let Some(m) = group {
                        slug = slug.replace(&format!("${}", i + 1), &m.as_str().to_lowercase());
                    }
                }
                return clean_slug(&slug);
            }
        }

        let fallback = if model.trim().is_empty() { make } else { model };
        clean_slug(fallback)
    }
}

impl Default for CameraSlugger {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_slug(raw: &str) -> String {
    let slug: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}
