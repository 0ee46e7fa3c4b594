//! # Template Module
//!
//! Renders naming and folder patterns against metadata records.
//!
//! ## Pattern Syntax
//! Literal text interleaved with `{name}` placeholders. Numeric placeholders
//! accept a zero-padding spec: `{month:02d}` renders March as "03".
//!
//! Unknown placeholders render as empty string, never an error. The result
//! can therefore collapse; callers sanitize it for the filesystem before use.
//!
//! ## Variables
//! year, month, day, hour, minute, second, date, time, year_month,
//! month_name, original_name, camera, camera_make, camera_model, lens, iso,
//! f_number, focal_length, width, height, city, state, country, location

mod slug;

pub use slug::CameraSlugger;

use crate::core::geocode::PlaceInfo;
use crate::core::metadata::MetadataRecord;
use chrono::{Datelike, Timelike};
use std::collections::HashMap;

/// A value a placeholder can render to.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Text(String),
    Number(i64),
}

/// Named values available to a render call.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<String, TemplateValue>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.values
            .insert(name.to_string(), TemplateValue::Text(value.into()));
    }

    pub fn set_number(&mut self, name: &str, value: i64) {
        self.values
            .insert(name.to_string(), TemplateValue::Number(value));
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }

    /// Build the standard variable set for one file.
    pub fn from_record(
        record: &MetadataRecord,
        original_name: &str,
        place: Option<&PlaceInfo>,
        slugger: &CameraSlugger,
    ) -> Self {
        let mut vars = Self::new();
        vars.set_text("original_name", original_name);

        if let Some(taken) = record.best_capture_time() {
            vars.set_number("year", taken.year() as i64);
            vars.set_number("month", taken.month() as i64);
            vars.set_number("day", taken.day() as i64);
            vars.set_number("hour", taken.hour() as i64);
            vars.set_number("minute", taken.minute() as i64);
            vars.set_number("second", taken.second() as i64);
            vars.set_text("date", taken.format("%Y%m%d").to_string());
            vars.set_text("time", taken.format("%H%M%S").to_string());
            vars.set_text("year_month", taken.format("%Y-%m").to_string());
            vars.set_text("month_name", taken.format("%B").to_string());
        }

        let make = record.camera_make.as_deref().unwrap_or("");
        let model = record.camera_model.as_deref().unwrap_or("");
        vars.set_text("camera", slugger.slug(make, model));
        vars.set_text("camera_make", sanitize_component(make));
        vars.set_text("camera_model", sanitize_component(model));

        if let Some(lens) = &record.lens_model {
            vars.set_text("lens", sanitize_component(lens));
        }
        if let Some(iso) = record.iso {
            vars.set_number("iso", iso as i64);
        }
        if let Some(aperture) = record.aperture {
            vars.set_text("f_number", format!("f{}", aperture));
        }
        if let Some(focal) = record.focal_length {
            vars.set_text("focal_length", format!("{}mm", focal.round() as i64));
        }
        if let Some(width) = record.width {
            vars.set_number("width", width as i64);
        }
        if let Some(height) = record.height {
            vars.set_number("height", height as i64);
        }

        if let Some(place) = place {
            if let Some(city) = &place.city {
                vars.set_text("city", sanitize_component(city));
            }
            if let Some(state) = &place.state {
                vars.set_text("state", sanitize_component(state));
            }
            if let Some(country) = &place.country {
                vars.set_text("country", sanitize_component(country));
            }
            vars.set_text("location", sanitize_component(&place.display_name()));
        }

        vars
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field { name: String, pad: Option<usize> },
}

/// A parsed pattern, reusable across files.
#[derive(Debug, Clone)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern string. Malformed placeholders become literal text.
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }

            let mut inner = String::new();
            let mut closed = false;
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    closed = true;
                    break;
                }
                inner.push(c2);
            }

            if closed && !inner.is_empty() {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let (name, pad) = match inner.split_once(':') {
                    Some((name, spec)) => (name.to_string(), parse_pad(spec)),
                    None => (inner, None),
                };
                segments.push(Segment::Field { name, pad });
            } else {
                // Empty or unclosed braces: keep them as literal text
                literal.push('{');
                literal.push_str(&inner);
                if closed {
                    literal.push('}');
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Render against a variable set. Never fails; unknown placeholders
    /// render empty, repeated separators collapse.
    pub fn render(&self, vars: &TemplateVars) -> String {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, pad } => match vars.get(name) {
                    Some(TemplateValue::Number(n)) => match pad {
                        Some(width) => out.push_str(&format!("{:0width$}", n, width = *width)),
                        None => out.push_str(&n.to_string()),
                    },
                    Some(TemplateValue::Text(text)) => out.push_str(text),
                    None => {}
                },
            }
        }

        collapse_separators(&out)
    }
}

fn parse_pad(spec: &str) -> Option<usize> {
    let digits: String = spec.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|w| *w > 0)
}

/// Collapse runs of '_' and '-' left behind by empty placeholders and trim
/// them from the ends.
fn collapse_separators(rendered: &str) -> String {
    let mut out = String::with_capacity(rendered.len());
    let mut prev: Option<char> = None;

    for c in rendered.chars() {
        if (c == '_' || c == '-') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }

    out.trim_matches(['_', '-']).to_string()
}

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a single path component safe for the filesystem.
///
/// Replaces illegal characters and path separators, collapses whitespace,
/// and trims the ends.
pub fn sanitize_component(component: &str) -> String {
    let replaced: String = component
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();

    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(['_', '-', ' '])
        .to_string()
}

/// Sanitize a rendered folder path segment by segment, keeping the '/'
/// separators structural.
pub fn sanitize_folder(rendered: &str) -> String {
    rendered
        .split('/')
        .map(sanitize_component)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
