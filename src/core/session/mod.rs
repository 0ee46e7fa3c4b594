//! # Session Module
//!
//! Clusters a time-ordered batch of captures into shooting sessions.
//!
//! ## Split Rules
//! A new session starts when either threshold is exceeded:
//! - the time gap to the previous capture passes `time_gap_minutes`, or
//! - both the session's reference point (its first GPS-bearing member) and
//!   the candidate carry GPS and the haversine distance passes
//!   `distance_gap_km`
//!
//! Records without GPS neither trigger nor block a spatial split.

use crate::core::geocode::PlaceInfo;
use crate::core::metadata::MetadataRecord;
use crate::core::template::sanitize_component;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Thresholds for session clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Time gap that closes a session
    pub time_gap_minutes: i64,
    /// Distance gap that closes a session
    pub distance_gap_km: f64,
    /// Sessions with fewer members are dropped
    pub min_members: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_gap_minutes: 30,
            distance_gap_km: 1.0,
            min_members: 1,
        }
    }
}

/// One record entering session detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInput {
    pub path: PathBuf,
    pub record: MetadataRecord,
    pub place: Option<PlaceInfo>,
}

/// A contiguous run of captures judged to be one shooting episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Generated name: date, disambiguating time, location slug, count
    pub name: String,
    /// Capture time of the first member
    pub start: NaiveDateTime,
    /// Capture time of the last member
    pub end: NaiveDateTime,
    /// Most frequent resolved location among members, if any
    pub location: Option<String>,
    /// Members in capture order
    pub members: Vec<SessionInput>,
}

impl Session {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Clusters sorted records into sessions.
pub struct SessionDetector {
    config: SessionConfig,
}

impl SessionDetector {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Detect sessions in a batch.
    ///
    /// Records without a resolvable capture time are excluded. The input
    /// need not be pre-sorted.
    pub fn detect(&self, inputs: &[SessionInput]) -> Vec<Session> {
        let mut timed: Vec<(&SessionInput, NaiveDateTime)> = inputs
            .iter()
            .filter_map(|input| input.record.best_capture_time().map(|t| (input, t)))
            .collect();
        timed.sort_by_key(|(_, time)| *time);

        if timed.is_empty() {
            return Vec::new();
        }

        let time_gap = Duration::minutes(self.config.time_gap_minutes);

        let mut clusters: Vec<Vec<(&SessionInput, NaiveDateTime)>> = Vec::new();
        let mut current = vec![timed[0]];
        let mut reference_gps = timed[0].0.record.gps;

        for &(input, time) in &timed[1..] {
            let (_, last_time) = current[current.len() - 1];
            let mut split = time - last_time > time_gap;

            if !split {
                if let (Some(reference), Some(candidate)) = (reference_gps, input.record.gps) {
                    let distance = haversine_km(
                        reference.latitude,
                        reference.longitude,
                        candidate.latitude,
                        candidate.longitude,
                    );
                    split = distance > self.config.distance_gap_km;
                }
            }

            if split {
                clusters.push(std::mem::take(&mut current));
                reference_gps = input.record.gps;
            } else if reference_gps.is_none() {
                reference_gps = input.record.gps;
            }
            current.push((input, time));
        }
        clusters.push(current);

        let mut sessions: Vec<Session> = clusters
            .into_iter()
            .filter(|cluster| cluster.len() >= self.config.min_members)
            .map(|cluster| self.build_session(&cluster))
            .collect();

        assign_names(&mut sessions);
        sessions
    }

    fn build_session(&self, cluster: &[(&SessionInput, NaiveDateTime)]) -> Session {
        let start = cluster[0].1;
        let end = cluster[cluster.len() - 1].1;

        Session {
            name: String::new(),
            start,
            end,
            location: dominant_location(cluster),
            members: cluster.iter().map(|(input, _)| (*input).clone()).collect(),
        }
    }
}

/// Most frequent resolved display name; first-seen wins ties.
fn dominant_location(cluster: &[(&SessionInput, NaiveDateTime)]) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for (input, _) in cluster {
        if let Some(place) = &input.place {
            let name = place.display_name();
            let count = counts.entry(name.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push(name);
            }
            *count += 1;
        }
    }

    let max = counts.values().copied().max()?;
    first_seen.into_iter().find(|name| counts[name] == max)
}

/// Session names are assigned after clustering so date collisions can be
/// disambiguated with a time suffix.
fn assign_names(sessions: &mut [Session]) {
    let mut per_date: HashMap<String, usize> = HashMap::new();
    for session in sessions.iter() {
        *per_date.entry(session.start.format("%Y%m%d").to_string()).or_insert(0) += 1;
    }

    for session in sessions.iter_mut() {
        let date = session.start.format("%Y%m%d").to_string();
        let mut name = date.clone();

        if per_date[&date] > 1 {
            name.push_str(&format!("_{}", session.start.format("%H%M")));
        }

        if let Some(location) = &session.location {
            let slug = location_slug(location);
            if !slug.is_empty() {
                name.push('_');
                name.push_str(&slug);
            }
        }

        name.push_str(&format!("_{}p", session.members.len()));
        session.name = name;
    }
}

fn location_slug(location: &str) -> String {
    let slug = sanitize_component(location)
        .to_lowercase()
        .replace([' ', ','], "_")
        .replace("__", "_");
    // Char-wise cap keeps multi-byte names intact
    let capped: String = slug.chars().take(30).collect();
    capped.trim_matches('_').to_string()
}

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
