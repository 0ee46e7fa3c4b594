//! # Geocode Module
//!
//! Resolves GPS coordinates to place names through a rate-limited external
//! service, cached by rounded coordinate.
//!
//! ## Guarantees
//! - At most one external request per unique rounded coordinate per run
//! - Requests are serialized through a single gate with a minimum delay
//! - Failures return no location and are never cached, so a transient
//!   outage cannot permanently suppress enrichment for a coordinate

mod cache;
mod gate;
mod nominatim;

pub use cache::PlaceCache;
pub use gate::{Clock, RequestGate, SystemClock};
pub use nominatim::NominatimGeocoder;

use crate::error::GeocodeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Resolved place fields for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceInfo {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl PlaceInfo {
    /// Human-readable "City, State, Country" with absent parts omitted.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .iter()
            .filter_map(|p| p.as_deref())
            .collect();

        if parts.is_empty() {
            "Unknown Location".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// One synchronous reverse-geocoding request.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<PlaceInfo>, GeocodeError>;
}

/// Cache key at ~11 m precision; coordinates closer than that share a place.
pub fn rounded_key(latitude: f64, longitude: f64) -> String {
    format!("{:.4}:{:.4}", latitude, longitude)
}

/// Coordinate-to-place resolver with caching and rate limiting.
pub struct LocationResolver {
    cache: Mutex<PlaceCache>,
    geocoder: Box<dyn ReverseGeocoder>,
    gate: RequestGate,
}

impl LocationResolver {
    /// Create a resolver with the system clock.
    pub fn new(
        cache_path: PathBuf,
        geocoder: Box<dyn ReverseGeocoder>,
        min_delay: Duration,
    ) -> Self {
        Self::with_gate(cache_path, geocoder, RequestGate::new(min_delay))
    }

    /// Create a resolver around an explicit gate (for tests).
    pub fn with_gate(
        cache_path: PathBuf,
        geocoder: Box<dyn ReverseGeocoder>,
        gate: RequestGate,
    ) -> Self {
        Self {
            cache: Mutex::new(PlaceCache::open(cache_path)),
            geocoder,
            gate,
        }
    }

    /// Resolve a coordinate to a place, or `None` on miss/failure.
    ///
    /// Callers block until the rate gate admits the request; failures are
    /// returned as `None` and left uncached for retry on a later run.
    pub fn resolve(&self, latitude: f64, longitude: f64) -> Option<PlaceInfo> {
        let key = rounded_key(latitude, longitude);

        if let Ok(cache) = self.cache.lock() {
            if let Some(place) = cache.get(&key) {
                return Some(place.clone());
            }
        }

        // Re-check inside the gate so concurrent misses on the same
        // coordinate still issue a single request.
        let outcome = self.gate.run(|| {
            if let Ok(cache) = self.cache.lock() {
                if let Some(place) = cache.get(&key) {
                    return Ok(Some(place.clone()));
                }
            }
            self.geocoder.reverse(latitude, longitude)
        });

        match outcome {
            Ok(Some(place)) => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(key, place.clone());
                    if let Err(e) = cache.flush() {
                        warn!(error = %e, "failed to persist place cache");
                    }
                }
                Some(place)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(lat = latitude, lon = longitude, error = %e, "reverse geocoding failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct CountingGeocoder {
        calls: Arc<AtomicUsize>,
        response: Result<Option<PlaceInfo>, String>,
    }

    impl ReverseGeocoder for CountingGeocoder {
        fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<PlaceInfo>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(place) => Ok(place.clone()),
                Err(msg) => Err(GeocodeError::Request(msg.clone())),
            }
        }
    }

    fn paris() -> PlaceInfo {
        PlaceInfo {
            city: Some("Paris".to_string()),
            state: None,
            country: Some("France".to_string()),
        }
    }

    fn resolver_with(
        dir: &TempDir,
        response: Result<Option<PlaceInfo>, String>,
    ) -> (LocationResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let geocoder = CountingGeocoder {
            calls: Arc::clone(&calls),
            response,
        };
        let resolver = LocationResolver::with_gate(
            dir.path().join("places.json"),
            Box::new(geocoder),
            RequestGate::new(Duration::ZERO),
        );
        (resolver, calls)
    }

    #[test]
    fn one_request_per_unique_rounded_pair() {
        let dir = TempDir::new().unwrap();
        let (resolver, calls) = resolver_with(&dir, Ok(Some(paris())));

        // Same coordinate at sub-rounding precision differences
        resolver.resolve(48.85843, 2.29448);
        resolver.resolve(48.85841, 2.29451);
        resolver.resolve(48.85843, 2.29448);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let (resolver, calls) = resolver_with(&dir, Err("service down".to_string()));

        assert!(resolver.resolve(48.8584, 2.2945).is_none());
        assert!(resolver.resolve(48.8584, 2.2945).is_none());

        // Retried on each occurrence, never suppressed permanently
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_result_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let (resolver, calls) = resolver_with(&dir, Ok(None));

        assert!(resolver.resolve(0.0, 0.0).is_none());
        assert!(resolver.resolve(0.0, 0.0).is_none());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn success_persists_across_resolver_instances() {
        let dir = TempDir::new().unwrap();

        {
            let (resolver, _) = resolver_with(&dir, Ok(Some(paris())));
            assert!(resolver.resolve(48.8584, 2.2945).is_some());
        }

        // New resolver, failing geocoder: the cached place still answers
        let (resolver, calls) = resolver_with(&dir, Err("offline".to_string()));
        let place = resolver.resolve(48.8584, 2.2945).unwrap();

        assert_eq!(place.city.as_deref(), Some("Paris"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rounded_key_precision() {
        assert_eq!(rounded_key(48.85843, 2.29448), "48.8584:2.2945");
        assert_eq!(rounded_key(-33.8688, 151.2093), "-33.8688:151.2093");
    }

    #[test]
    fn display_name_joins_present_parts() {
        assert_eq!(paris().display_name(), "Paris, France");
        let empty = PlaceInfo { city: None, state: None, country: None };
        assert_eq!(empty.display_name(), "Unknown Location");
    }
}
