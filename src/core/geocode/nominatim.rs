//! Nominatim (OpenStreetMap) reverse geocoding backend.

use super::{PlaceInfo, ReverseGeocoder};
use crate::error::GeocodeError;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reverse geocoder backed by the public Nominatim service.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    /// Create a geocoder against the public endpoint.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_endpoint(DEFAULT_ENDPOINT.to_string())
    }

    /// Create a geocoder against a custom endpoint (self-hosted instances).
    pub fn with_endpoint(endpoint: String) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("shutter-sort/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    fn parse_response(body: &Value) -> Option<PlaceInfo> {
        let address = body.get("address")?;

        let city = first_of(address, &["city", "town", "village"]);
        let state = first_of(address, &["state", "region"]);
        let country = first_of(address, &["country"]);

        if city.is_none() && state.is_none() && country.is_none() {
            return None;
        }

        Some(PlaceInfo { city, state, country })
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<PlaceInfo>, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.endpoint))
            .query(&[
                ("format", "jsonv2"),
                ("lat", latitude.to_string().as_str()),
                ("lon", longitude.to_string().as_str()),
            ])
            .send()
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Request(format!(
                "HTTP {} from geocoding service",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(Self::parse_response(&body))
    }
}

fn first_of(address: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        address
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_city_state_country() {
        let body: Value = serde_json::from_str(
            r#"{"address": {"city": "Paris", "state": "Ile-de-France", "country": "France"}}"#,
        )
        .unwrap();

        let place = NominatimGeocoder::parse_response(&body).unwrap();
        assert_eq!(place.city.as_deref(), Some("Paris"));
        assert_eq!(place.state.as_deref(), Some("Ile-de-France"));
        assert_eq!(place.country.as_deref(), Some("France"));
    }

    #[test]
    fn town_and_village_fall_back_to_city() {
        let body: Value =
            serde_json::from_str(r#"{"address": {"village": "Gordes", "country": "France"}}"#)
                .unwrap();

        let place = NominatimGeocoder::parse_response(&body).unwrap();
        assert_eq!(place.city.as_deref(), Some("Gordes"));
    }

    #[test]
    fn response_without_address_is_none() {
        let body: Value = serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert!(NominatimGeocoder::parse_response(&body).is_none());
    }

    #[test]
    fn empty_address_is_none() {
        let body: Value = serde_json::from_str(r#"{"address": {}}"#).unwrap();
        assert!(NominatimGeocoder::parse_response(&body).is_none());
    }
}
