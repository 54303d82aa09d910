//! Google Maps implementations of the geocoding and nearby-places traits.
//! Enabled by the `google` feature; the rest of the crate only sees the
//! traits in `location` and `external`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::external::{Place, PlacesLookup};
use crate::location::{Geocoder, Location};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const NEARBY_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
const HTTP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<NearbyResult>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    name: String,
    #[serde(default)]
    vicinity: Option<String>,
    rating: Option<f32>,
}

/// Geocoder backed by the Google Geocoding API. Queries are pinned to
/// Nigeria so ambiguous city names resolve locally.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<Location>> {
        let address = format!("{query}, Nigeria");
        let response: GeocodeResponse = self
            .client
            .get(GEOCODE_URL)
            .query(&[("address", address.as_str()), ("key", &self.api_key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "OK" {
            return Ok(None);
        }
        Ok(response.results.into_iter().next().map(|result| Location {
            lat: result.geometry.location.lat,
            lng: result.geometry.location.lng,
            city: None,
            state: None,
            country: Some("Nigeria".to_string()),
            formatted_address: result.formatted_address,
        }))
    }
}

/// Nearby health-facility search backed by the Google Places API.
pub struct GooglePlaces {
    client: reqwest::Client,
    api_key: String,
}

impl GooglePlaces {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PlacesLookup for GooglePlaces {
    async fn nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: u32,
        keyword: Option<&str>,
    ) -> anyhow::Result<Vec<Place>> {
        let location = format!("{lat},{lng}");
        let radius = radius_meters.to_string();
        let mut params = vec![
            ("location", location.as_str()),
            ("radius", radius.as_str()),
            ("type", "hospital"),
            ("key", self.api_key.as_str()),
        ];
        if let Some(keyword) = keyword {
            params.push(("keyword", keyword));
        }

        let response: NearbyResponse = self
            .client
            .get(NEARBY_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // ZERO_RESULTS is a valid empty answer, anything else unexpected is
        // surfaced to the caller.
        if response.status != "OK" && response.status != "ZERO_RESULTS" {
            anyhow::bail!("places lookup returned status {}", response.status);
        }

        Ok(response
            .results
            .into_iter()
            .map(|result| Place {
                name: result.name,
                address: result.vicinity.unwrap_or_else(|| "Address unavailable".to_string()),
                phone: None,
                services: Vec::new(),
                rating: result.rating,
                distance: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocode_response_parses_first_result() {
        let body = r#"{
            "status": "OK",
            "results": [{
                "geometry": { "location": { "lat": 6.6051, "lng": 3.3958 } },
                "formatted_address": "Ogudu, Lagos, Nigeria"
            }]
        }"#;
        let parsed: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "OK");
        assert_eq!(parsed.results[0].geometry.location.lat, 6.6051);
        assert_eq!(
            parsed.results[0].formatted_address.as_deref(),
            Some("Ogudu, Lagos, Nigeria")
        );
    }

    #[test]
    fn nearby_response_tolerates_missing_optional_fields() {
        let body = r#"{
            "status": "OK",
            "results": [{ "name": "General Hospital" }]
        }"#;
        let parsed: NearbyResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results[0].name, "General Hospital");
        assert!(parsed.results[0].vicinity.is_none());
        assert!(parsed.results[0].rating.is_none());
    }

    #[test]
    fn zero_results_is_not_an_error_status() {
        let body = r#"{ "status": "ZERO_RESULTS", "results": [] }"#;
        let parsed: NearbyResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.results.is_empty());
    }
}
