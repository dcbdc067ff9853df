//! Live-location resolution via the Nominatim geocoding service.
//!
//! The geofence only needs a coordinate pair; how it is obtained is an
//! external concern behind the [`Geocoder`] seam. Every lookup failure
//! downgrades to `None`, which the geofence treats as fail-closed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Nominatim search API base URL
const NOMINATIM_API_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default timeout for geocoding requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User-Agent header (required by the Nominatim usage policy)
const USER_AGENT: &str = "rollcall/0.2 (attendance daemon)";

/// Source of the capture device's live location.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve the live (latitude, longitude). `None` means the lookup
    /// failed or returned nothing.
    async fn live_location(&self) -> Option<(f64, f64)>;
}

/// Nominatim response entry; coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoder backed by the Nominatim search API.
pub struct NominatimGeocoder {
    http_client: Client,
    query: String,
}

impl NominatimGeocoder {
    pub fn new(query: String) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            query,
        }
    }

    async fn lookup(&self) -> Result<(f64, f64), String> {
        let response = self
            .http_client
            .get(NOMINATIM_API_URL)
            .query(&[
                ("q", self.query.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| format!("bad response body: {e}"))?;

        let place = places.first().ok_or_else(|| "no results".to_string())?;
        let lat = place
            .lat
            .parse::<f64>()
            .map_err(|e| format!("bad latitude: {e}"))?;
        let lon = place
            .lon
            .parse::<f64>()
            .map_err(|e| format!("bad longitude: {e}"))?;

        Ok((lat, lon))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn live_location(&self) -> Option<(f64, f64)> {
        match self.lookup().await {
            Ok(location) => {
                tracing::debug!(?location, query = %self.query, "geocode resolved");
                Some(location)
            }
            Err(e) => {
                tracing::warn!(query = %self.query, error = %e, "geocode lookup failed");
                None
            }
        }
    }
}
