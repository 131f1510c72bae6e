//! OpenRouteService isochrone client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use super::IsochroneProvider;
use crate::error::{Error, Result};
use crate::models::GeoPoint;

const ISOCHRONE_URL: &str = "https://api.openrouteservice.org/v2/isochrones/foot-walking";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenRouteService client for foot-walking isochrones.
pub struct OrsClient {
    client: Client,
    api_key: String,
}

impl OrsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IsochroneResponse {
    #[serde(default)]
    features: Vec<IsochroneFeature>,
}

#[derive(Debug, Deserialize)]
struct IsochroneFeature {
    geometry: IsochroneGeometry,
}

#[derive(Debug, Deserialize)]
struct IsochroneGeometry {
    /// Outer ring first, holes after (GeoJSON polygon rings).
    #[serde(default)]
    coordinates: Vec<Vec<[f64; 2]>>,
}

#[async_trait]
impl IsochroneProvider for OrsClient {
    async fn isochrone(
        &self,
        lat: f64,
        lon: f64,
        range_meters: f64,
    ) -> Result<Option<Vec<[f64; 2]>>> {
        if !GeoPoint::new(lat, lon).is_valid() {
            warn!("Skipping isochrone request for invalid position ({}, {})", lat, lon);
            return Ok(None);
        }

        let payload = json!({
            "locations": [[lon, lat]],
            "range_type": "distance",
            "range": [range_meters],
        });

        let response = self
            .client
            .post(ISOCHRONE_URL)
            .header("Authorization", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ProviderTimeout(REQUEST_TIMEOUT)
                } else {
                    Error::Provider(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "isochrone request failed with status {}: {}",
                status, body
            )));
        }

        let data: IsochroneResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;

        let ring = data
            .features
            .into_iter()
            .next()
            .and_then(|f| f.geometry.coordinates.into_iter().next());

        if ring.is_none() {
            warn!("Isochrone response had no features for ({}, {})", lat, lon);
        }

        Ok(ring)
    }
}
