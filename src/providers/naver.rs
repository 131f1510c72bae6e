//! Naver API clients: Cloud Maps geocoding and Developers local search.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Geocoder, PlaceSearch};
use crate::error::{Error, Result};
use crate::models::SearchItem;

const GEOCODE_URL: &str = "https://maps.apigw.ntruss.com/map-geocode/v2/geocode";
const REVERSE_GEOCODE_URL: &str = "https://maps.apigw.ntruss.com/map-reversegeocode/v2/gc";
const LOCAL_SEARCH_URL: &str = "https://openapi.naver.com/v1/search/local.json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::ProviderTimeout(REQUEST_TIMEOUT)
    } else {
        Error::Provider(e.to_string())
    }
}

/// Naver Cloud Maps client (forward and reverse geocoding).
pub struct NaverMapsClient {
    client: Client,
    key_id: String,
    key: String,
}

impl NaverMapsClient {
    pub fn new(key_id: String, key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            key_id,
            key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    addresses: Vec<GeocodeAddress>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeAddress {
    x: String,
    y: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    status: Option<ReverseStatus>,
    #[serde(default)]
    results: Vec<ReverseResult>,
}

#[derive(Debug, Deserialize)]
struct ReverseStatus {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct ReverseResult {
    region: ReverseRegion,
}

#[derive(Debug, Deserialize)]
struct ReverseRegion {
    area1: ReverseArea,
    area2: ReverseArea,
    area3: ReverseArea,
}

#[derive(Debug, Deserialize)]
struct ReverseArea {
    name: String,
}

#[async_trait]
impl Geocoder for NaverMapsClient {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>> {
        let response = self
            .client
            .get(REVERSE_GEOCODE_URL)
            .header("x-ncp-apigw-api-key-id", &self.key_id)
            .header("x-ncp-apigw-api-key", &self.key)
            .header("Accept", "application/json")
            .query(&[
                ("coords", format!("{},{}", lon, lat)),
                ("output", "json".to_string()),
                ("orders", "roadaddr,addr".to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            warn!(
                "Reverse geocode request failed with status {} for ({}, {})",
                response.status(),
                lat,
                lon
            );
            return Ok(None);
        }

        let data: ReverseResponse = response.json().await.map_err(request_error)?;

        let usable = data.status.map(|s| s.code == 0).unwrap_or(false);
        if !usable || data.results.is_empty() {
            warn!("Reverse geocode returned no usable result for ({}, {})", lat, lon);
            return Ok(None);
        }

        let region = &data.results[0].region;
        Ok(Some(format!(
            "{} {} {}",
            region.area1.name, region.area2.name, region.area3.name
        )))
    }

    async fn forward_geocode(&self, address: &str) -> Result<Option<(f64, f64)>> {
        if address.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .get(GEOCODE_URL)
            .header("x-ncp-apigw-api-key-id", &self.key_id)
            .header("x-ncp-apigw-api-key", &self.key)
            .header("Accept", "application/json")
            .query(&[("query", address)])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            warn!(
                "Geocode request failed with status {} for '{}'",
                response.status(),
                address
            );
            return Ok(None);
        }

        let data: GeocodeResponse = response.json().await.map_err(request_error)?;

        if data.status != "OK" || data.addresses.is_empty() {
            warn!(
                "Geocode returned no match for '{}': status={}, error={}",
                address,
                data.status,
                data.error_message.as_deref().unwrap_or("-")
            );
            return Ok(None);
        }

        let addr = &data.addresses[0];
        match (addr.x.parse::<f64>(), addr.y.parse::<f64>()) {
            (Ok(lon), Ok(lat)) => Ok(Some((lon, lat))),
            _ => {
                warn!("Geocode returned non-numeric coordinates for '{}'", address);
                Ok(None)
            }
        }
    }
}

/// Naver Developers local search client.
pub struct NaverSearchClient {
    client: Client,
    client_id: String,
    client_secret: String,
}

impl NaverSearchClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            client_id,
            client_secret,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocalSearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[async_trait]
impl PlaceSearch for NaverSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
        debug!("Local search: '{}'", query);

        let response = self
            .client
            .get(LOCAL_SEARCH_URL)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&[("query", query), ("display", "5"), ("sort", "random")])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "local search failed with status {}: {}",
                status, body
            )));
        }

        let data: LocalSearchResponse = response.json().await.map_err(request_error)?;
        debug!("Local search '{}' returned {} items", query, data.items.len());
        Ok(data.items)
    }
}
