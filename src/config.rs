//! Runtime configuration and provider credentials.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub zone: ZoneConfig,
}

/// Settings for the nearby-building search.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Store categories queried around the caller's position.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Search radius in meters, echoed back in every response.
    #[serde(default = "default_radius")]
    pub radius_meter: f64,

    /// Deadline for a single category search.
    #[serde(default = "default_per_call_timeout_ms")]
    pub per_call_timeout_ms: u64,

    /// Deadline for the whole aggregation call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Settings for the restricted-zone batch and eligibility checks.
#[derive(Debug, Deserialize, Clone)]
pub struct ZoneConfig {
    /// Walking-distance range of each isochrone, in meters.
    #[serde(default = "default_range_meters")]
    pub range_meters: f64,

    /// Delay between consecutive isochrone requests (provider rate limit).
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,

    /// Whether a point sitting exactly on a zone edge counts as inside.
    #[serde(default)]
    pub boundary_counts_as_inside: bool,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            zone: ZoneConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            radius_meter: default_radius(),
            per_call_timeout_ms: default_per_call_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            range_meters: default_range_meters(),
            pace_ms: default_pace_ms(),
            boundary_counts_as_inside: false,
        }
    }
}

impl SearchConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.per_call_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ZoneConfig {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}

fn default_categories() -> Vec<String> {
    ["편의점", "카페", "음식점", "약국", "은행", "병원"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_radius() -> f64 {
    50.0
}

fn default_per_call_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_range_meters() -> f64 {
    100.0
}

fn default_pace_ms() -> u64 {
    3_000
}

/// API credentials, read from the environment once at startup and injected
/// into the provider clients.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Naver Cloud Maps key pair (geocoding / reverse geocoding).
    pub naver_client_id: String,
    pub naver_client_secret: String,
    /// Naver Developers key pair (local search).
    pub naver_dev_id: String,
    pub naver_dev_secret: String,
    /// OpenRouteService key (isochrones).
    pub ors_api_key: String,
}

impl Credentials {
    pub fn from_env() -> crate::Result<Self> {
        Ok(Self {
            naver_client_id: require_env("NAVER_CLIENT_ID")?,
            naver_client_secret: require_env("NAVER_CLIENT_SECRET")?,
            naver_dev_id: require_env("NAVER_DEV_ID")?,
            naver_dev_secret: require_env("NAVER_DEV_SECRET")?,
            ors_api_key: require_env("ORS_API_KEY")?,
        })
    }

    /// Just the Cloud Maps key pair, for tools that only geocode.
    pub fn naver_maps_from_env() -> crate::Result<(String, String)> {
        Ok((
            require_env("NAVER_CLIENT_ID")?,
            require_env("NAVER_CLIENT_SECRET")?,
        ))
    }
}

fn require_env(name: &str) -> crate::Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| crate::Error::Config(format!("{} is not set", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.search.radius_meter, 50.0);
        assert_eq!(config.zone.range_meters, 100.0);
        assert!(!config.search.categories.is_empty());
        assert!(!config.zone.boundary_counts_as_inside);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [search]
            radius_meter = 75.0
            "#,
        )
        .unwrap();
        assert_eq!(config.search.radius_meter, 75.0);
        assert_eq!(config.zone.pace_ms, 3_000);
    }
}
