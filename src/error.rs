//! Error types shared by the services.

use thiserror::Error;

/// Service errors.
///
/// Provider-level hiccups are absorbed close to where they happen (a failed
/// category search degrades to zero results, a failed isochrone skips one
/// address); the variants here are what is left to surface to callers.
#[derive(Error, Debug)]
pub enum Error {
    /// Reverse geocoding produced no usable district label for the position.
    #[error("could not resolve an address for ({lat}, {lon})")]
    LocationResolution { lat: f64, lon: f64 },

    /// An external provider rejected or failed a request.
    #[error("provider error: {0}")]
    Provider(String),

    /// An external provider did not answer within its deadline.
    #[error("provider timed out after {0:?}")]
    ProviderTimeout(std::time::Duration),

    /// A coordinate outside the WGS84 domain, or the unresolved sentinel.
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// The persistent store is unreachable or failed an operation.
    #[error("store unavailable: {0}")]
    Store(#[source] anyhow::Error),

    /// Missing or malformed configuration (credentials, config file).
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;
