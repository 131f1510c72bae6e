//! External provider interfaces and their HTTP clients.
//!
//! Every provider sits behind a trait so the services can be exercised with
//! fakes in tests; the real clients are constructed once at startup with
//! injected credentials and shared for the process lifetime.

mod naver;
mod ors;

pub use naver::{NaverMapsClient, NaverSearchClient};
pub use ors::OrsClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::SearchItem;

/// Address ↔ coordinate resolution.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coarse "province city district" label for a position, if resolvable.
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>>;

    /// WGS84 (lon, lat) for a textual address, if the provider resolves it.
    async fn forward_geocode(&self, address: &str) -> Result<Option<(f64, f64)>>;
}

/// Keyword place search.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Items matching the query. An empty list means "no matches"; transport
    /// failures are errors and left to the caller's degradation policy.
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>>;
}

/// Walking-distance isochrone computation.
#[async_trait]
pub trait IsochroneProvider: Send + Sync {
    /// Boundary ring ([lon, lat] vertices) of the isochrone polygon around
    /// the position, or `None` if the provider returned no usable feature.
    async fn isochrone(&self, lat: f64, lon: f64, range_meters: f64)
        -> Result<Option<Vec<[f64; 2]>>>;
}
