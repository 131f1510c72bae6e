//! Perimeter - proximity search and restricted-zone eligibility for retail siting.
//!
//! This library provides shared types and modules for the server and ingest binaries.

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod nearby;
pub mod providers;
pub mod store;
pub mod zone;

pub use error::{Error, Result};
pub use models::{AddressRecord, BuildingGroup, GeoPoint, NearbyBuildings, SearchItem, ZoneRecord};
