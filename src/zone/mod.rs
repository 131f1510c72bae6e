//! Restricted-zone engine: isochrone batch builder, polygon spatial index,
//! and point-in-polygon eligibility checks.

mod builder;
mod checker;
mod index;

pub use builder::{BatchReport, ZoneBatchBuilder};
pub use checker::{Eligibility, EligibilityChecker};
pub use index::ZoneIndex;

use geo_types::{Coord, LineString, Polygon};

/// Build a polygon from a closed [lon, lat] boundary ring.
pub(crate) fn ring_to_polygon(ring: &[[f64; 2]]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|c| Coord { x: c[0], y: c[1] }).collect();
    Polygon::new(LineString::new(coords), vec![])
}
