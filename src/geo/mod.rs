//! Coordinate handling: great-circle distance and the two non-WGS84
//! encodings the system has to reconcile (the legacy projected address data
//! and the search provider's integer-scaled coordinates).

mod datum;

pub use datum::projected_to_geographic;

/// Mean Earth radius in meters, as used by the distance filter.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Reserved coordinate value marking "not yet resolved" in the address table.
/// The pair (-1.0, -1.0) is never a valid position for distance or
/// containment math.
pub const UNRESOLVED_COORD: f64 = -1.0;

/// Great-circle distance between two WGS84 points, in meters (haversine).
///
/// The squared half-chord term is clamped to [0, 1] before the `atan2` step:
/// floating-point rounding on identical or antipodal points can push it just
/// outside that range and would otherwise yield NaN. Identical points return
/// exactly 0.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Convert the search provider's integer-scaled coordinate strings to WGS84.
///
/// The provider pre-multiplies longitude/latitude by 10,000,000 and returns
/// them as strings. Returns `(lon, lat)`, or `None` on missing or
/// non-numeric input.
pub fn provider_scaled_to_geographic(
    map_x: Option<&str>,
    map_y: Option<&str>,
) -> Option<(f64, f64)> {
    let map_x = map_x.filter(|s| !s.is_empty())?;
    let map_y = map_y.filter(|s| !s.is_empty())?;

    let lon = map_x.parse::<f64>().ok()? / 10_000_000.0;
    let lat = map_y.parse::<f64>().ok()? / 10_000_000.0;
    Some((lon, lat))
}
