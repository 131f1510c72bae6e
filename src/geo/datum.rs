//! Legacy projected coordinates → WGS84.
//!
//! The address source data carries Korean 1985 Modified Central Belt
//! coordinates (Transverse Mercator on the Bessel 1841 ellipsoid, EPSG:5174).
//! Conversion runs in two steps: inverse Transverse Mercator to geodetic
//! Bessel coordinates, then a 3-parameter geocentric shift onto WGS84.

use super::UNRESOLVED_COORD;

// Bessel 1841
const A_BESSEL: f64 = 6_377_397.155;
const F_BESSEL: f64 = 1.0 / 299.152_812_8;

// WGS84
const A_WGS84: f64 = 6_378_137.0;
const F_WGS84: f64 = 1.0 / 298.257_223_563;

// Korean 1985 Modified Central Belt: natural origin 38°N / 127°00'10.405"E,
// scale 1.0, false easting 200 km, false northing 500 km.
const LAT0_DEG: f64 = 38.0;
const LON0_DEG: f64 = 127.0 + 10.405 / 3600.0;
const K0: f64 = 1.0;
const FALSE_EASTING: f64 = 200_000.0;
const FALSE_NORTHING: f64 = 500_000.0;

// Geocentric translation Korean datum → WGS84 (meters).
const DX: f64 = -115.80;
const DY: f64 = 474.99;
const DZ: f64 = 674.11;

/// Convert a projected (x, y) pair from the address data to WGS84 degrees.
///
/// Returns `(lat, lon)`, or `None` when either input is non-finite, equals
/// the -1.0 unresolved sentinel, or the conversion yields a non-finite
/// result. Never panics.
pub fn projected_to_geographic(x: f64, y: f64) -> Option<(f64, f64)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    if x == UNRESOLVED_COORD || y == UNRESOLVED_COORD {
        return None;
    }

    let (lat_bessel, lon_bessel) = inverse_transverse_mercator(x, y);
    let (lat, lon) = shift_to_wgs84(lat_bessel, lon_bessel);

    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some((lat.to_degrees(), lon.to_degrees()))
}

/// Inverse Transverse Mercator on Bessel 1841 (Snyder's series form).
/// Returns geodetic (lat, lon) in radians on the Bessel ellipsoid.
fn inverse_transverse_mercator(x: f64, y: f64) -> (f64, f64) {
    let e2 = F_BESSEL * (2.0 - F_BESSEL);
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let m0 = meridian_arc(LAT0_DEG.to_radians(), A_BESSEL, e2);
    let m = m0 + (y - FALSE_NORTHING) / K0;
    let mu = m / (A_BESSEL * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    // Footpoint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = A_BESSEL / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = A_BESSEL * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = (x - FALSE_EASTING) / (n1 * K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon = LON0_DEG.to_radians()
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    (lat, lon)
}

/// Meridian arc length from the equator to latitude `phi`.
fn meridian_arc(phi: f64, a: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// 3-parameter datum shift: geodetic Bessel → geocentric → geodetic WGS84.
/// Input and output angles in radians; height is taken as zero.
fn shift_to_wgs84(lat: f64, lon: f64) -> (f64, f64) {
    let e2_bessel = F_BESSEL * (2.0 - F_BESSEL);
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = A_BESSEL / (1.0 - e2_bessel * sin_lat * sin_lat).sqrt();

    let x = n * cos_lat * lon.cos() + DX;
    let y = n * cos_lat * lon.sin() + DY;
    let z = n * (1.0 - e2_bessel) * sin_lat + DZ;

    let e2 = F_WGS84 * (2.0 - F_WGS84);
    let p = (x * x + y * y).sqrt();
    let lon_out = y.atan2(x);

    // Fixed-point iteration converges to sub-millimeter in a few rounds.
    let mut lat_out = z.atan2(p * (1.0 - e2));
    for _ in 0..5 {
        let sin_l = lat_out.sin();
        let n_out = A_WGS84 / (1.0 - e2 * sin_l * sin_l).sqrt();
        lat_out = (z + e2 * n_out * sin_l).atan2(p);
    }

    (lat_out, lon_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_invalid() {
        assert!(projected_to_geographic(-1.0, -1.0).is_none());
        assert!(projected_to_geographic(-1.0, 500_000.0).is_none());
        assert!(projected_to_geographic(200_000.0, -1.0).is_none());
    }

    #[test]
    fn test_non_finite_is_invalid() {
        assert!(projected_to_geographic(f64::NAN, 500_000.0).is_none());
        assert!(projected_to_geographic(200_000.0, f64::NAN).is_none());
        assert!(projected_to_geographic(f64::INFINITY, 500_000.0).is_none());
        assert!(projected_to_geographic(200_000.0, f64::NEG_INFINITY).is_none());
    }

    #[test]
    fn test_natural_origin_maps_near_datum_origin() {
        // At the false origin the inverse projection lands on the natural
        // origin (38°N, 127°00'10.405"E on Bessel); the datum shift moves
        // that by a few hundred meters at most.
        let (lat, lon) = projected_to_geographic(200_000.0, 500_000.0).unwrap();
        assert!((lat - 38.0).abs() < 0.05, "lat = {}", lat);
        assert!((lon - 127.0028903).abs() < 0.05, "lon = {}", lon);
    }

    #[test]
    fn test_seoul_area_lands_in_seoul() {
        // A point ~20 km south of the natural origin stays in the capital
        // region after conversion.
        let (lat, lon) = projected_to_geographic(202_000.0, 445_000.0).unwrap();
        assert!((37.0..38.0).contains(&lat), "lat = {}", lat);
        assert!((126.5..127.5).contains(&lon), "lon = {}", lon);
    }
}
