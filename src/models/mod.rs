//! Record shapes shared across the services.

use serde::{Deserialize, Serialize};

use crate::geo::UNRESOLVED_COORD;

/// Placeholder stored when an address column is empty in the source data.
pub const EMPTY_ADDRESS: &str = "비어있음";

/// Geographic point (lat/lon, WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// A point is usable for distance/containment math only if it is finite,
    /// inside the WGS84 domain, and not the (-1.0, -1.0) unresolved sentinel.
    pub fn is_valid(&self) -> bool {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return false;
        }
        if self.lat == UNRESOLVED_COORD && self.lon == UNRESOLVED_COORD {
            return false;
        }
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// One row of the address table.
///
/// `x`/`y` hold WGS84 longitude/latitude once resolved, or the -1.0 sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    pub landlot_address: String,
    pub road_name_address: String,
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
}

impl AddressRecord {
    /// Resolution order always prefers the landlot address.
    pub fn preferred_address(&self) -> &str {
        if self.landlot_address != EMPTY_ADDRESS {
            &self.landlot_address
        } else {
            &self.road_name_address
        }
    }

    /// True once both axes left the unresolved sentinel and form a usable
    /// WGS84 position.
    pub fn has_coordinates(&self) -> bool {
        self.x != UNRESOLVED_COORD
            && self.y != UNRESOLVED_COORD
            && GeoPoint::new(self.y, self.x).is_valid()
    }
}

/// One item of the search provider's local search response.
///
/// `map_x`/`map_y` are the provider's integer-scaled coordinate strings
/// (true value × 10,000,000); `title` may contain markup to be stripped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "roadAddress")]
    pub road_address: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "mapx")]
    pub map_x: String,
    #[serde(default, rename = "mapy")]
    pub map_y: String,
}

impl SearchItem {
    /// Display address, preferring the road address over the generic one.
    pub fn display_address(&self) -> &str {
        if !self.road_address.is_empty() {
            &self.road_address
        } else {
            &self.address
        }
    }
}

/// A tenant inside a building group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    pub name: String,
    pub category: String,
}

/// Nearby tenants sharing a resolved street address. Request-scoped.
#[derive(Debug, Clone, Serialize)]
pub struct BuildingGroup {
    pub building_address: String,
    pub location: GeoPoint,
    pub stores: Vec<StoreInfo>,
}

/// Result of a nearby-building search.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyBuildings {
    pub count: usize,
    pub radius_meter: f64,
    pub buildings: Vec<BuildingGroup>,
}

/// One stored restricted-zone polygon.
///
/// `vertices` is the JSON form of the closed boundary ring ([lon, lat]
/// pairs, first == last, at least 4 entries); `polygon_geom` is the same
/// ring as WKT. The centroid is the true polygon centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub landlot_address: String,
    /// Centroid longitude
    pub centroid_x: f64,
    /// Centroid latitude
    pub centroid_y: f64,
    pub polygon_geom: String,
    pub vertices: String,
}

impl ZoneRecord {
    /// Deserialize the stored boundary ring, if well-formed.
    pub fn ring(&self) -> Option<Vec<[f64; 2]>> {
        let ring: Vec<[f64; 2]> = serde_json::from_str(&self.vertices).ok()?;
        if ring.len() < 4 || ring.first() != ring.last() {
            return None;
        }
        Some(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_point_is_invalid() {
        assert!(!GeoPoint::new(-1.0, -1.0).is_valid());
        assert!(GeoPoint::new(37.5, 127.0).is_valid());
        // A lone -1.0 on one axis is a legitimate position
        assert!(GeoPoint::new(-1.0, 127.0).is_valid());
    }

    #[test]
    fn test_out_of_range_point_is_invalid() {
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 127.0).is_valid());
    }

    #[test]
    fn test_preferred_address_order() {
        let record = AddressRecord {
            landlot_address: "역삼동 1-1".to_string(),
            road_name_address: "강남대로 390".to_string(),
            x: -1.0,
            y: -1.0,
        };
        assert_eq!(record.preferred_address(), "역삼동 1-1");

        let record = AddressRecord {
            landlot_address: EMPTY_ADDRESS.to_string(),
            road_name_address: "강남대로 390".to_string(),
            x: -1.0,
            y: -1.0,
        };
        assert_eq!(record.preferred_address(), "강남대로 390");
    }

    #[test]
    fn test_display_address_prefers_road_address() {
        let item = SearchItem {
            title: "세븐일레븐".to_string(),
            road_address: "서울특별시 강남구 강남대로 390".to_string(),
            address: "서울특별시 강남구 역삼동 825".to_string(),
            ..Default::default()
        };
        assert_eq!(item.display_address(), "서울특별시 강남구 강남대로 390");

        let item = SearchItem {
            road_address: String::new(),
            ..item
        };
        assert_eq!(item.display_address(), "서울특별시 강남구 역삼동 825");
    }

    #[test]
    fn test_zone_record_ring_rejects_open_ring() {
        let record = ZoneRecord {
            landlot_address: "테스트".to_string(),
            centroid_x: 0.5,
            centroid_y: 0.5,
            polygon_geom: String::new(),
            vertices: "[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0]]".to_string(),
        };
        assert!(record.ring().is_none());

        let record = ZoneRecord {
            vertices: "[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0],[0.0,0.0]]".to_string(),
            ..record
        };
        assert_eq!(record.ring().unwrap().len(), 5);
    }
}
