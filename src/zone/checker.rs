//! Eligibility lookups against the restricted-zone index.

use serde::Serialize;
use tracing::debug;

use super::ZoneIndex;
use crate::error::{Error, Result};
use crate::models::GeoPoint;

/// Eligibility verdict for a candidate position.
#[derive(Debug, Clone, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    /// Addresses of the zones the point falls inside, for diagnostics.
    pub matched: Vec<String>,
}

/// Point-in-polygon eligibility checks over the stored restricted zones.
pub struct EligibilityChecker {
    index: ZoneIndex,
    boundary_counts_as_inside: bool,
}

impl EligibilityChecker {
    pub fn new(index: ZoneIndex, boundary_counts_as_inside: bool) -> Self {
        Self {
            index,
            boundary_counts_as_inside,
        }
    }

    /// A point is eligible unless it lies inside at least one restricted
    /// zone. Whether the zone boundary itself counts as inside is a
    /// configuration choice.
    pub fn is_eligible(&self, point: GeoPoint) -> Result<Eligibility> {
        if !point.is_valid() {
            return Err(Error::InvalidCoordinate {
                lat: point.lat,
                lon: point.lon,
            });
        }

        let matched: Vec<String> = self
            .index
            .lookup(point.lon, point.lat, self.boundary_counts_as_inside)
            .iter()
            .map(|zone| zone.record.landlot_address.clone())
            .collect();

        debug!(
            "Eligibility check at ({}, {}): {} containing zones",
            point.lat,
            point.lon,
            matched.len()
        );

        Ok(Eligibility {
            eligible: matched.is_empty(),
            matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneRecord;

    fn square_zone() -> ZoneRecord {
        ZoneRecord {
            landlot_address: "역삼동 1-1".to_string(),
            centroid_x: 127.05,
            centroid_y: 37.55,
            polygon_geom: String::new(),
            vertices: "[[127.0,37.5],[127.1,37.5],[127.1,37.6],[127.0,37.6],[127.0,37.5]]"
                .to_string(),
        }
    }

    #[test]
    fn test_centroid_is_ineligible() {
        let checker = EligibilityChecker::new(ZoneIndex::build(vec![square_zone()]), false);
        let verdict = checker.is_eligible(GeoPoint::new(37.55, 127.05)).unwrap();
        assert!(!verdict.eligible);
        assert_eq!(verdict.matched, vec!["역삼동 1-1".to_string()]);
    }

    #[test]
    fn test_far_point_is_eligible() {
        let checker = EligibilityChecker::new(ZoneIndex::build(vec![square_zone()]), false);
        let verdict = checker.is_eligible(GeoPoint::new(35.0, 129.0)).unwrap();
        assert!(verdict.eligible);
        assert!(verdict.matched.is_empty());
    }

    #[test]
    fn test_boundary_policy_is_configurable() {
        let on_edge = GeoPoint::new(37.55, 127.0);

        let strict = EligibilityChecker::new(ZoneIndex::build(vec![square_zone()]), false);
        assert!(strict.is_eligible(on_edge).unwrap().eligible);

        let inclusive = EligibilityChecker::new(ZoneIndex::build(vec![square_zone()]), true);
        assert!(!inclusive.is_eligible(on_edge).unwrap().eligible);
    }

    #[test]
    fn test_empty_index_is_always_eligible() {
        let checker = EligibilityChecker::new(ZoneIndex::build(Vec::new()), false);
        let verdict = checker.is_eligible(GeoPoint::new(37.55, 127.05)).unwrap();
        assert!(verdict.eligible);
    }

    #[test]
    fn test_sentinel_point_rejected() {
        let checker = EligibilityChecker::new(ZoneIndex::build(vec![square_zone()]), false);
        let err = checker.is_eligible(GeoPoint::new(-1.0, -1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidCoordinate { .. }));
    }
}
