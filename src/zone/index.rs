//! Spatial index for restricted-zone polygon lookups.

use geo::{BoundingRect, Contains, Intersects, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::ZoneRecord;

/// A stored zone with its parsed boundary polygon.
pub struct ZoneEntry {
    pub record: ZoneRecord,
    pub polygon: Polygon<f64>,
}

/// Wrapper for R-tree indexing of zone polygons
#[derive(Clone)]
pub struct IndexedZone {
    zone: Arc<ZoneEntry>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedZone {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedZone {
    fn new(record: ZoneRecord) -> Option<Self> {
        let ring = record.ring()?;
        let polygon = super::ring_to_polygon(&ring);
        let rect = polygon.bounding_rect()?;
        Some(Self {
            zone: Arc::new(ZoneEntry { record, polygon }),
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }
}

/// R-tree over restricted-zone polygons: envelope prefilter, then exact
/// containment on the boundary ring.
pub struct ZoneIndex {
    tree: RTree<IndexedZone>,
}

impl ZoneIndex {
    /// Build the index from stored records. Records whose ring fails to
    /// parse are skipped with a warning.
    pub fn build(records: Vec<ZoneRecord>) -> Self {
        let total = records.len();
        let indexed: Vec<IndexedZone> = records
            .into_iter()
            .filter_map(|record| {
                let address = record.landlot_address.clone();
                let indexed = IndexedZone::new(record);
                if indexed.is_none() {
                    warn!("Skipping zone with malformed ring: {}", address);
                }
                indexed
            })
            .collect();

        if indexed.len() < total {
            info!("Indexed {} of {} zone polygons", indexed.len(), total);
        }

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// Find all zones containing the point. With `include_boundary`, a point
    /// sitting exactly on a ring edge or vertex also matches.
    pub fn lookup(&self, lon: f64, lat: f64, include_boundary: bool) -> Vec<Arc<ZoneEntry>> {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|iz| {
                if include_boundary {
                    iz.zone.polygon.intersects(&point)
                } else {
                    iz.zone.polygon.contains(&point)
                }
            })
            .map(|iz| Arc::clone(&iz.zone))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_zone(name: &str) -> ZoneRecord {
        ZoneRecord {
            landlot_address: name.to_string(),
            centroid_x: 127.05,
            centroid_y: 37.55,
            polygon_geom: String::new(),
            vertices: "[[127.0,37.5],[127.1,37.5],[127.1,37.6],[127.0,37.6],[127.0,37.5]]"
                .to_string(),
        }
    }

    #[test]
    fn test_lookup_inside_and_outside() {
        let index = ZoneIndex::build(vec![square_zone("사각형")]);
        assert_eq!(index.len(), 1);

        assert_eq!(index.lookup(127.05, 37.55, false).len(), 1);
        assert!(index.lookup(126.0, 36.0, false).is_empty());
    }

    #[test]
    fn test_boundary_policy() {
        let index = ZoneIndex::build(vec![square_zone("사각형")]);

        // On the western edge
        assert!(index.lookup(127.0, 37.55, false).is_empty());
        assert_eq!(index.lookup(127.0, 37.55, true).len(), 1);
    }

    #[test]
    fn test_malformed_record_skipped() {
        let mut bad = square_zone("불량");
        bad.vertices = "[[127.0,37.5],[127.1,37.5]]".to_string();
        let index = ZoneIndex::build(vec![bad, square_zone("사각형")]);
        assert_eq!(index.len(), 1);
    }
}
