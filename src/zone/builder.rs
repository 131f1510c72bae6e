//! Isochrone batch builder: one walking-distance polygon per stored address.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use geo::Centroid;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ZoneConfig;
use crate::error::Result;
use crate::models::{AddressRecord, ZoneRecord};
use crate::providers::IsochroneProvider;
use crate::store::{AddressStore, ZoneStore};

/// Outcome summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Addresses with resolved coordinates that were considered.
    pub total_addresses: usize,
    /// Zone records computed and written.
    pub generated: usize,
    /// Addresses skipped on provider failure or degenerate geometry.
    pub failed: usize,
    /// True when the zone table already had rows and the run was a no-op.
    pub already_populated: bool,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    fn skipped() -> Self {
        Self {
            total_addresses: 0,
            generated: 0,
            failed: 0,
            already_populated: true,
            completed_at: Utc::now(),
        }
    }
}

pub struct ZoneBatchBuilder {
    addresses: Arc<dyn AddressStore>,
    zones: Arc<dyn ZoneStore>,
    isochrone: Arc<dyn IsochroneProvider>,
    range_meters: f64,
    pace: Duration,
}

impl ZoneBatchBuilder {
    pub fn new(
        addresses: Arc<dyn AddressStore>,
        zones: Arc<dyn ZoneStore>,
        isochrone: Arc<dyn IsochroneProvider>,
        config: &ZoneConfig,
    ) -> Self {
        Self {
            addresses,
            zones,
            isochrone,
            range_meters: config.range_meters,
            pace: config.pace(),
        }
    }

    /// Compute and store a restricted-zone polygon for every address with
    /// resolved coordinates.
    ///
    /// The run is idempotent: a non-empty zone table makes it a no-op that
    /// reports `already_populated`. Requests are strictly sequential with a
    /// fixed inter-call delay (provider rate limit); a failure on one address
    /// skips that address only. All produced records are written together
    /// after the loop, so a run that dies mid-way leaves no partial rows.
    pub async fn build_all_zones(&self) -> Result<BatchReport> {
        if self.zones.zone_count().await? > 0 {
            info!("Restricted-zone table already populated; skipping batch");
            return Ok(BatchReport::skipped());
        }

        let addresses = self.addresses.valid_addresses().await?;
        info!("Computing isochrones for {} addresses", addresses.len());

        let mut generated = 0usize;
        let mut failed = 0usize;
        let mut records = Vec::new();

        for address in &addresses {
            tokio::time::sleep(self.pace).await;

            // y is latitude, x is longitude in the address table
            let ring = match self
                .isochrone
                .isochrone(address.y, address.x, self.range_meters)
                .await
            {
                Ok(Some(ring)) => ring,
                Ok(None) => {
                    warn!("No isochrone for {}", address.landlot_address);
                    failed += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Isochrone request failed for {}: {}",
                        address.landlot_address, e
                    );
                    failed += 1;
                    continue;
                }
            };

            match zone_record(address, ring) {
                Some(record) => {
                    records.push(record);
                    generated += 1;
                }
                None => {
                    warn!("Degenerate isochrone ring for {}", address.landlot_address);
                    failed += 1;
                }
            }
        }

        if records.is_empty() {
            info!("No zones generated; nothing written");
        } else {
            self.zones.insert_zones(&records).await?;
            info!(
                "Zone batch complete: {} generated, {} failed of {} addresses",
                generated,
                failed,
                addresses.len()
            );
        }

        Ok(BatchReport {
            total_addresses: addresses.len(),
            generated,
            failed,
            already_populated: false,
            completed_at: Utc::now(),
        })
    }
}

/// Convert an isochrone boundary ring into a stored zone record: close the
/// ring, require at least 4 vertices, compute the true centroid, serialize.
fn zone_record(address: &AddressRecord, mut ring: Vec<[f64; 2]>) -> Option<ZoneRecord> {
    if ring.len() < 3 {
        return None;
    }
    if ring.first() != ring.last() {
        ring.push(ring[0]);
    }
    if ring.len() < 4 {
        return None;
    }

    let polygon = super::ring_to_polygon(&ring);
    let centroid = polygon.centroid()?;
    let vertices = serde_json::to_string(&ring).ok()?;

    Some(ZoneRecord {
        landlot_address: address.landlot_address.clone(),
        centroid_x: centroid.x(),
        centroid_y: centroid.y(),
        polygon_geom: wkt_polygon(&ring),
        vertices,
    })
}

/// WKT form of a closed ring, e.g. `POLYGON ((127 37.5, ...))`.
fn wkt_polygon(ring: &[[f64; 2]]) -> String {
    let coords = ring
        .iter()
        .map(|c| format!("{} {}", c[0], c[1]))
        .collect::<Vec<_>>()
        .join(", ");
    format!("POLYGON (({}))", coords)
}
