//! ScyllaDB-backed store for address records and restricted-zone polygons.
//!
//! Services depend on the `AddressStore`/`ZoneStore` traits, never on the
//! session type, so tests can substitute in-memory fakes.

use anyhow::Context;
use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{AddressRecord, ZoneRecord};

/// Read/write access to stored address records.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Addresses with resolved WGS84 coordinates (sentinel rows excluded).
    async fn valid_addresses(&self) -> Result<Vec<AddressRecord>>;

    /// Addresses still carrying the unresolved sentinel.
    async fn missing_coordinates(&self) -> Result<Vec<AddressRecord>>;

    /// Overwrite the coordinates of one address row.
    async fn update_coordinates(&self, landlot_address: &str, x: f64, y: f64) -> Result<()>;
}

/// Read/write access to the restricted-zone polygon table.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Number of stored zone polygons (the batch builder's emptiness check).
    async fn zone_count(&self) -> Result<u64>;

    /// Write a computed batch of zone records.
    async fn insert_zones(&self, zones: &[ZoneRecord]) -> Result<()>;

    async fn all_zones(&self) -> Result<Vec<ZoneRecord>>;
}

#[derive(Clone)]
pub struct StoreClient {
    session: Arc<Session>,
}

impl StoreClient {
    pub async fn new(uri: &str) -> Result<Self> {
        info!("Connecting to ScyllaDB at {}...", uri);
        let session: Session = SessionBuilder::new()
            .known_node(uri)
            .build()
            .await
            .context("Failed to connect to ScyllaDB")
            .map_err(Error::Store)?;

        let client = Self {
            session: Arc::new(session),
        };

        client.init_schema().await?;
        Ok(client)
    }

    async fn init_schema(&self) -> Result<()> {
        self.session
            .query_unpaged(
                "CREATE KEYSPACE IF NOT EXISTS perimeter
                 WITH REPLICATION = {
                    'class' : 'SimpleStrategy',
                    'replication_factor' : 1
                 }",
                &[],
            )
            .await
            .context("Failed to create keyspace")
            .map_err(Error::Store)?;

        self.session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS perimeter.address (
                    landlot_address text PRIMARY KEY,
                    road_name_address text,
                    x double,
                    y double
                )",
                &[],
            )
            .await
            .context("Failed to create address table")
            .map_err(Error::Store)?;

        self.session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS perimeter.restricted_zone (
                    landlot_address text PRIMARY KEY,
                    centroid_x double,
                    centroid_y double,
                    polygon_geom text,
                    vertices text
                )",
                &[],
            )
            .await
            .context("Failed to create restricted_zone table")
            .map_err(Error::Store)?;

        Ok(())
    }

    /// Drop and recreate the address table (ingest bootstrap).
    pub async fn recreate_address_table(&self) -> Result<()> {
        self.session
            .query_unpaged("DROP TABLE IF EXISTS perimeter.address", &[])
            .await
            .context("Failed to drop address table")
            .map_err(Error::Store)?;
        self.init_schema().await
    }

    pub async fn upsert_address(&self, record: &AddressRecord) -> Result<()> {
        self.session
            .query_unpaged(
                "INSERT INTO perimeter.address (landlot_address, road_name_address, x, y)
                 VALUES (?, ?, ?, ?)",
                (
                    &record.landlot_address,
                    &record.road_name_address,
                    record.x,
                    record.y,
                ),
            )
            .await
            .context("Failed to upsert address")
            .map_err(Error::Store)?;
        Ok(())
    }

    /// Full scan of the address table. The table is small (one district's
    /// worth of parcels); coordinate filtering happens in process.
    async fn fetch_addresses(&self) -> Result<Vec<AddressRecord>> {
        let result = self
            .session
            .query_unpaged(
                "SELECT landlot_address, road_name_address, x, y FROM perimeter.address",
                &[],
            )
            .await
            .context("Failed to read address table")
            .map_err(Error::Store)?;

        let rows_result = result
            .into_rows_result()
            .context("Address query returned no rows result")
            .map_err(Error::Store)?;

        let mut records = Vec::new();
        for row in rows_result
            .rows::<(String, String, f64, f64)>()
            .context("Failed to decode address rows")
            .map_err(Error::Store)?
        {
            let (landlot_address, road_name_address, x, y) = row
                .context("Failed to decode address row")
                .map_err(Error::Store)?;
            records.push(AddressRecord {
                landlot_address,
                road_name_address,
                x,
                y,
            });
        }

        Ok(records)
    }
}

#[async_trait]
impl AddressStore for StoreClient {
    async fn valid_addresses(&self) -> Result<Vec<AddressRecord>> {
        let records = self.fetch_addresses().await?;
        Ok(records.into_iter().filter(|r| r.has_coordinates()).collect())
    }

    async fn missing_coordinates(&self) -> Result<Vec<AddressRecord>> {
        let records = self.fetch_addresses().await?;
        Ok(records.into_iter().filter(|r| !r.has_coordinates()).collect())
    }

    async fn update_coordinates(&self, landlot_address: &str, x: f64, y: f64) -> Result<()> {
        self.session
            .query_unpaged(
                "UPDATE perimeter.address SET x = ?, y = ? WHERE landlot_address = ?",
                (x, y, landlot_address),
            )
            .await
            .context("Failed to update address coordinates")
            .map_err(Error::Store)?;
        Ok(())
    }
}

#[async_trait]
impl ZoneStore for StoreClient {
    async fn zone_count(&self) -> Result<u64> {
        let result = self
            .session
            .query_unpaged("SELECT COUNT(*) FROM perimeter.restricted_zone", &[])
            .await
            .context("Failed to count restricted zones")
            .map_err(Error::Store)?;

        let rows_result = result
            .into_rows_result()
            .context("Count query returned no rows result")
            .map_err(Error::Store)?;

        let count = rows_result
            .maybe_first_row::<(i64,)>()
            .context("Failed to decode zone count")
            .map_err(Error::Store)?
            .map(|(n,)| n.max(0) as u64)
            .unwrap_or(0);

        Ok(count)
    }

    async fn insert_zones(&self, zones: &[ZoneRecord]) -> Result<()> {
        for zone in zones {
            self.session
                .query_unpaged(
                    "INSERT INTO perimeter.restricted_zone
                     (landlot_address, centroid_x, centroid_y, polygon_geom, vertices)
                     VALUES (?, ?, ?, ?, ?)",
                    (
                        &zone.landlot_address,
                        zone.centroid_x,
                        zone.centroid_y,
                        &zone.polygon_geom,
                        &zone.vertices,
                    ),
                )
                .await
                .context("Failed to insert restricted zone")
                .map_err(Error::Store)?;
        }
        Ok(())
    }

    async fn all_zones(&self) -> Result<Vec<ZoneRecord>> {
        let result = self
            .session
            .query_unpaged(
                "SELECT landlot_address, centroid_x, centroid_y, polygon_geom, vertices
                 FROM perimeter.restricted_zone",
                &[],
            )
            .await
            .context("Failed to read restricted zones")
            .map_err(Error::Store)?;

        let rows_result = result
            .into_rows_result()
            .context("Zone query returned no rows result")
            .map_err(Error::Store)?;

        let mut zones = Vec::new();
        for row in rows_result
            .rows::<(String, f64, f64, String, String)>()
            .context("Failed to decode zone rows")
            .map_err(Error::Store)?
        {
            let (landlot_address, centroid_x, centroid_y, polygon_geom, vertices) = row
                .context("Failed to decode zone row")
                .map_err(Error::Store)?;
            zones.push(ZoneRecord {
                landlot_address,
                centroid_x,
                centroid_y,
                polygon_geom,
                vertices,
            });
        }

        Ok(zones)
    }
}
