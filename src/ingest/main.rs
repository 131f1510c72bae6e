//! Address bootstrap pipeline.
//!
//! Drops and reloads the address table from the source CSV, converting the
//! legacy projected coordinates to WGS84 in memory, then backfills rows the
//! conversion could not resolve by forward-geocoding their address.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use perimeter::config::Credentials;
use perimeter::geo::{self, UNRESOLVED_COORD};
use perimeter::models::{AddressRecord, EMPTY_ADDRESS};
use perimeter::providers::{Geocoder, NaverMapsClient};
use perimeter::store::{AddressStore, StoreClient};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Load the address CSV into the store and backfill coordinates")]
struct Args {
    /// Address CSV (landlot_address, road_name_address, x, y)
    #[arg(short, long)]
    file: PathBuf,

    /// ScyllaDB URL
    #[arg(long, default_value = "127.0.0.1")]
    scylla_url: String,

    /// Skip the geocoder backfill pass for unresolved rows
    #[arg(long)]
    skip_backfill: bool,

    /// Delay between backfill geocoding calls, in milliseconds
    #[arg(long, default_value = "100")]
    backfill_pace_ms: u64,
}

/// Raw CSV row; every field may be missing in the source data.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    landlot_address: Option<String>,
    #[serde(default)]
    road_name_address: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Perimeter Address Ingest");
    info!("File: {}", args.file.display());

    let store = StoreClient::new(&args.scylla_url).await?;

    info!("Recreating address table...");
    store.recreate_address_table().await?;

    let mut reader = csv::Reader::from_path(&args.file).context("Failed to open address CSV")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {pos} rows loaded ({msg})")
            .expect("valid progress template"),
    );

    let mut converted = 0usize;
    let mut unresolved = 0usize;

    for row in reader.deserialize::<CsvRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed CSV row: {}", e);
                continue;
            }
        };

        let record = normalize_row(row);
        if record.has_coordinates() {
            converted += 1;
        } else {
            unresolved += 1;
        }

        store.upsert_address(&record).await?;
        pb.inc(1);
        pb.set_message(format!("{} unresolved", unresolved));
    }
    pb.finish_and_clear();

    info!(
        "Loaded {} rows: {} with WGS84 coordinates, {} left unresolved",
        converted + unresolved,
        converted,
        unresolved
    );

    if args.skip_backfill {
        info!("Backfill skipped by request");
        return Ok(());
    }

    backfill_missing_coordinates(&store, Duration::from_millis(args.backfill_pace_ms)).await
}

/// Normalize one CSV row: empty addresses become the placeholder marker,
/// non-numeric coordinates become the unresolved sentinel, and resolvable
/// projected pairs are converted to WGS84 (x = lon, y = lat).
fn normalize_row(row: CsvRow) -> AddressRecord {
    let landlot_address = row
        .landlot_address
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| EMPTY_ADDRESS.to_string());
    let road_name_address = row
        .road_name_address
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| EMPTY_ADDRESS.to_string());

    let raw_x = parse_coord(row.x);
    let raw_y = parse_coord(row.y);

    let (x, y) = match geo::projected_to_geographic(raw_x, raw_y) {
        Some((lat, lon)) => (lon, lat),
        None => (UNRESOLVED_COORD, UNRESOLVED_COORD),
    };

    AddressRecord {
        landlot_address,
        road_name_address,
        x,
        y,
    }
}

fn parse_coord(value: Option<String>) -> f64 {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(UNRESOLVED_COORD)
}

/// Forward-geocode every sentinel row and write the result back, pacing the
/// provider between calls.
async fn backfill_missing_coordinates(store: &StoreClient, pace: Duration) -> Result<()> {
    let (key_id, key) = Credentials::naver_maps_from_env()
        .context("Backfill needs geocoder credentials (use --skip-backfill to load without)")?;
    let geocoder = Arc::new(NaverMapsClient::new(key_id, key));

    let rows = store.missing_coordinates().await?;
    if rows.is_empty() {
        info!("No unresolved coordinates to backfill");
        return Ok(());
    }

    info!("Backfilling {} unresolved rows", rows.len());
    let mut filled = 0usize;

    for row in &rows {
        let address = row.preferred_address();
        if address == EMPTY_ADDRESS {
            warn!("Row has no usable address; skipping");
            continue;
        }

        match geocoder.forward_geocode(address).await {
            Ok(Some((x, y))) => {
                store.update_coordinates(&row.landlot_address, x, y).await?;
                filled += 1;
            }
            Ok(None) => warn!("Geocoder found no match for '{}'", address),
            Err(e) => warn!("Geocoding '{}' failed: {}", address, e),
        }

        tokio::time::sleep(pace).await;
    }

    info!("Backfill complete: {} of {} rows resolved", filled, rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_row_missing_fields() {
        let record = normalize_row(CsvRow {
            landlot_address: None,
            road_name_address: Some("강남대로 390".to_string()),
            x: Some("not-a-number".to_string()),
            y: None,
        });

        assert_eq!(record.landlot_address, EMPTY_ADDRESS);
        assert_eq!(record.road_name_address, "강남대로 390");
        assert_eq!(record.x, UNRESOLVED_COORD);
        assert_eq!(record.y, UNRESOLVED_COORD);
        assert!(!record.has_coordinates());
    }

    #[test]
    fn test_normalize_row_converts_projected_pair() {
        let record = normalize_row(CsvRow {
            landlot_address: Some("역삼동 1-1".to_string()),
            road_name_address: None,
            x: Some("200000.0".to_string()),
            y: Some("500000.0".to_string()),
        });

        assert!(record.has_coordinates());
        // x = longitude, y = latitude after conversion
        assert!((record.x - 127.0).abs() < 0.5);
        assert!((record.y - 38.0).abs() < 0.5);
    }
}
