//! Query server for nearby-building search, restricted-zone batch builds,
//! and siting-eligibility checks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use perimeter::config::{Config, Credentials};
use perimeter::nearby::NearbyService;
use perimeter::providers::{NaverMapsClient, NaverSearchClient, OrsClient};
use perimeter::store::{StoreClient, ZoneStore};
use perimeter::zone::{BatchReport, Eligibility, EligibilityChecker, ZoneBatchBuilder, ZoneIndex};
use perimeter::{Error, GeoPoint, NearbyBuildings};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Retail-siting query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    listen: String,

    /// ScyllaDB URL
    #[arg(long, default_value = "127.0.0.1")]
    scylla_url: String,

    /// Optional TOML config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    config: Config,
    store: Arc<StoreClient>,
    nearby: NearbyService,
    builder: ZoneBatchBuilder,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Perimeter Query Server");

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    let credentials = Credentials::from_env()?;

    info!("Connecting to ScyllaDB at {}", args.scylla_url);
    let store = Arc::new(StoreClient::new(&args.scylla_url).await?);

    let maps = Arc::new(NaverMapsClient::new(
        credentials.naver_client_id.clone(),
        credentials.naver_client_secret.clone(),
    ));
    let search = Arc::new(NaverSearchClient::new(
        credentials.naver_dev_id.clone(),
        credentials.naver_dev_secret.clone(),
    ));
    let ors = Arc::new(OrsClient::new(credentials.ors_api_key.clone()));

    let nearby = NearbyService::new(maps, search, &config.search);
    let builder = ZoneBatchBuilder::new(store.clone(), store.clone(), ors, &config.zone);

    let state = Arc::new(AppState {
        config,
        store,
        nearby,
        builder,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/building/nearby-buildings", get(nearby_handler))
        .route("/restricted-zone/calculate", get(calculate_handler))
        .route("/restricted-zones", get(zones_handler))
        .route(
            "/check-location/{latitude}/{longitude}",
            get(check_handler),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let store_ok = state.store.zone_count().await.is_ok();

    Ok(Json(HealthResponse {
        status: if store_ok { "ok" } else { "degraded" },
        store: store_ok,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: bool,
}

#[derive(Deserialize)]
struct NearbyParams {
    latitude: f64,
    longitude: f64,
    /// Optional radius override in meters
    radius: Option<f64>,
}

/// Nearby commercial buildings, grouped by resolved street address
async fn nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<NearbyBuildings>, (StatusCode, String)> {
    // Caller-level deadline over the whole aggregation; dropping the future
    // cancels all in-flight category searches.
    let deadline = state.config.search.request_timeout();
    let result = tokio::time::timeout(
        deadline,
        state
            .nearby
            .find_nearby_buildings(params.latitude, params.longitude, params.radius),
    )
    .await;

    match result {
        Ok(Ok(buildings)) => Ok(Json(buildings)),
        Ok(Err(e)) => Err(error_response(e)),
        Err(_) => Err((
            StatusCode::GATEWAY_TIMEOUT,
            "nearby search timed out".to_string(),
        )),
    }
}

/// Compute restricted zones for every stored address (no-op when populated)
async fn calculate_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatchReport>, (StatusCode, String)> {
    let report = state.builder.build_all_zones().await.map_err(|e| {
        error!("Zone batch failed: {}", e);
        error_response(e)
    })?;

    Ok(Json(report))
}

#[derive(Serialize)]
struct ZoneView {
    landlot_address: String,
    centroid_x: f64,
    centroid_y: f64,
    vertices: Vec<[f64; 2]>,
}

/// All stored restricted-zone polygons, for map rendering
async fn zones_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ZoneView>>, (StatusCode, String)> {
    let zones = state.store.all_zones().await.map_err(error_response)?;

    let views = zones
        .into_iter()
        .filter_map(|zone| {
            let vertices = zone.ring()?;
            Some(ZoneView {
                landlot_address: zone.landlot_address,
                centroid_x: zone.centroid_x,
                centroid_y: zone.centroid_y,
                vertices,
            })
        })
        .collect();

    Ok(Json(views))
}

/// Is the position outside every restricted zone?
async fn check_handler(
    State(state): State<Arc<AppState>>,
    Path((latitude, longitude)): Path<(f64, f64)>,
) -> Result<Json<Eligibility>, (StatusCode, String)> {
    let zones = state.store.all_zones().await.map_err(error_response)?;
    let checker = EligibilityChecker::new(
        ZoneIndex::build(zones),
        state.config.zone.boundary_counts_as_inside,
    );

    let verdict = checker
        .is_eligible(GeoPoint::new(latitude, longitude))
        .map_err(error_response)?;

    Ok(Json(verdict))
}

fn error_response(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::LocationResolution { .. } => StatusCode::NOT_FOUND,
        Error::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
        Error::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}
