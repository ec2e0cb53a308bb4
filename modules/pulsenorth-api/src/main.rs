//! HTTP read API over the store, plus the SSE stream and on-demand
//! backfill/maintenance entry points.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulsenorth_common::Config;
use pulsenorth_coord::CoordClient;
use pulsenorth_ingest::Writer;
use pulsenorth_store::{connect, DevelopmentStore, TrackingStore};

mod rest;

pub struct AppState {
    pub pool: PgPool,
    pub store: DevelopmentStore,
    pub tracking: TrackingStore,
    pub coord: CoordClient,
    pub writer: Writer,
    pub config: Config,
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn api_healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": "api"}))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsenorth=info".parse()?))
        .init();

    let config = Config::api_from_env();

    let pool = connect(&config.database_url).await?;
    let store = DevelopmentStore::new(pool.clone());
    store.migrate().await?;
    let tracking = TrackingStore::new(pool.clone());
    let coord = CoordClient::connect(&config.redis_url).await?;
    let writer = Writer::new(store.clone(), coord.clone(), config.sse_channel.clone());

    let addr = format!("{}:{}", config.api_host, config.api_port);
    let state = Arc::new(AppState { pool, store, tracking, coord, writer, config });

    let app = Router::new()
        // Health checks
        .route("/healthz", get(healthz))
        .route("/api/v1/healthz", get(api_healthz))
        // Feed
        .route("/api/v1/feed", get(rest::feed::get_feed))
        .route("/api/v1/feed/stream", get(rest::feed::stream_feed))
        .route("/api/v1/feed/export", get(rest::feed::export_feed))
        // Stats
        .route("/api/v1/stats/kpis", get(rest::stats::get_kpis))
        .route("/api/v1/stats/hourly", get(rest::stats::get_hourly))
        .route("/api/v1/stats/weekly", get(rest::stats::get_weekly))
        .route("/api/v1/stats/sources", get(rest::stats::get_sources_breakdown))
        .route("/api/v1/stats/jurisdictions", get(rest::stats::get_jurisdictions_breakdown))
        .route("/api/v1/stats/entities", get(rest::stats::get_entities_breakdown))
        .route("/api/v1/stats/tags", get(rest::stats::get_tags_breakdown))
        .route("/api/v1/stats/brief", get(rest::stats::get_brief))
        .route("/api/v1/stats/compare", get(rest::stats::get_compare))
        .route("/api/v1/stats/confidence", get(rest::stats::get_confidence))
        .route("/api/v1/stats/concentration", get(rest::stats::get_concentration))
        .route("/api/v1/stats/momentum", get(rest::stats::get_momentum))
        .route("/api/v1/stats/entity-momentum", get(rest::stats::get_entity_momentum))
        .route("/api/v1/stats/alerts", get(rest::stats::get_alerts))
        .route("/api/v1/stats/risk", get(rest::stats::get_risk))
        .route("/api/v1/stats/risk-trend", get(rest::stats::get_risk_trend))
        .route("/api/v1/stats/summary", get(rest::stats::get_summary))
        .route("/api/v1/stats/coverage", get(rest::stats::get_coverage))
        // Sources
        .route("/api/v1/sources/health", get(rest::sources::sources_health))
        .route("/api/v1/sources/catalog", get(rest::sources::sources_catalog))
        .route("/api/v1/sources/runs", get(rest::sources::source_runs))
        // Backfill
        .route("/api/v1/backfill/run", post(rest::backfill::run_backfill))
        .route("/api/v1/backfill/status", get(rest::backfill::backfill_status))
        // Maintenance
        .route("/api/v1/maintenance/purge-synthetic", post(rest::maintenance::purge_synthetic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!(addr = %addr, "API listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
