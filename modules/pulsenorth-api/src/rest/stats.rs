//! Thin read handlers over the analytics engine.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use pulsenorth_analytics as analytics;
use pulsenorth_analytics::{AlertThresholds, TimeWindow};

use crate::rest::internal_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    time_window: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    time_window: Option<String>,
    min_baseline: Option<i64>,
    min_delta_percent: Option<f64>,
    min_z_score: Option<f64>,
}

fn window_of(raw: &Option<String>, default: TimeWindow) -> TimeWindow {
    raw.as_deref().map(TimeWindow::parse).unwrap_or(default)
}

pub async fn get_kpis(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match analytics::fetch_kpis(&state.pool).await {
        Ok(kpis) => Json(kpis).into_response(),
        Err(e) => internal_error("Failed to load KPIs", e),
    }
}

pub async fn get_hourly(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match analytics::fetch_hourly_timeseries(&state.pool).await {
        Ok(series) => Json(series).into_response(),
        Err(e) => internal_error("Failed to load hourly timeseries", e),
    }
}

pub async fn get_weekly(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match analytics::fetch_weekly_timeseries(&state.pool).await {
        Ok(series) => Json(series).into_response(),
        Err(e) => internal_error("Failed to load weekly timeseries", e),
    }
}

pub async fn get_sources_breakdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_sources_breakdown(&state.pool, window, params.limit.unwrap_or(8)).await
    {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load sources breakdown", e),
    }
}

pub async fn get_jurisdictions_breakdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_jurisdictions_breakdown(
        &state.pool,
        window,
        params.limit.unwrap_or(12),
    )
    .await
    {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load jurisdictions breakdown", e),
    }
}

pub async fn get_entities_breakdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_entities_breakdown(&state.pool, window, params.limit.unwrap_or(12))
        .await
    {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load entities breakdown", e),
    }
}

pub async fn get_tags_breakdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_tags_breakdown(&state.pool, window, params.limit.unwrap_or(14)).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load tags breakdown", e),
    }
}

pub async fn get_brief(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    match analytics::fetch_brief_snapshot(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load brief", e),
    }
}

pub async fn get_compare(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_scope_compare(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load scope compare", e),
    }
}

pub async fn get_confidence(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_confidence_profile(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load confidence profile", e),
    }
}

pub async fn get_concentration(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_concentration(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load concentration", e),
    }
}

pub async fn get_momentum(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    match analytics::fetch_momentum(&state.pool, window, params.limit.unwrap_or(8)).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load momentum", e),
    }
}

pub async fn get_entity_momentum(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    match analytics::fetch_entity_momentum(&state.pool, window, params.limit.unwrap_or(10)).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load entity momentum", e),
    }
}

pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertsQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    let defaults = AlertThresholds::default();
    let thresholds = AlertThresholds {
        min_baseline: params.min_baseline.unwrap_or(defaults.min_baseline).clamp(1, 100),
        min_delta_percent: params
            .min_delta_percent
            .unwrap_or(defaults.min_delta_percent)
            .clamp(1.0, 500.0),
        min_z_score: params.min_z_score.unwrap_or(defaults.min_z_score),
    };
    match analytics::fetch_alerts(&state.pool, window, thresholds).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load alerts", e),
    }
}

pub async fn get_risk(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    match analytics::fetch_risk_index(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load risk index", e),
    }
}

pub async fn get_risk_trend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    match analytics::fetch_risk_trend(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load risk trend", e),
    }
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::H24);
    match analytics::fetch_summary(&state.pool, window).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load summary", e),
    }
}

pub async fn get_coverage(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> impl IntoResponse {
    let window = window_of(&params.time_window, TimeWindow::D7);
    match analytics::fetch_coverage(&state.pool, window, params.limit.unwrap_or(8)).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => internal_error("Failed to load coverage", e),
    }
}
