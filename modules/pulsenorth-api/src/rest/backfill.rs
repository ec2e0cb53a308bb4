//! Backfill trigger and status. The sweep runs as a background task; its
//! progress lives at the coordination key, same as the status endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use pulsenorth_coord::BACKFILL_STATUS_KEY;
use pulsenorth_ingest::{BackfillEngine, BackfillParams};

use crate::AppState;

#[derive(Deserialize)]
pub struct BackfillRunRequest {
    #[serde(default = "default_start_date")]
    start_date: String,
    end_date: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: u32,
    #[serde(default = "default_max_pages")]
    max_pages_per_month: u32,
}

fn default_start_date() -> String {
    "2022-11-01".to_string()
}

fn default_per_page() -> u32 {
    50
}

fn default_max_pages() -> u32 {
    3
}

pub async fn run_backfill(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BackfillRunRequest>,
) -> impl IntoResponse {
    let start_date = match NaiveDate::parse_from_str(&payload.start_date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "start_date must be YYYY-MM-DD"})),
            )
                .into_response();
        }
    };
    let end_date = match &payload.end_date {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"error": "end_date must be YYYY-MM-DD"})),
                )
                    .into_response();
            }
        },
        None => Utc::now().date_naive(),
    };

    let params = BackfillParams {
        start_date,
        end_date,
        per_page: payload.per_page,
        max_pages_per_month: payload.max_pages_per_month,
    };

    let engine = BackfillEngine::new(state.writer.clone(), state.coord.clone());
    let task_id = uuid::Uuid::new_v4().to_string();
    tokio::spawn(async move {
        if let Err(e) = engine.run(params).await {
            error!(error = %e, "Backfill run failed");
        }
    });

    Json(json!({"status": "queued", "task_id": task_id})).into_response()
}

pub async fn backfill_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coord.get_json(BACKFILL_STATUS_KEY).await {
        Ok(Some(status)) => Json(status).into_response(),
        _ => Json(json!({
            "state": "idle",
            "checked_at": Utc::now().to_rfc3339(),
        }))
        .into_response(),
    }
}
