//! Maintenance: purge synthetic fixture rows. Dry-run unless `execute=true`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::rest::internal_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct PurgeQuery {
    #[serde(default)]
    execute: bool,
}

pub async fn purge_synthetic(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PurgeQuery>,
) -> impl IntoResponse {
    let before = match state.store.count_synthetic().await {
        Ok(count) => count,
        Err(e) => return internal_error("Failed to count synthetic rows", e),
    };

    let deleted = if params.execute && before > 0 {
        match state.store.purge_synthetic().await {
            Ok(deleted) => deleted,
            Err(e) => return internal_error("Failed to purge synthetic rows", e),
        }
    } else {
        0
    };

    let after = match state.store.count_synthetic().await {
        Ok(count) => count,
        Err(e) => return internal_error("Failed to count synthetic rows", e),
    };

    Json(json!({
        "execute": params.execute,
        "synthetic_before": before,
        "deleted": deleted,
        "synthetic_after": after,
        "checked_at": Utc::now().to_rfc3339(),
    }))
    .into_response()
}
