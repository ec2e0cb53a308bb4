//! Source catalog, composite health, and run history.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use pulsenorth_coord::SOURCE_HEALTH_KEY;
use pulsenorth_sources::list_definitions;
use pulsenorth_store::SourceState;

use crate::rest::internal_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct RunsQuery {
    source: Option<String>,
    #[serde(default = "default_runs_window")]
    window: String,
    #[serde(default = "default_runs_limit")]
    limit: i64,
}

fn default_runs_window() -> String {
    "24h".to_string()
}

fn default_runs_limit() -> i64 {
    200
}

fn runs_window(value: &str) -> Duration {
    match value {
        "7d" => Duration::days(7),
        "30d" => Duration::days(30),
        _ => Duration::hours(24),
    }
}

fn set_default(row: &mut Map<String, Value>, key: &str, value: Value) {
    row.entry(key.to_string()).or_insert(value);
}

/// One health row: the cached run snapshot overlaid with catalog metadata
/// and the persisted source state.
fn health_row(
    snapshot_row: Option<&Value>,
    source: &pulsenorth_common::types::SourceDefinition,
    state: Option<&SourceState>,
    now: chrono::DateTime<Utc>,
) -> Value {
    let mut row: Map<String, Value> = snapshot_row
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();

    set_default(&mut row, "source", json!(source.key));
    row.insert("display_name".into(), json!(source.display_name));
    row.insert("enabled".into(), json!(source.enabled));
    row.insert("cadence_minutes".into(), json!(source.cadence_minutes));
    row.insert("source_type".into(), json!(source.source_type.as_str()));
    row.insert("acquisition_mode".into(), json!(source.acquisition_mode.as_str()));

    match state {
        Some(state) => {
            row.insert(
                "last_success_at".into(),
                json!(state.last_success_at.map(|t| t.to_rfc3339())),
            );
            row.insert(
                "last_error_at".into(),
                json!(state.last_error_at.map(|t| t.to_rfc3339())),
            );
            row.insert(
                "next_run_at".into(),
                json!(state.next_run_at.map(|t| t.to_rfc3339())),
            );
            row.insert("consecutive_failures".into(), json!(state.consecutive_failures));
            let freshness = state
                .last_success_at
                .map(|t| ((now - t).num_seconds() / 60).max(0));
            match freshness {
                Some(lag) => {
                    row.insert("freshness_lag_minutes".into(), json!(lag));
                }
                None => set_default(&mut row, "freshness_lag_minutes", Value::Null),
            }
        }
        None => {
            set_default(&mut row, "last_success_at", Value::Null);
            set_default(&mut row, "last_error_at", Value::Null);
            set_default(&mut row, "next_run_at", Value::Null);
            set_default(&mut row, "consecutive_failures", json!(0));
            set_default(&mut row, "freshness_lag_minutes", Value::Null);
        }
    }

    if !row.contains_key("status") {
        let status = if !source.enabled {
            "disabled"
        } else if row["consecutive_failures"].as_i64().unwrap_or(0) > 0 {
            "error"
        } else if !row["last_success_at"].is_null() {
            "ok"
        } else {
            "idle"
        };
        row.insert("status".into(), json!(status));
    }

    for key in ["fetched", "accepted", "inserted", "duplicates", "write_errors", "duration_ms"] {
        set_default(&mut row, key, json!(0));
    }
    set_default(&mut row, "error", json!(""));
    let last_run_default = row
        .get("last_success_at")
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!(now.to_rfc3339()));
    set_default(&mut row, "last_run", last_run_default);

    Value::Object(row)
}

pub async fn sources_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now();

    let snapshot = state
        .coord
        .get_json(SOURCE_HEALTH_KEY)
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| json!({}));
    let snapshot_rows: HashMap<String, Value> = snapshot["sources"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    row["source"].as_str().map(|key| (key.to_string(), row.clone()))
                })
                .collect()
        })
        .unwrap_or_default();

    let states = match state.tracking.list_states().await {
        Ok(states) => states,
        Err(e) => return internal_error("Failed to load source states", e),
    };
    let states_by_key: HashMap<&str, &SourceState> =
        states.iter().map(|s| (s.source_key.as_str(), s)).collect();

    let mut rows: Vec<Value> = list_definitions(true)
        .iter()
        .map(|source| {
            health_row(
                snapshot_rows.get(source.key),
                source,
                states_by_key.get(source.key).copied(),
                now,
            )
        })
        .collect();
    rows.sort_by_key(|row| {
        (
            !row["enabled"].as_bool().unwrap_or(false),
            row["source"].as_str().unwrap_or("").to_string(),
        )
    });

    let inserted_total: i64 = rows.iter().filter_map(|r| r["inserted"].as_i64()).sum();
    let candidates_total: i64 = rows.iter().filter_map(|r| r["accepted"].as_i64()).sum();

    Json(json!({
        "updated_at": now.to_rfc3339(),
        "run_status": snapshot["run_status"].as_str().unwrap_or("ok"),
        "sources": rows,
        "inserted_total": inserted_total,
        "candidates_total": candidates_total,
        "skipped_lock_count": snapshot["skipped_lock_count"].as_i64().unwrap_or(0),
    }))
    .into_response()
}

pub async fn sources_catalog() -> impl IntoResponse {
    let sources = list_definitions(true);
    Json(json!({
        "updated_at": Utc::now().to_rfc3339(),
        "count": sources.len(),
        "sources": sources
            .iter()
            .map(|source| {
                json!({
                    "source": source.key,
                    "display_name": source.display_name,
                    "enabled": source.enabled,
                    "cadence_minutes": source.cadence_minutes,
                    "source_type": source.source_type.as_str(),
                    "acquisition_mode": source.acquisition_mode.as_str(),
                })
            })
            .collect::<Vec<_>>(),
    }))
}

pub async fn source_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunsQuery>,
) -> impl IntoResponse {
    let since = Utc::now() - runs_window(&params.window);
    let limit = params.limit.clamp(1, 1000);

    match state.tracking.recent_runs(params.source.as_deref(), since, limit).await {
        Ok(runs) => Json(json!({
            "window": params.window,
            "source": params.source,
            "count": runs.len(),
            "runs": runs
                .iter()
                .map(|run| {
                    json!({
                        "id": run.id.to_string(),
                        "source": run.source_key,
                        "status": run.status,
                        "started_at": run.started_at.to_rfc3339(),
                        "finished_at": run.finished_at.to_rfc3339(),
                        "duration_ms": run.duration_ms,
                        "fetched": run.fetched,
                        "accepted": run.accepted,
                        "inserted": run.inserted,
                        "duplicates": run.duplicates,
                        "write_errors": run.write_errors,
                        "error": run.error,
                        "details": run.details.0,
                    })
                })
                .collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => internal_error("Failed to load source runs", e),
    }
}
