//! Feed listing, the SSE stream, and bulk export.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use pulsenorth_analytics::TimeWindow;
use pulsenorth_common::types::Development;
use pulsenorth_store::FeedFilters;

use crate::rest::internal_error;
use crate::AppState;

const EXPORT_MAX_ROWS: i64 = 5000;

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_window")]
    time_window: String,
    category: Option<String>,
    jurisdiction: Option<String>,
    language: Option<String>,
    search: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_format")]
    fmt: String,
    #[serde(default = "default_window")]
    time_window: String,
    category: Option<String>,
    jurisdiction: Option<String>,
    language: Option<String>,
    search: Option<String>,
}

fn default_window() -> String {
    "24h".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    25
}

fn default_format() -> String {
    "json".to_string()
}

fn filters_from(
    time_window: &str,
    category: Option<String>,
    jurisdiction: Option<String>,
    language: Option<String>,
    search: Option<String>,
) -> FeedFilters {
    let window = TimeWindow::parse(time_window);
    FeedFilters {
        since: Utc::now() - window.duration(),
        category,
        jurisdiction,
        language,
        search,
    }
}

pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedQuery>,
) -> impl IntoResponse {
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 200);
    let filters = filters_from(
        &params.time_window,
        params.category,
        params.jurisdiction,
        params.language,
        params.search,
    );

    match state.store.feed(&filters, page, page_size).await {
        Ok((items, total)) => Json(json!({
            "items": items,
            "page": page,
            "page_size": page_size,
            "total": total,
        }))
        .into_response(),
        Err(e) => internal_error("Failed to load feed", e),
    }
}

/// SSE stream of new items as they are published, with a ~10s ping
/// keepalive.
pub async fn stream_feed(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let coord = state.coord.clone();
    let channel = state.config.sse_channel.clone();

    let stream = async_stream::stream! {
        let mut pubsub = match coord.pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                warn!(error = %e, "Failed to open SSE pub/sub connection");
                return;
            }
        };
        if let Err(e) = pubsub.subscribe(&channel).await {
            warn!(error = %e, "Failed to subscribe to new-item channel");
            return;
        }
        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = msg.get_payload().unwrap_or_default();
            if payload.is_empty() {
                continue;
            }
            yield Ok::<Event, Infallible>(Event::default().event("new_item").data(payload));
        }
    };

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .event(Event::default().event("ping").data("{}")),
    );

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
        .into_response()
}

/// Escape one CSV field: quote when it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

const CSV_HEADER: &str = "id,source_id,source_type,category,title,description,url,publisher,\
published_at,ingested_at,language,jurisdiction,entities,tags,hash,confidence";

fn to_csv(rows: &[Development]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        let fields = [
            row.id.to_string(),
            row.source_id.clone(),
            row.source_type.as_str().to_string(),
            row.category.as_str().to_string(),
            row.title.clone(),
            row.description.clone(),
            row.url.clone(),
            row.publisher.clone(),
            row.published_at.to_rfc3339(),
            row.ingested_at.to_rfc3339(),
            row.language.as_str().to_string(),
            row.jurisdiction.clone(),
            row.entities.join("|"),
            row.tags.join("|"),
            row.hash.clone(),
            row.confidence.to_string(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

pub async fn export_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> impl IntoResponse {
    let filters = filters_from(
        &params.time_window,
        params.category,
        params.jurisdiction,
        params.language,
        params.search,
    );

    let rows = match state.store.export(&filters, EXPORT_MAX_ROWS).await {
        Ok(rows) => rows,
        Err(e) => return internal_error("Failed to export feed", e),
    };

    match params.fmt.as_str() {
        "csv" => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"ai_developments.csv\"",
                ),
            ],
            to_csv(&rows),
        )
            .into_response(),
        _ => Json(json!({"count": rows.len(), "items": rows})).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulsenorth_common::types::{Category, Language, SourceType};
    use uuid::Uuid;

    #[test]
    fn csv_escaping_quotes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn csv_rows_pipe_join_arrays() {
        let at = Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap();
        let dev = Development {
            id: Uuid::nil(),
            source_id: "s1".into(),
            source_type: SourceType::Gov,
            category: Category::Policy,
            title: "Directive on automated decision-making, updated".into(),
            description: String::new(),
            url: "https://canada.ca/x".into(),
            publisher: "Government of Canada".into(),
            published_at: at,
            ingested_at: at,
            language: Language::En,
            jurisdiction: "Canada".into(),
            entities: vec!["Government of Canada".into(), "ISED".into()],
            tags: vec!["directive".into(), "automated".into()],
            hash: "abc".into(),
            confidence: 0.9,
        };
        let csv = to_csv(&[dev]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER);
        let row = lines.next().unwrap();
        assert!(row.contains("Government of Canada|ISED"));
        assert!(row.contains("directive|automated"));
        // Comma in the title forces quoting.
        assert!(row.contains("\"Directive on automated decision-making, updated\""));
    }
}
