pub mod backfill;
pub mod feed;
pub mod maintenance;
pub mod sources;
pub mod stats;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Uniform 500 for query failures; details go to the log, not the client.
pub(crate) fn internal_error(context: &str, e: anyhow::Error) -> Response {
    warn!(error = %e, "{context}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
