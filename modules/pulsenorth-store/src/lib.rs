//! Postgres persistence: the deduplicated `ai_developments` writer, feed
//! queries, materialized-view refresh, and per-source run tracking.

pub mod store;
pub mod tracking;

pub use store::{connect, DevelopmentStore, FeedFilters, WriteOutcome};
pub use tracking::{NewSourceRun, SourceRun, SourceState, TrackingStore};
