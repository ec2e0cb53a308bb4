//! Read-only analytics over the `ai_developments` table: KPIs, timeseries,
//! breakdowns, change-point alerts, concentration, momentum, and risk.
//!
//! Pure numeric logic (window math, alert evaluation, HHI, risk scoring)
//! lives in plain functions so it can be tested without a database; the
//! `fetch_*` functions wrap those in the SQL they need.

pub mod alerts;
pub mod breakdowns;
pub mod brief;
pub mod concentration;
pub mod kpis;
pub mod momentum;
pub mod profile;
pub mod queries;
pub mod risk;
pub mod timeseries;
pub mod windows;

pub use alerts::{evaluate_alerts, fetch_alerts, Alert, AlertThresholds, AlertsResponse};
pub use breakdowns::{
    fetch_coverage, fetch_entities_breakdown, fetch_jurisdictions_breakdown,
    fetch_sources_breakdown, fetch_tags_breakdown,
};
pub use brief::{fetch_brief_snapshot, fetch_summary};
pub use concentration::{concentration_label, fetch_concentration, hhi};
pub use kpis::{fetch_kpis, KpisResponse};
pub use momentum::{fetch_entity_momentum, fetch_momentum};
pub use profile::{fetch_confidence_profile, fetch_scope_compare};
pub use risk::{fetch_risk_index, fetch_risk_trend, risk_level, risk_reasons, risk_score};
pub use timeseries::{fetch_hourly_timeseries, fetch_weekly_timeseries, EchartsTimeseriesResponse};
pub use windows::{calc_delta, TimeWindow};
