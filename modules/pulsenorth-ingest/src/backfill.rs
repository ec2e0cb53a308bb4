//! Month-windowed historical sweep over the academic source. Progress is
//! written to the coordination store after every month so observers can
//! follow along and a failure leaves a usable trail.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::json;
use tracing::{info, warn};

use pulsenorth_common::gate::{is_accepted, GateThresholds};
use pulsenorth_coord::{CoordClient, BACKFILL_STATUS_KEY};
use pulsenorth_sources::OpenAlexAdapter;
use pulsenorth_store::WriteOutcome;

use crate::writer::Writer;

#[derive(Debug, Clone)]
pub struct BackfillParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub per_page: u32,
    pub max_pages_per_month: u32,
}

impl BackfillParams {
    /// Clamp pagination into the supported ranges.
    pub fn bounded(mut self) -> Self {
        self.per_page = self.per_page.clamp(10, 200);
        self.max_pages_per_month = self.max_pages_per_month.clamp(1, 10);
        self
    }
}

/// Partition `[start, end]` into calendar months. Each window is
/// `(month_start, min(end, next_month_start))`.
pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut current = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)
        .expect("first of month is always valid");
    while current <= end {
        let next_month = if current.month() == 12 {
            NaiveDate::from_ymd_opt(current.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(current.year(), current.month() + 1, 1)
        }
        .expect("first of month is always valid");
        windows.push((current, next_month.min(end)));
        current = next_month;
    }
    windows
}

pub struct BackfillEngine {
    adapter: OpenAlexAdapter,
    writer: Writer,
    coord: CoordClient,
}

impl BackfillEngine {
    pub fn new(writer: Writer, coord: CoordClient) -> Self {
        Self { adapter: OpenAlexAdapter::new(), writer, coord }
    }

    async fn set_status(&self, payload: &serde_json::Value) {
        if let Err(e) = self.coord.set_json(BACKFILL_STATUS_KEY, payload).await {
            warn!(error = %e, "Failed to write backfill status");
        }
    }

    /// Run the sweep. Cancellable only at month boundaries; progress is
    /// persisted before each new month starts. Errors re-raise to the task
    /// layer after the failed state is recorded.
    pub async fn run(&self, params: BackfillParams) -> Result<serde_json::Value> {
        let params = params.bounded();
        let started_at = Utc::now().to_rfc3339();
        let mut scanned = 0u64;
        let mut inserted = 0u64;

        self.set_status(&json!({
            "state": "running",
            "started_at": started_at,
            "start_date": params.start_date.to_string(),
            "end_date": params.end_date.to_string(),
            "scanned": scanned,
            "inserted": inserted,
        }))
        .await;

        let outcome: Result<()> = async {
            for (month_start, month_end) in month_windows(params.start_date, params.end_date) {
                let records = self
                    .adapter
                    .fetch_month(
                        month_start,
                        month_end,
                        params.per_page,
                        params.max_pages_per_month,
                    )
                    .await
                    .with_context(|| format!("Backfill fetch failed for {month_start}"))?;

                for candidate in &records {
                    scanned += 1;
                    if !is_accepted(candidate, GateThresholds::BACKFILL) {
                        continue;
                    }
                    if let WriteOutcome::Inserted(_) = self.writer.write(candidate).await {
                        inserted += 1;
                    }
                }

                self.set_status(&json!({
                    "state": "running",
                    "started_at": started_at,
                    "start_date": params.start_date.to_string(),
                    "end_date": params.end_date.to_string(),
                    "current_month": month_start.to_string(),
                    "scanned": scanned,
                    "inserted": inserted,
                }))
                .await;
                info!(month = %month_start, scanned, inserted, "Backfill month complete");
            }
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                if inserted > 0 {
                    if let Err(e) = self.writer.store().refresh_views().await {
                        warn!(error = %e, "View refresh failed after backfill");
                    }
                }
                let finished = json!({
                    "state": "completed",
                    "started_at": started_at,
                    "finished_at": Utc::now().to_rfc3339(),
                    "start_date": params.start_date.to_string(),
                    "end_date": params.end_date.to_string(),
                    "scanned": scanned,
                    "inserted": inserted,
                });
                self.set_status(&finished).await;
                Ok(finished)
            }
            Err(e) => {
                self.set_status(&json!({
                    "state": "failed",
                    "started_at": started_at,
                    "failed_at": Utc::now().to_rfc3339(),
                    "start_date": params.start_date.to_string(),
                    "end_date": params.end_date.to_string(),
                    "scanned": scanned,
                    "inserted": inserted,
                    "error": e.to_string(),
                }))
                .await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn windows_cover_whole_months() {
        let windows = month_windows(date(2025, 11, 15), date(2026, 2, 10));
        assert_eq!(
            windows,
            vec![
                (date(2025, 11, 1), date(2025, 12, 1)),
                (date(2025, 12, 1), date(2026, 1, 1)),
                (date(2026, 1, 1), date(2026, 2, 1)),
                (date(2026, 2, 1), date(2026, 2, 10)),
            ]
        );
    }

    #[test]
    fn single_month_window() {
        let windows = month_windows(date(2026, 3, 5), date(2026, 3, 20));
        assert_eq!(windows, vec![(date(2026, 3, 1), date(2026, 3, 20))]);
    }

    #[test]
    fn empty_when_start_after_end() {
        assert!(month_windows(date(2026, 5, 1), date(2026, 4, 1)).is_empty());
    }

    #[test]
    fn params_clamp_to_supported_ranges() {
        let params = BackfillParams {
            start_date: date(2022, 11, 1),
            end_date: date(2026, 1, 1),
            per_page: 5000,
            max_pages_per_month: 0,
        }
        .bounded();
        assert_eq!(params.per_page, 200);
        assert_eq!(params.max_pages_per_month, 1);
    }
}
