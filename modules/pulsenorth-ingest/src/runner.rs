//! Executes one source end-to-end: distributed lock, adapter fetch, gate,
//! dedup writes, state transitions with exponential backoff, and the run
//! record. A failing source never fails the process; everything comes back
//! as a `HealthEntry`.

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use pulsenorth_common::gate::{is_accepted, GateThresholds};
use pulsenorth_common::types::{HealthEntry, RunStatus, SourceDefinition};
use pulsenorth_common::Config;
use pulsenorth_coord::{ingest_lock_key, CoordClient};
use pulsenorth_sources::{adapter_for, get_definition, synthetic};
use pulsenorth_store::{NewSourceRun, TrackingStore, WriteOutcome};

use crate::writer::Writer;

/// How many items one live fetch asks an adapter for.
const FETCH_LIMIT: usize = 20;

/// Backoff cap: no source waits more than six hours.
const MAX_BACKOFF_MINUTES: i64 = 360;

/// Errors stored on the state row are truncated to this length.
const MAX_STORED_ERROR_LEN: usize = 500;

/// Lock TTL: at least ten minutes, and at least 120 seconds per cadence
/// minute so the TTL always outlives a slow run.
pub fn lock_ttl_secs(cadence_minutes: u32) -> u64 {
    (cadence_minutes as u64 * 120).max(600)
}

/// `cadence · 2^min(failures, 4)`, capped at six hours.
pub fn backoff_minutes(cadence_minutes: u32, consecutive_failures: i32) -> i64 {
    let exponent = consecutive_failures.clamp(0, 4) as u32;
    let backoff = cadence_minutes as i64 * 2i64.pow(exponent);
    backoff.min(MAX_BACKOFF_MINUTES)
}

fn truncate_error(error: &str) -> String {
    if error.len() <= MAX_STORED_ERROR_LEN {
        error.to_string()
    } else {
        error.chars().take(MAX_STORED_ERROR_LEN).collect()
    }
}

#[derive(Clone)]
pub struct IngestRunner {
    tracking: TrackingStore,
    writer: Writer,
    coord: CoordClient,
    config: Config,
}

struct RunCounters {
    fetched: u32,
    accepted: u32,
    inserted: u32,
    duplicates: u32,
    write_errors: u32,
}

impl IngestRunner {
    pub fn new(tracking: TrackingStore, writer: Writer, coord: CoordClient, config: Config) -> Self {
        Self { tracking, writer, coord, config }
    }

    /// Run one source under its distributed lock. Always returns a health
    /// entry; error states are encoded in it, not raised.
    pub async fn run_source(&self, source_key: &str) -> HealthEntry {
        let started_at = Utc::now();

        let source = match get_definition(source_key) {
            Some(source) => source,
            None => {
                return self
                    .finish_error(
                        source_key,
                        started_at,
                        &format!("unknown source key: {source_key}"),
                        0,
                        60,
                    )
                    .await;
            }
        };

        let lock_key = ingest_lock_key(source_key);
        let token = Uuid::new_v4().to_string();
        let ttl = lock_ttl_secs(source.cadence_minutes);

        let acquired = match self.coord.try_acquire_lock(&lock_key, &token, ttl).await {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(source = source_key, error = %e, "Lock acquire failed");
                return self
                    .finish_error(source_key, started_at, &e.to_string(), 0, source.cadence_minutes)
                    .await;
            }
        };

        if !acquired {
            return self.finish_skipped_lock(source_key, started_at).await;
        }

        let entry = self.execute(&source, started_at).await;

        match self.coord.release_lock(&lock_key, &token).await {
            Ok(true) => {}
            Ok(false) => warn!(source = source_key, "Lock expired before release"),
            Err(e) => warn!(source = source_key, error = %e, "Lock release failed"),
        }

        entry
    }

    /// The work done while holding the lock.
    async fn execute(&self, source: &SourceDefinition, started_at: DateTime<Utc>) -> HealthEntry {
        let source_key = source.key;

        if let Err(e) = self.tracking.ensure_state(source_key).await {
            error!(source = source_key, error = %e, "Failed to ensure source state");
        }

        let adapter = match adapter_for(source_key) {
            Some(adapter) => adapter,
            None => {
                return self
                    .finish_error(
                        source_key,
                        started_at,
                        "no adapter registered",
                        0,
                        source.cadence_minutes,
                    )
                    .await;
            }
        };

        let candidates = match adapter.fetch(FETCH_LIMIT).await {
            Ok(candidates) => candidates,
            Err(e) => {
                return self
                    .finish_error(
                        source_key,
                        started_at,
                        &e.to_string(),
                        0,
                        source.cadence_minutes,
                    )
                    .await;
            }
        };
        let fetched = candidates.len() as u32;

        let mut accepted: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| is_accepted(candidate, GateThresholds::LIVE))
            .collect();
        if accepted.is_empty() && self.config.enable_synthetic_fallback {
            accepted = synthetic::generate_batch();
        }

        let mut counters = RunCounters {
            fetched,
            accepted: accepted.len() as u32,
            inserted: 0,
            duplicates: 0,
            write_errors: 0,
        };

        for candidate in &accepted {
            match self.writer.write(candidate).await {
                WriteOutcome::Inserted(_) => counters.inserted += 1,
                WriteOutcome::Duplicate => counters.duplicates += 1,
                WriteOutcome::Error(_) => counters.write_errors += 1,
            }
        }

        if counters.inserted > 0 {
            if let Err(e) = self.writer.store().refresh_views().await {
                warn!(source = source_key, error = %e, "View refresh failed");
            }
        }

        let finished_at = Utc::now();
        let next_run_at = finished_at + Duration::minutes(source.cadence_minutes as i64);
        if let Err(e) = self.tracking.mark_success(source_key, finished_at, next_run_at).await {
            error!(source = source_key, error = %e, "Failed to mark source success");
        }

        let entry = HealthEntry {
            source: source_key.to_string(),
            status: RunStatus::Ok,
            fetched: counters.fetched,
            accepted: counters.accepted,
            inserted: counters.inserted,
            duplicates: counters.duplicates,
            write_errors: counters.write_errors,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            error: String::new(),
            last_run: finished_at,
        };
        self.record(&entry, started_at, serde_json::json!({"cadence_minutes": source.cadence_minutes}))
            .await;

        info!(
            source = source_key,
            fetched = entry.fetched,
            accepted = entry.accepted,
            inserted = entry.inserted,
            duplicates = entry.duplicates,
            "Source run complete"
        );
        entry
    }

    /// Lock contention path: not an error, just a short reschedule.
    async fn finish_skipped_lock(&self, source_key: &str, started_at: DateTime<Utc>) -> HealthEntry {
        let finished_at = Utc::now();
        if let Err(e) = self.tracking.ensure_state(source_key).await {
            error!(source = source_key, error = %e, "Failed to ensure source state");
        }
        if let Err(e) = self
            .tracking
            .set_next_run(source_key, finished_at + Duration::minutes(1))
            .await
        {
            error!(source = source_key, error = %e, "Failed to reschedule after lock skip");
        }

        let entry = HealthEntry {
            source: source_key.to_string(),
            status: RunStatus::SkippedLock,
            fetched: 0,
            accepted: 0,
            inserted: 0,
            duplicates: 0,
            write_errors: 0,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            error: String::new(),
            last_run: finished_at,
        };
        self.record(&entry, started_at, serde_json::json!({"reason": "lock_held"})).await;
        info!(source = source_key, "Skipped run, lock held elsewhere");
        entry
    }

    /// Failure path: bump the failure counter and back off exponentially.
    async fn finish_error(
        &self,
        source_key: &str,
        started_at: DateTime<Utc>,
        error_text: &str,
        fetched: u32,
        cadence_minutes: u32,
    ) -> HealthEntry {
        let finished_at = Utc::now();
        let stored_error = truncate_error(error_text);

        if let Err(e) = self.tracking.ensure_state(source_key).await {
            error!(source = source_key, error = %e, "Failed to ensure source state");
        }
        let failures = match self.tracking.mark_failure(source_key, finished_at, &stored_error).await
        {
            Ok(failures) => failures,
            Err(e) => {
                error!(source = source_key, error = %e, "Failed to mark source failure");
                1
            }
        };
        let next_run_at =
            finished_at + Duration::minutes(backoff_minutes(cadence_minutes, failures));
        if let Err(e) = self.tracking.set_next_run(source_key, next_run_at).await {
            error!(source = source_key, error = %e, "Failed to set backoff schedule");
        }

        let entry = HealthEntry {
            source: source_key.to_string(),
            status: RunStatus::Error,
            fetched,
            accepted: 0,
            inserted: 0,
            duplicates: 0,
            write_errors: 0,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            error: stored_error,
            last_run: finished_at,
        };
        self.record(
            &entry,
            started_at,
            serde_json::json!({"consecutive_failures": failures}),
        )
        .await;

        warn!(source = source_key, failures, error = %entry.error, "Source run failed");
        entry
    }

    async fn record(&self, entry: &HealthEntry, started_at: DateTime<Utc>, details: serde_json::Value) {
        let run = NewSourceRun {
            source_key: entry.source.clone(),
            status: entry.status,
            started_at,
            finished_at: entry.last_run,
            fetched: entry.fetched,
            accepted: entry.accepted,
            inserted: entry.inserted,
            duplicates: entry.duplicates,
            write_errors: entry.write_errors,
            error: entry.error.clone(),
            details,
        };
        if let Err(e) = self.tracking.record_run(&run).await {
            error!(source = %entry.source, error = %e, "Failed to record source run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_ttl_has_a_floor_and_scales_with_cadence() {
        // Ten-minute floor for fast cadences.
        assert_eq!(lock_ttl_secs(1), 600);
        assert_eq!(lock_ttl_secs(5), 600);
        // 120 seconds per cadence minute beyond that.
        assert_eq!(lock_ttl_secs(30), 3600);
        assert_eq!(lock_ttl_secs(60), 7200);
    }

    #[test]
    fn backoff_doubles_per_failure() {
        // cadence 30m: 60, 120, 240 for the first three failures.
        assert_eq!(backoff_minutes(30, 1), 60);
        assert_eq!(backoff_minutes(30, 2), 120);
        assert_eq!(backoff_minutes(30, 3), 240);
    }

    #[test]
    fn backoff_multiplier_caps_at_sixteen_and_six_hours() {
        // Exponent saturates at 4.
        assert_eq!(backoff_minutes(10, 4), 160);
        assert_eq!(backoff_minutes(10, 9), 160);
        // And the absolute cap is 360 minutes no matter what.
        assert_eq!(backoff_minutes(30, 4), 360);
        assert_eq!(backoff_minutes(60, 12), 360);
    }

    #[test]
    fn stored_errors_are_truncated() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_error(&long).len(), 500);
        assert_eq!(truncate_error("short"), "short");
    }
}
