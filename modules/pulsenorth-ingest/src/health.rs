//! Composite source-health snapshot cached in the coordination store.
//! Merges are idempotent on the source key; the skipped-lock counter only
//! ever grows within a snapshot's life.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use pulsenorth_common::types::{HealthEntry, RunStatus};
use pulsenorth_coord::{CoordClient, SOURCE_HEALTH_KEY};

#[derive(Clone)]
pub struct HealthStore {
    coord: CoordClient,
}

/// Merge new run entries into an existing snapshot value. Pure so the
/// read-modify-write cycle is testable without Redis.
pub fn merge_snapshot(existing: Option<Value>, entries: &[HealthEntry]) -> Value {
    let mut sources: Vec<Value> = existing
        .as_ref()
        .and_then(|snapshot| snapshot["sources"].as_array().cloned())
        .unwrap_or_default();
    let mut skipped_lock_count = existing
        .as_ref()
        .and_then(|snapshot| snapshot["skipped_lock_count"].as_i64())
        .unwrap_or(0);

    for entry in entries {
        if entry.status == RunStatus::SkippedLock {
            skipped_lock_count += 1;
        }
        let row = json!({
            "source": entry.source,
            "status": entry.status.as_str(),
            "fetched": entry.fetched,
            "accepted": entry.accepted,
            "inserted": entry.inserted,
            "duplicates": entry.duplicates,
            "write_errors": entry.write_errors,
            "duration_ms": entry.duration_ms,
            "error": entry.error,
            "last_run": entry.last_run.to_rfc3339(),
        });
        match sources
            .iter_mut()
            .find(|row| row["source"].as_str() == Some(entry.source.as_str()))
        {
            Some(slot) => *slot = row,
            None => sources.push(row),
        }
    }

    let inserted_total: i64 =
        sources.iter().filter_map(|row| row["inserted"].as_i64()).sum();
    let candidates_total: i64 =
        sources.iter().filter_map(|row| row["accepted"].as_i64()).sum();

    json!({
        "updated_at": Utc::now().to_rfc3339(),
        "run_status": "ok",
        "sources": sources,
        "inserted_total": inserted_total,
        "candidates_total": candidates_total,
        "skipped_lock_count": skipped_lock_count,
    })
}

impl HealthStore {
    pub fn new(coord: CoordClient) -> Self {
        Self { coord }
    }

    /// Fold entries into the cached snapshot (last write wins).
    pub async fn merge(&self, entries: &[HealthEntry]) {
        if entries.is_empty() {
            return;
        }
        let existing = match self.coord.get_json(SOURCE_HEALTH_KEY).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(error = %e, "Failed to read health snapshot, starting fresh");
                None
            }
        };
        let snapshot = merge_snapshot(existing, entries);
        if let Err(e) = self.coord.set_json(SOURCE_HEALTH_KEY, &snapshot).await {
            warn!(error = %e, "Failed to write health snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, status: RunStatus, inserted: u32, accepted: u32) -> HealthEntry {
        HealthEntry {
            source: source.to_string(),
            status,
            fetched: accepted,
            accepted,
            inserted,
            duplicates: 0,
            write_errors: 0,
            duration_ms: 12,
            error: String::new(),
            last_run: Utc::now(),
        }
    }

    #[test]
    fn merge_is_idempotent_on_source_key() {
        let first = merge_snapshot(None, &[entry("openalex", RunStatus::Ok, 3, 5)]);
        assert_eq!(first["sources"].as_array().unwrap().len(), 1);
        assert_eq!(first["inserted_total"], 3);

        // Re-merging the same source replaces its row, never duplicates it.
        let second =
            merge_snapshot(Some(first), &[entry("openalex", RunStatus::Ok, 1, 2)]);
        assert_eq!(second["sources"].as_array().unwrap().len(), 1);
        assert_eq!(second["inserted_total"], 1);
        assert_eq!(second["candidates_total"], 2);
    }

    #[test]
    fn skipped_lock_count_is_monotonic() {
        let first =
            merge_snapshot(None, &[entry("betakit_ai", RunStatus::SkippedLock, 0, 0)]);
        assert_eq!(first["skipped_lock_count"], 1);
        let second = merge_snapshot(
            Some(first),
            &[entry("betakit_ai", RunStatus::SkippedLock, 0, 0)],
        );
        assert_eq!(second["skipped_lock_count"], 2);
        // Non-skip entries never decrement the counter.
        let third = merge_snapshot(Some(second), &[entry("betakit_ai", RunStatus::Ok, 1, 1)]);
        assert_eq!(third["skipped_lock_count"], 2);
    }

    #[test]
    fn totals_sum_across_sources() {
        let snapshot = merge_snapshot(
            None,
            &[
                entry("a", RunStatus::Ok, 2, 4),
                entry("b", RunStatus::Ok, 3, 6),
            ],
        );
        assert_eq!(snapshot["inserted_total"], 5);
        assert_eq!(snapshot["candidates_total"], 10);
        assert_eq!(snapshot["run_status"], "ok");
    }
}
