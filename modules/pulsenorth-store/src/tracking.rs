//! Per-source ingest state and append-only run history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use pulsenorth_common::types::RunStatus;

/// One row per source key. Updated in place by the ingest runner.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SourceState {
    pub source_key: String,
    pub cursor: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub consecutive_failures: i32,
    pub last_error: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of one source run.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SourceRun {
    pub id: Uuid,
    pub source_key: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i32,
    pub fetched: i32,
    pub accepted: i32,
    pub inserted: i32,
    pub duplicates: i32,
    pub write_errors: i32,
    pub error: String,
    pub details: sqlx::types::Json<serde_json::Value>,
}

/// Counters and context for a run about to be recorded.
#[derive(Debug, Clone)]
pub struct NewSourceRun {
    pub source_key: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: u32,
    pub accepted: u32,
    pub inserted: u32,
    pub duplicates: u32,
    pub write_errors: u32,
    pub error: String,
    pub details: serde_json::Value,
}

#[derive(Clone)]
pub struct TrackingStore {
    pool: PgPool,
}

impl TrackingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Make sure a state row exists for the key; no-op when it already does.
    pub async fn ensure_state(&self, source_key: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO source_states (source_key) VALUES ($1) ON CONFLICT (source_key) DO NOTHING",
        )
        .bind(source_key)
        .execute(&self.pool)
        .await
        .context("Failed to ensure source state")?;
        Ok(())
    }

    pub async fn get_state(&self, source_key: &str) -> Result<Option<SourceState>> {
        let row = sqlx::query_as::<_, SourceState>(
            "SELECT * FROM source_states WHERE source_key = $1",
        )
        .bind(source_key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load source state")?;
        Ok(row)
    }

    pub async fn list_states(&self) -> Result<Vec<SourceState>> {
        let rows = sqlx::query_as::<_, SourceState>(
            "SELECT * FROM source_states ORDER BY source_key",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list source states")?;
        Ok(rows)
    }

    /// Successful run: stamp success, clear error fields, reset the failure
    /// counter, and schedule the next run.
    pub async fn mark_success(
        &self,
        source_key: &str,
        now: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE source_states
            SET last_success_at = $2,
                last_error = NULL,
                last_error_at = NULL,
                consecutive_failures = 0,
                next_run_at = $3,
                updated_at = NOW()
            WHERE source_key = $1
            "#,
        )
        .bind(source_key)
        .bind(now)
        .bind(next_run_at)
        .execute(&self.pool)
        .await
        .context("Failed to mark source success")?;
        Ok(())
    }

    /// Failed run: bump the failure counter and store the truncated error.
    /// Returns the new consecutive failure count so the caller can compute
    /// the backoff window.
    pub async fn mark_failure(
        &self,
        source_key: &str,
        now: DateTime<Utc>,
        error: &str,
    ) -> Result<i32> {
        let failures: i32 = sqlx::query_scalar(
            r#"
            UPDATE source_states
            SET consecutive_failures = consecutive_failures + 1,
                last_error_at = $2,
                last_error = $3,
                updated_at = NOW()
            WHERE source_key = $1
            RETURNING consecutive_failures
            "#,
        )
        .bind(source_key)
        .bind(now)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark source failure")?;
        Ok(failures)
    }

    pub async fn set_next_run(&self, source_key: &str, next_run_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE source_states SET next_run_at = $2, updated_at = NOW() WHERE source_key = $1",
        )
        .bind(source_key)
        .bind(next_run_at)
        .execute(&self.pool)
        .await
        .context("Failed to set next run")?;
        Ok(())
    }

    /// Append one run to the history.
    pub async fn record_run(&self, run: &NewSourceRun) -> Result<()> {
        let duration_ms = (run.finished_at - run.started_at).num_milliseconds().max(0) as i32;
        sqlx::query(
            r#"
            INSERT INTO source_runs
                (id, source_key, status, started_at, finished_at, duration_ms,
                 fetched, accepted, inserted, duplicates, write_errors, error, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&run.source_key)
        .bind(run.status.as_str())
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(duration_ms)
        .bind(run.fetched as i32)
        .bind(run.accepted as i32)
        .bind(run.inserted as i32)
        .bind(run.duplicates as i32)
        .bind(run.write_errors as i32)
        .bind(&run.error)
        .bind(sqlx::types::Json(&run.details))
        .execute(&self.pool)
        .await
        .context("Failed to record source run")?;
        Ok(())
    }

    /// Recent runs, newest first, optionally scoped to one source.
    pub async fn recent_runs(
        &self,
        source: Option<&str>,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SourceRun>> {
        let rows = match source {
            Some(key) => {
                sqlx::query_as::<_, SourceRun>(
                    r#"
                    SELECT * FROM source_runs
                    WHERE started_at >= $1 AND source_key = $2
                    ORDER BY started_at DESC
                    LIMIT $3
                    "#,
                )
                .bind(since)
                .bind(key)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, SourceRun>(
                    r#"
                    SELECT * FROM source_runs
                    WHERE started_at >= $1
                    ORDER BY started_at DESC
                    LIMIT $2
                    "#,
                )
                .bind(since)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to load source runs")?;
        Ok(rows)
    }
}
