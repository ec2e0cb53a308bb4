//! Confidence profile and Canada/global scope comparison.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::queries::count_since;
use crate::windows::{round2, round4, TimeWindow};

/// Bucket counts at fixed confidence thresholds, with percents.
pub async fn fetch_confidence_profile(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;

    let avg: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(confidence) FROM ai_developments WHERE published_at >= $1",
    )
    .bind(since)
    .fetch_one(pool)
    .await
    .context("Confidence average failed")?;

    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT
          CASE
            WHEN confidence >= 0.85 THEN 'very_high'
            WHEN confidence >= 0.70 THEN 'high'
            WHEN confidence >= 0.50 THEN 'medium'
            ELSE 'low'
          END AS bucket,
          COUNT(*) AS count
        FROM ai_developments
        WHERE published_at >= $1
        GROUP BY bucket
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
    .context("Confidence bucket query failed")?;

    let counts: BTreeMap<String, i64> = rows.into_iter().collect();
    let count_of = |name: &str| counts.get(name).copied().unwrap_or(0);
    let pct = |count: i64| round2(count as f64 / total.max(1) as f64 * 100.0);
    let bucket = |name: &str| {
        let count = count_of(name);
        json!({"name": name, "count": count, "percent": pct(count)})
    };

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "total": total,
        "average_confidence": round4(avg.unwrap_or(0.0)),
        "buckets": [bucket("very_high"), bucket("high"), bucket("medium"), bucket("low")],
    }))
}

/// Split the current window into canada / global / other, with a per-category
/// canada-vs-global table. `other` is whatever total the two named scopes do
/// not account for (province rows land there even though they are Canadian —
/// kept for dashboard compatibility). Categories are sorted lexically;
/// callers must not assume numeric ordering.
pub async fn fetch_scope_compare(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;

    let scope_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT jurisdiction, COUNT(*)
        FROM ai_developments
        WHERE published_at >= $1
        GROUP BY jurisdiction
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
    .context("Scope query failed")?;

    let canada: i64 = scope_rows
        .iter()
        .filter(|(j, _)| j.to_lowercase() == "canada")
        .map(|(_, c)| *c)
        .sum();
    let global: i64 = scope_rows
        .iter()
        .filter(|(j, _)| j.to_lowercase() == "global")
        .map(|(_, c)| *c)
        .sum();
    let other = (total - canada - global).max(0);

    let category_rows: Vec<(String, String, i64)> = sqlx::query_as(
        r#"
        SELECT category, jurisdiction, COUNT(*)
        FROM ai_developments
        WHERE published_at >= $1
        GROUP BY category, jurisdiction
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
    .context("Scope category query failed")?;

    let mut by_category: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for (category, jurisdiction, count) in category_rows {
        let entry = by_category.entry(category).or_insert((0, 0));
        match jurisdiction.to_lowercase().as_str() {
            "canada" => entry.0 += count,
            "global" => entry.1 += count,
            _ => {}
        }
    }

    let categories: Vec<Value> = by_category
        .iter()
        .map(|(name, (canada, global))| {
            json!({"name": name, "canada": canada, "global": global})
        })
        .collect();

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "total": total,
        "canada": canada,
        "global": global,
        "other": other,
        "categories": categories,
    }))
}
