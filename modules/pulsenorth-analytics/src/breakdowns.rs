//! Top-N breakdowns by publisher, source type, jurisdiction, entity, and
//! tag, plus the coverage profile.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::queries::{
    count_since, entity_counts_between, grouped_counts, tag_counts_since,
};
use crate::windows::{round2, TimeWindow};

fn named_counts(rows: &[(String, i64)]) -> Vec<Value> {
    rows.iter()
        .map(|(name, count)| json!({"name": name, "count": count}))
        .collect()
}

pub async fn fetch_sources_breakdown(
    pool: &PgPool,
    window: TimeWindow,
    limit: i64,
) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;
    let publishers =
        grouped_counts(pool, "publisher", since, Some(limit.clamp(1, 20))).await?;
    let source_types = grouped_counts(pool, "source_type", since, None).await?;

    Ok(json!({
        "time_window": window.as_str(),
        "total": total,
        "publishers": named_counts(&publishers),
        "source_types": named_counts(&source_types),
    }))
}

pub async fn fetch_jurisdictions_breakdown(
    pool: &PgPool,
    window: TimeWindow,
    limit: i64,
) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;
    let jurisdictions =
        grouped_counts(pool, "jurisdiction", since, Some(limit.clamp(1, 25))).await?;

    Ok(json!({
        "time_window": window.as_str(),
        "total": total,
        "jurisdictions": named_counts(&jurisdictions),
    }))
}

pub async fn fetch_entities_breakdown(
    pool: &PgPool,
    window: TimeWindow,
    limit: i64,
) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;
    let entities = entity_counts_between(pool, since, now, limit.clamp(1, 30)).await?;

    Ok(json!({
        "time_window": window.as_str(),
        "total": total,
        "entities": named_counts(&entities),
    }))
}

pub async fn fetch_tags_breakdown(pool: &PgPool, window: TimeWindow, limit: i64) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;
    let tags = tag_counts_since(pool, since, limit.clamp(1, 30)).await?;

    Ok(json!({
        "time_window": window.as_str(),
        "total": total,
        "tags": named_counts(&tags),
    }))
}

/// Categories, source types, languages, and jurisdictions with percents.
pub async fn fetch_coverage(pool: &PgPool, window: TimeWindow, limit: i64) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let bounded = limit.clamp(1, 20);
    let total = count_since(pool, since).await?;

    let categories = grouped_counts(pool, "category", since, None).await?;
    let source_types = grouped_counts(pool, "source_type", since, None).await?;
    let languages = grouped_counts(pool, "language", since, Some(bounded)).await?;
    let jurisdictions = grouped_counts(pool, "jurisdiction", since, Some(bounded)).await?;

    let pct = |count: i64| round2(count as f64 / total.max(1) as f64 * 100.0);
    let with_pct = |rows: &[(String, i64)]| -> Vec<Value> {
        rows.iter()
            .map(|(name, count)| json!({"name": name, "count": count, "percent": pct(*count)}))
            .collect()
    };

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "total": total,
        "categories": with_pct(&categories),
        "source_types": with_pct(&source_types),
        "languages": with_pct(&languages),
        "jurisdictions": with_pct(&jurisdictions),
    }))
}
