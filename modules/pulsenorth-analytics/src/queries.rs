//! Shared count/group-by queries over `ai_developments`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub async fn count_since(pool: &PgPool, since: DateTime<Utc>) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ai_developments WHERE published_at >= $1")
            .bind(since)
            .fetch_one(pool)
            .await
            .context("Count query failed")?;
    Ok(count)
}

pub async fn count_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ai_developments WHERE published_at >= $1 AND published_at < $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .context("Count query failed")?;
    Ok(count)
}

/// Per-category counts for a half-open interval.
pub async fn category_counts_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT category, COUNT(*)
        FROM ai_developments
        WHERE published_at >= $1 AND published_at < $2
        GROUP BY category
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .context("Category count query failed")?;
    Ok(rows.into_iter().collect())
}

/// Top-N counts grouped by one column. The column name comes from a fixed
/// internal set, never from user input.
pub async fn grouped_counts(
    pool: &PgPool,
    column: &str,
    since: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<(String, i64)>> {
    let mut sql = format!(
        "SELECT {column}, COUNT(*) AS count FROM ai_developments \
         WHERE published_at >= $1 GROUP BY {column} ORDER BY count DESC"
    );
    if limit.is_some() {
        sql.push_str(" LIMIT $2");
    }
    let query = sqlx::query_as::<_, (String, i64)>(&sql).bind(since);
    let rows = match limit {
        Some(n) => query.bind(n).fetch_all(pool).await,
        None => query.fetch_all(pool).await,
    }
    .context("Grouped count query failed")?;
    Ok(rows)
}

/// Like `grouped_counts` but over a half-open interval.
pub async fn grouped_counts_between(
    pool: &PgPool,
    column: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<(String, i64)>> {
    let mut sql = format!(
        "SELECT {column}, COUNT(*) AS count FROM ai_developments \
         WHERE published_at >= $1 AND published_at < $2 GROUP BY {column} ORDER BY count DESC"
    );
    if limit.is_some() {
        sql.push_str(" LIMIT $3");
    }
    let query = sqlx::query_as::<_, (String, i64)>(&sql).bind(start).bind(end);
    let rows = match limit {
        Some(n) => query.bind(n).fetch_all(pool).await,
        None => query.fetch_all(pool).await,
    }
    .context("Grouped count query failed")?;
    Ok(rows)
}

/// Entity counts unnested from the JSONB array.
pub async fn entity_counts_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT entity_name AS name, COUNT(*) AS count
        FROM ai_developments,
        LATERAL jsonb_array_elements_text(COALESCE(entities, '[]'::jsonb)) AS entity_name
        WHERE published_at >= $1
          AND published_at < $2
          AND entity_name <> ''
        GROUP BY entity_name
        ORDER BY count DESC
        LIMIT $3
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Entity count query failed")?;
    Ok(rows)
}

/// Tag counts unnested from the string array.
pub async fn tag_counts_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT tag_name AS name, COUNT(*) AS count
        FROM ai_developments,
        LATERAL unnest(COALESCE(tags, ARRAY[]::text[])) AS tag_name
        WHERE published_at >= $1
          AND tag_name <> ''
        GROUP BY tag_name
        ORDER BY count DESC
        LIMIT $2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Tag count query failed")?;
    Ok(rows)
}
