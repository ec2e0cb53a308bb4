//! Stacked hourly and weekly timeseries in the ECharts envelope the
//! dashboard consumes. The materialized views are preferred; if a view
//! read fails the direct aggregation fallback yields the same buckets,
//! category order, and zero-fill.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;

use pulsenorth_common::types::Category;

#[derive(Debug, Clone, Serialize)]
pub struct EchartsSeries {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(rename = "areaStyle", skip_serializing_if = "Option::is_none")]
    pub area_style: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emphasis: Option<serde_json::Value>,
    pub data: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EchartsTimeseriesResponse {
    pub legend: Vec<String>,
    #[serde(rename = "xAxis")]
    pub x_axis: Vec<String>,
    pub series: Vec<EchartsSeries>,
}

async fn hourly_rows(pool: &PgPool, since: DateTime<Utc>) -> Vec<(DateTime<Utc>, String, i64)> {
    let view_result: Result<Vec<(DateTime<Utc>, String, i64)>, sqlx::Error> = async {
        sqlx::query("REFRESH MATERIALIZED VIEW hourly_stats").execute(pool).await?;
        sqlx::query_as(
            r#"
            SELECT bucket, category, SUM(item_count)::bigint AS item_count
            FROM hourly_stats
            GROUP BY bucket, category
            ORDER BY bucket
            "#,
        )
        .fetch_all(pool)
        .await
    }
    .await;

    match view_result {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "hourly_stats view unavailable, aggregating directly");
            sqlx::query_as(
                r#"
                SELECT date_trunc('hour', published_at) AS bucket, category, COUNT(*) AS item_count
                FROM ai_developments
                WHERE published_at >= $1
                GROUP BY bucket, category
                ORDER BY bucket
                "#,
            )
            .bind(since)
            .fetch_all(pool)
            .await
            .unwrap_or_default()
        }
    }
}

async fn weekly_rows(pool: &PgPool, since: DateTime<Utc>) -> Vec<(DateTime<Utc>, String, i64)> {
    let view_result: Result<Vec<(DateTime<Utc>, String, i64)>, sqlx::Error> = async {
        sqlx::query("REFRESH MATERIALIZED VIEW weekly_stats").execute(pool).await?;
        sqlx::query_as(
            r#"
            SELECT bucket, category, item_count::bigint
            FROM weekly_stats
            ORDER BY bucket
            "#,
        )
        .fetch_all(pool)
        .await
    }
    .await;

    match view_result {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "weekly_stats view unavailable, aggregating directly");
            sqlx::query_as(
                r#"
                SELECT date_trunc('week', published_at) AS bucket, category, COUNT(*) AS item_count
                FROM ai_developments
                WHERE published_at >= $1
                GROUP BY bucket, category
                ORDER BY bucket
                "#,
            )
            .bind(since)
            .fetch_all(pool)
            .await
            .unwrap_or_default()
        }
    }
}

/// Fold rows into a category × label matrix.
fn label_matrix(
    rows: Vec<(DateTime<Utc>, String, i64)>,
    format: &str,
) -> HashMap<String, HashMap<String, i64>> {
    let mut matrix: HashMap<String, HashMap<String, i64>> = HashMap::new();
    for (bucket, category, count) in rows {
        let label = bucket.format(format).to_string();
        *matrix.entry(category).or_default().entry(label).or_insert(0) += count;
    }
    matrix
}

fn build_series(
    matrix: &HashMap<String, HashMap<String, i64>>,
    labels: &[String],
    kind: &str,
    area: bool,
) -> Vec<EchartsSeries> {
    Category::ALL
        .iter()
        .map(|category| {
            let by_label = matrix.get(category.as_str());
            EchartsSeries {
                name: category.as_str().to_string(),
                kind: kind.to_string(),
                stack: Some("total".to_string()),
                area_style: area.then(|| serde_json::json!({})),
                emphasis: Some(serde_json::json!({"focus": "series"})),
                data: labels
                    .iter()
                    .map(|label| {
                        by_label.and_then(|m| m.get(label)).copied().unwrap_or(0)
                    })
                    .collect(),
            }
        })
        .collect()
}

/// 24 hour buckets × category, stacked area.
pub async fn fetch_hourly_timeseries(pool: &PgPool) -> Result<EchartsTimeseriesResponse> {
    let now = Utc::now();
    let since = now - Duration::hours(24);
    let rows = hourly_rows(pool, since).await;

    let start = since
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(since);
    let labels: Vec<String> = (0..24)
        .map(|i| (start + Duration::hours(i)).format("%H:%M").to_string())
        .collect();

    let matrix = label_matrix(rows, "%H:%M");
    Ok(EchartsTimeseriesResponse {
        legend: Category::ALL.iter().map(|c| c.as_str().to_string()).collect(),
        series: build_series(&matrix, &labels, "line", true),
        x_axis: labels,
    })
}

/// 12 week buckets × category, stacked bars. Weeks start Monday to match
/// the view's `date_trunc('week', …)`.
pub async fn fetch_weekly_timeseries(pool: &PgPool) -> Result<EchartsTimeseriesResponse> {
    let now = Utc::now();
    let since = now - Duration::weeks(12);
    let rows = weekly_rows(pool, since).await;

    let week_start = since - Duration::days(since.weekday().num_days_from_monday() as i64);
    let start = week_start
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(week_start);
    let labels: Vec<String> = (0..12)
        .map(|i| (start + Duration::weeks(i)).format("%Y-%m-%d").to_string())
        .collect();

    let matrix = label_matrix(rows, "%Y-%m-%d");
    Ok(EchartsTimeseriesResponse {
        legend: Category::ALL.iter().map(|c| c.as_str().to_string()).collect(),
        series: build_series(&matrix, &labels, "bar", false),
        x_axis: labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn matrix_folds_rows_by_label() {
        let t = Utc.with_ymd_and_hms(2026, 2, 17, 9, 0, 0).unwrap();
        let rows = vec![
            (t, "policy".to_string(), 3),
            (t, "policy".to_string(), 2),
            (t, "news".to_string(), 1),
        ];
        let matrix = label_matrix(rows, "%H:%M");
        assert_eq!(matrix["policy"]["09:00"], 5);
        assert_eq!(matrix["news"]["09:00"], 1);
    }

    #[test]
    fn series_zero_fill_and_category_order() {
        let labels = vec!["09:00".to_string(), "10:00".to_string()];
        let mut matrix: HashMap<String, HashMap<String, i64>> = HashMap::new();
        matrix
            .entry("research".to_string())
            .or_default()
            .insert("10:00".to_string(), 7);

        let series = build_series(&matrix, &labels, "line", true);
        assert_eq!(series.len(), 6);
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["policy", "research", "industry", "funding", "news", "incidents"]);
        assert_eq!(series[1].data, vec![0, 7]);
        assert_eq!(series[0].data, vec![0, 0]);
        assert!(series[0].area_style.is_some());
    }
}
