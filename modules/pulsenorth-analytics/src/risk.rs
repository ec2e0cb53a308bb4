//! Composite risk index and its per-bucket trend.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Months, Timelike, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::alerts::{fetch_alerts, AlertThresholds};
use crate::concentration::fetch_concentration;
use crate::queries::count_since;
use crate::windows::{round2, round4, TimeWindow};

/// Composite score over incident share, low-confidence share, concentration,
/// and high-severity alert pressure, clamped to [0, 100].
pub fn risk_score(
    incidents_ratio: f64,
    low_confidence_ratio: f64,
    combined_hhi: f64,
    high_alert_count: usize,
) -> f64 {
    let raw = incidents_ratio * 35.0
        + low_confidence_ratio * 25.0
        + combined_hhi * 40.0
        + (high_alert_count as f64 * 5.0).min(20.0);
    round2(raw).clamp(0.0, 100.0)
}

pub fn risk_level(score: f64) -> &'static str {
    if score >= 70.0 {
        "high"
    } else if score >= 40.0 {
        "medium"
    } else {
        "low"
    }
}

/// Machine-readable contributing factors; never empty.
pub fn risk_reasons(
    incidents_ratio: f64,
    low_confidence_ratio: f64,
    combined_hhi: f64,
    high_alert_count: usize,
) -> Vec<&'static str> {
    let mut reasons = Vec::new();
    if incidents_ratio >= 0.08 {
        reasons.push("incident_ratio_elevated");
    }
    if low_confidence_ratio >= 0.15 {
        reasons.push("low_confidence_share_elevated");
    }
    if combined_hhi >= 0.4 {
        reasons.push("signal_concentration_high");
    }
    if high_alert_count >= 2 {
        reasons.push("multiple_high_alerts");
    }
    if reasons.is_empty() {
        reasons.push("stable_signal_profile");
    }
    reasons
}

pub async fn fetch_risk_index(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();

    let total = count_since(pool, since).await?;
    let incidents: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ai_developments WHERE published_at >= $1 AND category = 'incidents'",
    )
    .bind(since)
    .fetch_one(pool)
    .await
    .context("Incident count failed")?;
    let low_confidence: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ai_developments WHERE published_at >= $1 AND confidence < 0.5",
    )
    .bind(since)
    .fetch_one(pool)
    .await
    .context("Low-confidence count failed")?;

    let incidents_ratio = incidents as f64 / total.max(1) as f64;
    let low_confidence_ratio = low_confidence as f64 / total.max(1) as f64;

    let concentration = fetch_concentration(pool, window).await?;
    let combined_hhi = concentration["combined_hhi"].as_f64().unwrap_or(0.0);
    let alerts = fetch_alerts(pool, window, AlertThresholds::default()).await?;
    let high_alert_count = alerts.alerts.iter().filter(|a| a.severity == "high").count();

    let score = risk_score(incidents_ratio, low_confidence_ratio, combined_hhi, high_alert_count);

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "score": score,
        "level": risk_level(score),
        "total": total,
        "incidents": incidents,
        "low_confidence": low_confidence,
        "high_alert_count": high_alert_count,
        "incidents_ratio": round4(incidents_ratio),
        "low_confidence_ratio": round4(low_confidence_ratio),
        "combined_hhi": round4(combined_hhi),
        "reasons": risk_reasons(incidents_ratio, low_confidence_ratio, combined_hhi, high_alert_count),
    }))
}

// --- Trend bucketing ---

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Fixed(Duration),
    Month,
}

#[derive(Debug, Clone, Copy)]
struct TrendShape {
    steps: usize,
    step: Step,
    label_format: &'static str,
    /// The SQL date_trunc unit the group-by query uses.
    trunc_unit: &'static str,
}

fn trend_shape(window: TimeWindow) -> TrendShape {
    match window {
        TimeWindow::H1 => TrendShape {
            steps: 12,
            step: Step::Fixed(Duration::minutes(5)),
            label_format: "%H:%M",
            trunc_unit: "minute",
        },
        TimeWindow::H24 => TrendShape {
            steps: 24,
            step: Step::Fixed(Duration::hours(1)),
            label_format: "%H:%M",
            trunc_unit: "hour",
        },
        TimeWindow::D7 => TrendShape {
            steps: 7,
            step: Step::Fixed(Duration::days(1)),
            label_format: "%Y-%m-%d",
            trunc_unit: "day",
        },
        TimeWindow::D90 => TrendShape {
            steps: 13,
            step: Step::Fixed(Duration::weeks(1)),
            label_format: "%Y-%m-%d",
            trunc_unit: "week",
        },
        TimeWindow::Y1 => TrendShape {
            steps: 12,
            step: Step::Month,
            label_format: "%Y-%m",
            trunc_unit: "month",
        },
        TimeWindow::Y2 => TrendShape {
            steps: 24,
            step: Step::Month,
            label_format: "%Y-%m",
            trunc_unit: "month",
        },
        TimeWindow::Y5 => TrendShape {
            steps: 60,
            step: Step::Month,
            label_format: "%Y-%m",
            trunc_unit: "month",
        },
        TimeWindow::D30 => TrendShape {
            steps: 30,
            step: Step::Fixed(Duration::days(1)),
            label_format: "%Y-%m-%d",
            trunc_unit: "day",
        },
    }
}

/// Align the window start to its bucket grid.
fn trend_start(since: DateTime<Utc>, shape: TrendShape) -> DateTime<Utc> {
    let zeroed = since.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(since);
    match shape.trunc_unit {
        "minute" => zeroed,
        "hour" => zeroed.with_minute(0).unwrap_or(zeroed),
        "day" => zeroed.with_minute(0).and_then(|t| t.with_hour(0)).unwrap_or(zeroed),
        "week" => {
            let day = zeroed.with_minute(0).and_then(|t| t.with_hour(0)).unwrap_or(zeroed);
            day - Duration::days(day.weekday().num_days_from_monday() as i64)
        }
        "month" => zeroed
            .with_minute(0)
            .and_then(|t| t.with_hour(0))
            .and_then(|t| t.with_day(1))
            .unwrap_or(zeroed),
        _ => zeroed,
    }
}

fn bucket_start(start: DateTime<Utc>, shape: TrendShape, index: usize) -> DateTime<Utc> {
    match shape.step {
        Step::Fixed(step) => start + step * index as i32,
        Step::Month => start
            .checked_add_months(Months::new(index as u32))
            .unwrap_or(start),
    }
}

/// Which bucket a truncated timestamp falls into, if any.
fn bucket_index(t: DateTime<Utc>, start: DateTime<Utc>, shape: TrendShape) -> Option<usize> {
    if t < start {
        return None;
    }
    let index = match shape.step {
        Step::Fixed(step) => {
            ((t - start).num_seconds() / step.num_seconds().max(1)) as usize
        }
        Step::Month => {
            let months =
                (t.year() - start.year()) * 12 + t.month() as i32 - start.month() as i32;
            if months < 0 {
                return None;
            }
            months as usize
        }
    };
    (index < shape.steps).then_some(index)
}

async fn bucket_counts(
    pool: &PgPool,
    unit: &str,
    since: DateTime<Utc>,
    extra_clause: &str,
) -> Result<Vec<(DateTime<Utc>, i64)>> {
    let sql = format!(
        "SELECT date_trunc('{unit}', published_at) AS bucket, COUNT(*) AS total \
         FROM ai_developments WHERE published_at >= $1{extra_clause} \
         GROUP BY bucket ORDER BY bucket"
    );
    sqlx::query_as::<_, (DateTime<Utc>, i64)>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await
        .context("Trend bucket query failed")
}

/// Per-bucket risk over the window: `clamp(100·(ir·0.6 + lr·0.4), 0..100)`.
pub async fn fetch_risk_trend(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let shape = trend_shape(window);
    let start = trend_start(since, shape);

    let totals = bucket_counts(pool, shape.trunc_unit, since, "").await?;
    let incidents =
        bucket_counts(pool, shape.trunc_unit, since, " AND category = 'incidents'").await?;
    let low_conf = bucket_counts(pool, shape.trunc_unit, since, " AND confidence < 0.5").await?;

    let mut total_by_bucket = vec![0i64; shape.steps];
    let mut incidents_by_bucket = vec![0i64; shape.steps];
    let mut low_conf_by_bucket = vec![0i64; shape.steps];
    for (t, count) in totals {
        if let Some(i) = bucket_index(t, start, shape) {
            total_by_bucket[i] += count;
        }
    }
    for (t, count) in incidents {
        if let Some(i) = bucket_index(t, start, shape) {
            incidents_by_bucket[i] += count;
        }
    }
    for (t, count) in low_conf {
        if let Some(i) = bucket_index(t, start, shape) {
            low_conf_by_bucket[i] += count;
        }
    }

    let mut labels = Vec::with_capacity(shape.steps);
    let mut risk_scores = Vec::with_capacity(shape.steps);
    let mut incidents_pct = Vec::with_capacity(shape.steps);
    let mut low_conf_pct = Vec::with_capacity(shape.steps);

    for i in 0..shape.steps {
        let total = total_by_bucket[i];
        let ir = incidents_by_bucket[i] as f64 / total.max(1) as f64;
        let lr = low_conf_by_bucket[i] as f64 / total.max(1) as f64;
        let score = round2((ir * 0.6 + lr * 0.4) * 100.0).min(100.0);

        labels.push(bucket_start(start, shape, i).format(shape.label_format).to_string());
        risk_scores.push(score);
        incidents_pct.push(round2(ir * 100.0));
        low_conf_pct.push(round2(lr * 100.0));
    }

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "xAxis": labels,
        "risk_score": risk_scores,
        "incidents_ratio_pct": incidents_pct,
        "low_confidence_ratio_pct": low_conf_pct,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn score_composition_and_clamp() {
        assert_eq!(risk_score(0.0, 0.0, 0.0, 0), 0.0);
        // 0.1·35 + 0.2·25 + 0.5·40 + min(20, 3·5) = 3.5 + 5 + 20 + 15
        assert_eq!(risk_score(0.1, 0.2, 0.5, 3), 43.5);
        // Alert pressure saturates at 20.
        assert_eq!(risk_score(0.0, 0.0, 0.0, 10), 20.0);
        assert_eq!(risk_score(1.0, 1.0, 1.0, 10), 100.0);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(risk_level(69.9), "medium");
        assert_eq!(risk_level(70.0), "high");
        assert_eq!(risk_level(39.9), "low");
        assert_eq!(risk_level(40.0), "medium");
    }

    #[test]
    fn reasons_never_empty() {
        assert_eq!(risk_reasons(0.0, 0.0, 0.0, 0), vec!["stable_signal_profile"]);
        let reasons = risk_reasons(0.1, 0.2, 0.5, 3);
        assert_eq!(
            reasons,
            vec![
                "incident_ratio_elevated",
                "low_confidence_share_elevated",
                "signal_concentration_high",
                "multiple_high_alerts"
            ]
        );
    }

    #[test]
    fn fixed_step_bucket_assignment() {
        let shape = trend_shape(TimeWindow::H1);
        let start = Utc.with_ymd_and_hms(2026, 2, 17, 11, 0, 0).unwrap();
        // A minute-truncated row at 11:07 lands in the 11:05 bucket.
        let t = Utc.with_ymd_and_hms(2026, 2, 17, 11, 7, 0).unwrap();
        assert_eq!(bucket_index(t, start, shape), Some(1));
        // Before the window: dropped.
        let early = Utc.with_ymd_and_hms(2026, 2, 17, 10, 59, 0).unwrap();
        assert_eq!(bucket_index(early, start, shape), None);
        // Past the last step: dropped.
        let late = Utc.with_ymd_and_hms(2026, 2, 17, 12, 1, 0).unwrap();
        assert_eq!(bucket_index(late, start, shape), None);
    }

    #[test]
    fn month_buckets_follow_the_calendar() {
        let shape = trend_shape(TimeWindow::Y1);
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(bucket_index(t, start, shape), Some(0));
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(bucket_index(t, start, shape), Some(10));
        assert_eq!(
            bucket_start(start, shape, 10),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn week_start_aligns_to_monday() {
        let shape = trend_shape(TimeWindow::D90);
        // 2026-02-17 is a Tuesday; the grid starts Monday 2026-02-16.
        let since = Utc.with_ymd_and_hms(2026, 2, 17, 9, 30, 0).unwrap();
        let start = trend_start(since, shape);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 16, 0, 0, 0).unwrap());
    }
}
