//! Category change-point alerts with dual delta / z-score triggers.
//!
//! The evaluation itself is pure: given the current count and the history
//! series for one category it decides whether an alert fires and how it is
//! ranked. The loader builds those series from the table.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use pulsenorth_common::types::Category;

use crate::queries::category_counts_between;
use crate::windows::{calc_delta, mean, round2, stddev, TimeWindow};

#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub min_baseline: i64,
    pub min_delta_percent: f64,
    pub min_z_score: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self { min_baseline: 3, min_delta_percent: 35.0, min_z_score: 1.2 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub category: String,
    pub direction: String,
    pub severity: String,
    pub current: i64,
    pub previous: i64,
    pub delta_percent: f64,
    pub baseline_mean: f64,
    pub baseline_stddev: f64,
    pub z_score: f64,
    pub trigger_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    pub generated_at: String,
    pub time_window: String,
    pub min_baseline: i64,
    pub min_delta_percent: f64,
    pub min_z_score: f64,
    pub lookback_windows: usize,
    pub alerts: Vec<Alert>,
}

/// Evaluate one category. `history` is oldest-first; its last element is
/// the immediately-previous window.
pub fn evaluate_category(
    category: &str,
    current: i64,
    history: &[i64],
    thresholds: AlertThresholds,
) -> Option<Alert> {
    let previous = history.last().copied().unwrap_or(0);
    let baseline_mean = mean(history);
    let baseline_stddev = stddev(history, baseline_mean);

    let delta = calc_delta(current, previous);
    let z_score = if baseline_stddev > 0.0 {
        (current as f64 - baseline_mean) / baseline_stddev
    } else {
        // Flat history: emit a sentinel ±2.0 only for shifts beyond a floor
        // proportional to the mean.
        let shift = current as f64 - baseline_mean;
        let variance_floor = (baseline_mean * 0.5).max(2.0);
        if shift >= variance_floor {
            2.0
        } else if shift <= -variance_floor {
            -2.0
        } else {
            0.0
        }
    };

    let baseline_anchor = previous.max(baseline_mean.round() as i64);
    let baseline_ready =
        baseline_anchor >= thresholds.min_baseline || current >= thresholds.min_baseline;
    let delta_trigger = baseline_ready && delta.abs() >= thresholds.min_delta_percent;
    let z_trigger = baseline_ready && z_score.abs() >= thresholds.min_z_score;
    if !delta_trigger && !z_trigger {
        return None;
    }

    let direction = if current >= baseline_anchor { "up" } else { "down" };
    let severity = if delta.abs() >= 100.0 || z_score.abs() >= 2.5 { "high" } else { "medium" };
    let trigger_reason = match (delta_trigger, z_trigger) {
        (true, true) => "hybrid",
        (true, false) => "delta",
        (false, true) => "z_score",
        (false, false) => unreachable!(),
    };

    Some(Alert {
        category: category.to_string(),
        direction: direction.to_string(),
        severity: severity.to_string(),
        current,
        previous,
        delta_percent: delta,
        baseline_mean: round2(baseline_mean),
        baseline_stddev: round2(baseline_stddev),
        z_score: round2(z_score),
        trigger_reason: trigger_reason.to_string(),
    })
}

/// Ranking: strongest trigger ratio, with a flat bonus for high severity.
fn alert_rank(alert: &Alert, thresholds: AlertThresholds) -> f64 {
    let delta_rank = alert.delta_percent.abs() / thresholds.min_delta_percent.max(1.0);
    let z_rank = alert.z_score.abs() / thresholds.min_z_score.max(0.1);
    let severity_bonus = if alert.severity == "high" { 2.0 } else { 0.0 };
    delta_rank.max(z_rank) + severity_bonus
}

/// Evaluate every category, sort by rank, keep the top 8.
pub fn evaluate_alerts(
    counts: &[(Category, i64, Vec<i64>)],
    thresholds: AlertThresholds,
) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = counts
        .iter()
        .filter_map(|(category, current, history)| {
            evaluate_category(category.as_str(), *current, history, thresholds)
        })
        .collect();
    alerts.sort_by(|a, b| {
        alert_rank(b, thresholds)
            .partial_cmp(&alert_rank(a, thresholds))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    alerts.truncate(8);
    alerts
}

/// Load per-category current and history series, then evaluate.
pub async fn fetch_alerts(
    pool: &PgPool,
    window: TimeWindow,
    thresholds: AlertThresholds,
) -> Result<AlertsResponse> {
    let now = Utc::now();
    let duration = window.duration();
    let current_start = now - duration;
    let lookback = window.lookback_windows();

    let current_map = category_counts_between(pool, current_start, now).await?;
    let mut history_maps = Vec::with_capacity(lookback);
    for window_index in (1..=lookback).rev() {
        let history_start = current_start - duration * window_index as i32;
        let history_end = history_start + duration;
        history_maps.push(category_counts_between(pool, history_start, history_end).await?);
    }

    let counts: Vec<(Category, i64, Vec<i64>)> = Category::ALL
        .iter()
        .map(|category| {
            let key = category.as_str();
            let current = current_map.get(key).copied().unwrap_or(0);
            let history: Vec<i64> = history_maps
                .iter()
                .map(|m| m.get(key).copied().unwrap_or(0))
                .collect();
            (*category, current, history)
        })
        .collect();

    Ok(AlertsResponse {
        generated_at: now.to_rfc3339(),
        time_window: window.as_str().to_string(),
        min_baseline: thresholds.min_baseline,
        min_delta_percent: thresholds.min_delta_percent,
        min_z_score: thresholds.min_z_score,
        lookback_windows: lookback,
        alerts: evaluate_alerts(&counts, thresholds),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_category(current: i64, history: Vec<i64>) -> Vec<(Category, i64, Vec<i64>)> {
        Category::ALL
            .iter()
            .map(|category| {
                if *category == Category::Policy {
                    (*category, current, history.clone())
                } else {
                    (*category, 0, vec![0; history.len()])
                }
            })
            .collect()
    }

    #[test]
    fn delta_only_trigger_fires_down() {
        // Steady history of 10, current drops to 0; z-score disabled.
        let thresholds =
            AlertThresholds { min_baseline: 3, min_delta_percent: 35.0, min_z_score: 999.0 };
        let alerts = evaluate_alerts(&single_category(0, vec![10; 8]), thresholds);
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.category, "policy");
        assert_eq!(alert.trigger_reason, "delta");
        assert_eq!(alert.direction, "down");
        assert_eq!(alert.delta_percent, -100.0);
    }

    #[test]
    fn z_score_only_trigger_fires_up() {
        // Flat history means stddev 0, so the sentinel z-score path engages.
        let thresholds =
            AlertThresholds { min_baseline: 3, min_delta_percent: 999.0, min_z_score: 1.5 };
        let alerts = evaluate_alerts(&single_category(30, vec![10; 8]), thresholds);
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.trigger_reason, "z_score");
        assert_eq!(alert.direction, "up");
        assert_eq!(alert.z_score, 2.0);
    }

    #[test]
    fn both_triggers_report_hybrid() {
        let alerts = evaluate_alerts(&single_category(25, vec![10; 8]), AlertThresholds::default());
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.trigger_reason, "hybrid");
        assert_ne!(alert.delta_percent, 0.0);
        assert_eq!(alert.z_score, 2.0);
    }

    #[test]
    fn quiet_categories_stay_silent() {
        let alerts = evaluate_alerts(&single_category(10, vec![10; 8]), AlertThresholds::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn baseline_not_ready_suppresses_noise() {
        // History of ones and a current of two is a 100% delta, but the
        // baseline anchor never reaches min_baseline.
        let alert = evaluate_category("policy", 2, &[1; 8], AlertThresholds::default());
        assert!(alert.is_none());
    }

    #[test]
    fn severity_high_on_large_delta_or_z() {
        // 60% delta, sentinel z of 2.0: triggers, but below both high bars.
        let alert =
            evaluate_category("policy", 16, &[10; 8], AlertThresholds::default()).unwrap();
        assert_eq!(alert.severity, "medium");
        // 150% delta clears the high bar.
        let alert =
            evaluate_category("policy", 25, &[10; 8], AlertThresholds::default()).unwrap();
        assert_eq!(alert.severity, "high");
    }

    #[test]
    fn varying_history_uses_standard_z() {
        // mean 10, population stddev of [8,12,8,12,...] = 2
        let history = vec![8, 12, 8, 12, 8, 12, 8, 12];
        let alert = evaluate_category("policy", 16, &history, AlertThresholds::default()).unwrap();
        assert_eq!(alert.baseline_mean, 10.0);
        assert_eq!(alert.baseline_stddev, 2.0);
        assert_eq!(alert.z_score, 3.0);
        assert_eq!(alert.severity, "high");
    }

    #[test]
    fn ranking_prefers_high_severity_and_caps_at_eight() {
        let counts: Vec<(Category, i64, Vec<i64>)> = Category::ALL
            .iter()
            .map(|category| (*category, 25, vec![10; 8]))
            .collect();
        let alerts = evaluate_alerts(&counts, AlertThresholds::default());
        assert_eq!(alerts.len(), 6);
        // All six fire; the cap only matters with more categories than slots.
    }
}
