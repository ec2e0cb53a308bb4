//! Herfindahl-Hirschman concentration over publishers, jurisdictions, and
//! categories.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::queries::{count_since, grouped_counts};
use crate::windows::{round4, TimeWindow};

/// Sum of squared shares, in [0, 1]. Zero when there is nothing to share.
pub fn hhi(values: &[i64]) -> f64 {
    let total: i64 = values.iter().sum();
    if total <= 0 {
        return 0.0;
    }
    let sum = values
        .iter()
        .map(|v| {
            let share = *v as f64 / total as f64;
            share * share
        })
        .sum::<f64>();
    round4(sum)
}

pub fn concentration_label(hhi: f64) -> &'static str {
    if hhi >= 0.4 {
        "high"
    } else if hhi >= 0.2 {
        "medium"
    } else {
        "low"
    }
}

pub async fn fetch_concentration(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;

    let sources = grouped_counts(pool, "publisher", since, Some(8)).await?;
    let jurisdictions = grouped_counts(pool, "jurisdiction", since, Some(8)).await?;
    let categories = grouped_counts(pool, "category", since, None).await?;

    let source_values: Vec<i64> = sources.iter().map(|(_, c)| *c).collect();
    let jurisdiction_values: Vec<i64> = jurisdictions.iter().map(|(_, c)| *c).collect();
    let category_values: Vec<i64> = categories.iter().map(|(_, c)| *c).collect();

    let source_hhi = hhi(&source_values);
    let jurisdiction_hhi = hhi(&jurisdiction_values);
    let category_hhi = hhi(&category_values);
    let combined = round4((source_hhi + jurisdiction_hhi + category_hhi) / 3.0);

    let top = |rows: &[(String, i64)]| -> Vec<Value> {
        rows.iter()
            .take(3)
            .map(|(name, count)| json!({"name": name, "count": count}))
            .collect()
    };

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "total": total,
        "source_hhi": source_hhi,
        "source_level": concentration_label(source_hhi),
        "jurisdiction_hhi": jurisdiction_hhi,
        "jurisdiction_level": concentration_label(jurisdiction_hhi),
        "category_hhi": category_hhi,
        "category_level": concentration_label(category_hhi),
        "combined_hhi": combined,
        "combined_level": concentration_label(combined),
        "top_sources": top(&sources),
        "top_jurisdictions": top(&jurisdictions),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhi_of_monopoly_is_one() {
        assert_eq!(hhi(&[10]), 1.0);
    }

    #[test]
    fn hhi_of_even_split_is_reciprocal() {
        assert_eq!(hhi(&[5, 5]), 0.5);
        assert_eq!(hhi(&[1, 1, 1, 1]), 0.25);
    }

    #[test]
    fn hhi_of_nothing_is_zero() {
        assert_eq!(hhi(&[]), 0.0);
        assert_eq!(hhi(&[0, 0]), 0.0);
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(concentration_label(0.45), "high");
        assert_eq!(concentration_label(0.4), "high");
        assert_eq!(concentration_label(0.25), "medium");
        assert_eq!(concentration_label(0.19), "low");
    }
}
