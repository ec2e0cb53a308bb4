//! Momentum ranking: current vs previous window for categories, publishers,
//! and entities, sorted by absolute change.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::queries::{entity_counts_between, grouped_counts_between};
use crate::windows::{calc_delta, TimeWindow};

/// Join two name → count maps into mover rows sorted by |change|.
/// Names absent from both windows never appear; `keep_zero_rows` controls
/// whether 0 → 0 pairs survive (categories keep them, publishers drop them).
fn movers(
    current: &BTreeMap<String, i64>,
    previous: &BTreeMap<String, i64>,
    keep_zero_rows: bool,
) -> Vec<Value> {
    let names: std::collections::BTreeSet<&String> =
        current.keys().chain(previous.keys()).collect();
    let mut items: Vec<(i64, Value)> = Vec::new();
    for name in names {
        let cur = current.get(name).copied().unwrap_or(0);
        let prev = previous.get(name).copied().unwrap_or(0);
        if !keep_zero_rows && cur == 0 && prev == 0 {
            continue;
        }
        let change = cur - prev;
        items.push((
            change.abs(),
            json!({
                "name": name,
                "current": cur,
                "previous": prev,
                "change": change,
                "delta_percent": calc_delta(cur, prev),
            }),
        ));
    }
    items.sort_by(|a, b| b.0.cmp(&a.0));
    items.into_iter().map(|(_, v)| v).collect()
}

pub async fn fetch_momentum(pool: &PgPool, window: TimeWindow, limit: i64) -> Result<Value> {
    let now = Utc::now();
    let duration = window.duration();
    let current_start = now - duration;
    let previous_start = now - duration * 2;

    let category_current: BTreeMap<String, i64> =
        grouped_counts_between(pool, "category", current_start, now, None)
            .await?
            .into_iter()
            .collect();
    let category_previous: BTreeMap<String, i64> =
        grouped_counts_between(pool, "category", previous_start, current_start, None)
            .await?
            .into_iter()
            .collect();
    let publisher_current: BTreeMap<String, i64> =
        grouped_counts_between(pool, "publisher", current_start, now, Some(40))
            .await?
            .into_iter()
            .collect();
    let publisher_previous: BTreeMap<String, i64> =
        grouped_counts_between(pool, "publisher", previous_start, current_start, Some(40))
            .await?
            .into_iter()
            .collect();

    let bounded = limit.clamp(1, 20) as usize;
    let mut categories = movers(&category_current, &category_previous, true);
    categories.truncate(bounded);
    let mut publishers = movers(&publisher_current, &publisher_previous, false);
    publishers.truncate(bounded);

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "categories": categories,
        "publishers": publishers,
    }))
}

pub async fn fetch_entity_momentum(
    pool: &PgPool,
    window: TimeWindow,
    limit: i64,
) -> Result<Value> {
    let now = Utc::now();
    let duration = window.duration();
    let current_start = now - duration;
    let previous_start = now - duration * 2;

    let current: BTreeMap<String, i64> = entity_counts_between(pool, current_start, now, 120)
        .await?
        .into_iter()
        .collect();
    let previous: BTreeMap<String, i64> =
        entity_counts_between(pool, previous_start, current_start, 120)
            .await?
            .into_iter()
            .collect();

    let mut entities = movers(&current, &previous, false);
    entities.truncate(limit.clamp(1, 20) as usize);

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "entities": entities,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn movers_sort_by_absolute_change() {
        let current = map(&[("a", 10), ("b", 3), ("c", 0)]);
        let previous = map(&[("a", 2), ("b", 5), ("c", 6)]);
        let rows = movers(&current, &previous, true);
        let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        // |a|=8, |c|=6, |b|=2
        assert_eq!(names, vec!["a", "c", "b"]);
        assert_eq!(rows[0]["delta_percent"], 400.0);
    }

    #[test]
    fn zero_zero_rows_drop_for_publishers() {
        let current = map(&[("quiet", 0), ("busy", 4)]);
        let previous = map(&[("quiet", 0)]);
        let rows = movers(&current, &previous, false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "busy");

        let rows = movers(&current, &previous, true);
        assert_eq!(rows.len(), 2);
    }
}
