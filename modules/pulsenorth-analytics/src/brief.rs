//! The one-screen brief and the plain-language summary bullets.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::alerts::{fetch_alerts, AlertThresholds};
use crate::concentration::fetch_concentration;
use crate::kpis::fetch_kpis;
use crate::momentum::fetch_momentum;
use crate::queries::{count_since, grouped_counts, tag_counts_since};
use crate::risk::fetch_risk_index;
use crate::windows::TimeWindow;

fn top_entry(rows: &[(String, i64)]) -> Value {
    match rows.first() {
        Some((name, count)) => json!({"name": name, "count": count}),
        None => json!({"name": "", "count": 0}),
    }
}

pub async fn fetch_brief_snapshot(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let since = now - window.duration();
    let total = count_since(pool, since).await?;

    let top_category = grouped_counts(pool, "category", since, Some(1)).await?;
    let top_jurisdiction = grouped_counts(pool, "jurisdiction", since, Some(1)).await?;
    let top_publisher = grouped_counts(pool, "publisher", since, Some(1)).await?;
    let top_tag = tag_counts_since(pool, since, 1).await?;

    let alerts = fetch_alerts(pool, window, AlertThresholds::default()).await?;
    let high_alert_count = alerts.alerts.iter().filter(|a| a.severity == "high").count();

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "total_items": total,
        "high_alert_count": high_alert_count,
        "top_category": top_entry(&top_category),
        "top_jurisdiction": top_entry(&top_jurisdiction),
        "top_publisher": top_entry(&top_publisher),
        "top_tag": top_entry(&top_tag),
    }))
}

/// Up to six human-readable bullets summarizing the window.
pub async fn fetch_summary(pool: &PgPool, window: TimeWindow) -> Result<Value> {
    let now = Utc::now();
    let kpis = fetch_kpis(pool).await?;
    let brief = fetch_brief_snapshot(pool, window).await?;
    let risk = fetch_risk_index(pool, window).await?;
    let concentration = fetch_concentration(pool, window).await?;
    let momentum = fetch_momentum(pool, window, 3).await?;

    let mut bullets: Vec<String> = Vec::new();
    bullets.push(format!(
        "Volume {} in last hour ({:+.1}% vs previous hour).",
        kpis.h1.current, kpis.h1.delta_percent
    ));
    if let Some(name) = brief["top_category"]["name"].as_str().filter(|n| !n.is_empty()) {
        bullets.push(format!("Top category: {name}."));
    }
    if let Some(name) = brief["top_jurisdiction"]["name"].as_str().filter(|n| !n.is_empty()) {
        bullets.push(format!("Top jurisdiction: {name}."));
    }
    bullets.push(format!(
        "Risk index: {:.1} ({}).",
        risk["score"].as_f64().unwrap_or(0.0),
        risk["level"].as_str().unwrap_or("low")
    ));
    bullets.push(format!(
        "Concentration: {:.3} ({}).",
        concentration["combined_hhi"].as_f64().unwrap_or(0.0),
        concentration["combined_level"].as_str().unwrap_or("low")
    ));
    if let Some(mover) = momentum["categories"].as_array().and_then(|a| a.first()) {
        let name = mover["name"].as_str().unwrap_or("");
        let change = mover["change"].as_i64().unwrap_or(0);
        bullets.push(format!("Top category mover: {name} ({change:+})."));
    }
    bullets.truncate(6);

    Ok(json!({
        "generated_at": now.to_rfc3339(),
        "time_window": window.as_str(),
        "bullets": bullets,
    }))
}
