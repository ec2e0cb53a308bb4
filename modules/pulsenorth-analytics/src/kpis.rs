//! Headline KPI counters: 15m / 1h / 7d volumes with previous-period deltas.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::queries::count_between;
use crate::windows::calc_delta;

#[derive(Debug, Clone, Serialize)]
pub struct KpiWindow {
    pub current: i64,
    pub previous: i64,
    pub delta_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpisResponse {
    pub m15: KpiWindow,
    pub h1: KpiWindow,
    pub d7: KpiWindow,
}

async fn kpi_window(pool: &PgPool, delta: Duration) -> Result<KpiWindow> {
    let now = Utc::now();
    let current_start = now - delta;
    let previous_start = now - delta * 2;
    let current = count_between(pool, current_start, now).await?;
    let previous = count_between(pool, previous_start, current_start).await?;
    Ok(KpiWindow { current, previous, delta_percent: calc_delta(current, previous) })
}

pub async fn fetch_kpis(pool: &PgPool) -> Result<KpisResponse> {
    Ok(KpisResponse {
        m15: kpi_window(pool, Duration::minutes(15)).await?,
        h1: kpi_window(pool, Duration::hours(1)).await?,
        d7: kpi_window(pool, Duration::days(7)).await?,
    })
}
