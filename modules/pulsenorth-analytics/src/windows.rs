//! Time-window arithmetic shared by every analytics endpoint.

use chrono::Duration;

/// Closed set of supported windows. Most endpoints accept the first four;
/// risk trend and alerts extend to the long horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    H1,
    H24,
    D7,
    D30,
    D90,
    Y1,
    Y2,
    Y5,
}

impl TimeWindow {
    /// Parse a query-string window, defaulting to 24h like the API contract.
    pub fn parse(value: &str) -> TimeWindow {
        match value {
            "1h" => TimeWindow::H1,
            "24h" => TimeWindow::H24,
            "7d" => TimeWindow::D7,
            "30d" => TimeWindow::D30,
            "90d" => TimeWindow::D90,
            "1y" => TimeWindow::Y1,
            "2y" => TimeWindow::Y2,
            "5y" => TimeWindow::Y5,
            _ => TimeWindow::H24,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::H1 => "1h",
            TimeWindow::H24 => "24h",
            TimeWindow::D7 => "7d",
            TimeWindow::D30 => "30d",
            TimeWindow::D90 => "90d",
            TimeWindow::Y1 => "1y",
            TimeWindow::Y2 => "2y",
            TimeWindow::Y5 => "5y",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::H1 => Duration::hours(1),
            TimeWindow::H24 => Duration::hours(24),
            TimeWindow::D7 => Duration::days(7),
            TimeWindow::D30 => Duration::days(30),
            TimeWindow::D90 => Duration::days(90),
            TimeWindow::Y1 => Duration::days(365),
            TimeWindow::Y2 => Duration::days(730),
            TimeWindow::Y5 => Duration::days(1825),
        }
    }

    /// How many prior windows the alert baseline looks back over.
    pub fn lookback_windows(&self) -> usize {
        if self.duration() >= Duration::days(365) {
            4
        } else if self.duration() >= Duration::days(90) {
            6
        } else {
            8
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Percentage delta convention used everywhere: a previous of zero maps to
/// 0% (no change) or 100% (appeared), everything else is a rounded ratio.
pub fn calc_delta(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    let raw = ((current - previous) as f64 / previous as f64) * 100.0;
    (raw * 100.0).round() / 100.0
}

pub fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

/// Population standard deviation; zero for fewer than two samples.
pub fn stddev(values: &[i64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| (*v as f64 - mean_value).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.max(0.0).sqrt()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_24h() {
        assert_eq!(TimeWindow::parse("1h"), TimeWindow::H1);
        assert_eq!(TimeWindow::parse("bogus"), TimeWindow::H24);
        assert_eq!(TimeWindow::parse("5y"), TimeWindow::Y5);
    }

    #[test]
    fn delta_convention_handles_zero_previous() {
        assert_eq!(calc_delta(0, 0), 0.0);
        assert_eq!(calc_delta(5, 0), 100.0);
        assert_eq!(calc_delta(15, 10), 50.0);
        assert_eq!(calc_delta(5, 10), -50.0);
        assert_eq!(calc_delta(1, 3), -66.67);
    }

    #[test]
    fn population_stddev_and_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[10, 10, 10]), 10.0);
        assert_eq!(stddev(&[10], 10.0), 0.0);
        assert_eq!(stddev(&[10, 10, 10, 10], 10.0), 0.0);
        // Population formula: sqrt(((2-3)^2 + (4-3)^2) / 2) = 1
        assert_eq!(stddev(&[2, 4], 3.0), 1.0);
    }

    #[test]
    fn lookback_shrinks_for_long_horizons() {
        assert_eq!(TimeWindow::H24.lookback_windows(), 8);
        assert_eq!(TimeWindow::D90.lookback_windows(), 6);
        assert_eq!(TimeWindow::Y1.lookback_windows(), 4);
        assert_eq!(TimeWindow::Y5.lookback_windows(), 4);
    }
}
