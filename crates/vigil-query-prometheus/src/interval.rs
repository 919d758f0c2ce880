//! Query step selection
//!
//! The step of a range query is the resolved minimum interval scaled by the
//! query's factor, floored so one query never asks the backend for more than
//! [`SAFE_RESOLUTION`] points.

use chrono::Duration;

use crate::error::PrometheusError;

/// Upper bound on data points per range query
pub const SAFE_RESOLUTION: i32 = 11_000;

/// Picks the effective query step from the per-query hint, the datasource
/// default, and the built-in fallback
pub struct IntervalCalculator {
    default_min_interval: Duration,
}

impl IntervalCalculator {
    pub fn new() -> Self {
        Self {
            default_min_interval: Duration::seconds(15),
        }
    }

    /// Resolve the minimum interval: per-query string first, then the
    /// datasource default, then the query's millisecond hint, then the
    /// built-in fallback.
    pub fn min_interval(
        &self,
        query_interval: Option<&str>,
        interval_ms: i64,
        datasource_interval: &str,
    ) -> Result<Duration, PrometheusError> {
        if let Some(interval) = query_interval {
            let interval = interval.trim();
            if !interval.is_empty() {
                return parse_interval(interval);
            }
        }

        let datasource_interval = datasource_interval.trim();
        if !datasource_interval.is_empty() {
            return parse_interval(datasource_interval);
        }

        if interval_ms > 0 {
            return Ok(Duration::milliseconds(interval_ms));
        }

        Ok(self.default_min_interval)
    }

    /// Smallest step keeping the point count at or under the safe resolution
    pub fn safe_interval(&self, range: Duration) -> Duration {
        range / SAFE_RESOLUTION
    }

    /// Final query step: the minimum interval scaled by the query's factor,
    /// floored by the safe interval
    pub fn step(&self, range: Duration, min_interval: Duration, factor: i64) -> Duration {
        let scaled = min_interval * factor.max(1) as i32;
        let safe = self.safe_interval(range);
        if scaled < safe {
            safe
        } else {
            scaled
        }
    }
}

impl Default for IntervalCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse interval strings like `"15s"`, `"2m"`, `"1h"`
pub fn parse_interval(value: &str) -> Result<Duration, PrometheusError> {
    let value = value.trim();
    let unit_start = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| PrometheusError::InvalidInterval(value.to_string()))?;
    if unit_start == 0 {
        return Err(PrometheusError::InvalidInterval(value.to_string()));
    }

    let (digits, unit) = value.split_at(unit_start);
    let amount: i64 = digits
        .parse()
        .map_err(|_| PrometheusError::InvalidInterval(value.to_string()))?;

    match unit {
        "ms" => Ok(Duration::milliseconds(amount)),
        "s" => Ok(Duration::seconds(amount)),
        "m" => Ok(Duration::minutes(amount)),
        "h" => Ok(Duration::hours(amount)),
        "d" => Ok(Duration::days(amount)),
        "w" => Ok(Duration::weeks(amount)),
        _ => Err(PrometheusError::InvalidInterval(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("500ms").unwrap(), Duration::milliseconds(500));
        assert_eq!(parse_interval("15s").unwrap(), Duration::seconds(15));
        assert_eq!(parse_interval("2m").unwrap(), Duration::minutes(2));
        assert_eq!(parse_interval("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_interval(" 1d ").unwrap(), Duration::days(1));
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        for bad in ["", "s", "15", "15x", "1.5s", "s15"] {
            assert!(
                matches!(parse_interval(bad), Err(PrometheusError::InvalidInterval(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_min_interval_precedence() {
        let calc = IntervalCalculator::new();

        // Per-query string wins over everything.
        assert_eq!(
            calc.min_interval(Some("1m"), 30_000, "10s").unwrap(),
            Duration::minutes(1)
        );
        // Datasource default next, even when the host supplies a hint.
        assert_eq!(
            calc.min_interval(None, 30_000, "10s").unwrap(),
            Duration::seconds(10)
        );
        // Blank per-query string falls through to the datasource default.
        assert_eq!(
            calc.min_interval(Some("  "), 30_000, "10s").unwrap(),
            Duration::seconds(10)
        );
        // Millisecond hint next.
        assert_eq!(
            calc.min_interval(None, 30_000, "").unwrap(),
            Duration::seconds(30)
        );
        // Built-in fallback last.
        assert_eq!(
            calc.min_interval(None, 0, "").unwrap(),
            Duration::seconds(15)
        );
    }

    #[test]
    fn test_min_interval_propagates_parse_errors() {
        let calc = IntervalCalculator::new();
        assert!(calc.min_interval(Some("nope"), 0, "").is_err());
        assert!(calc.min_interval(None, 0, "nope").is_err());
    }

    #[test]
    fn test_step_scales_by_factor() {
        let calc = IntervalCalculator::new();
        let step = calc.step(Duration::hours(1), Duration::seconds(15), 4);
        assert_eq!(step, Duration::seconds(60));
    }

    #[test]
    fn test_step_is_floored_by_safe_resolution() {
        let calc = IntervalCalculator::new();
        // A 30 day range at 1s would be ~2.6M points; the floor kicks in.
        let range = Duration::days(30);
        let step = calc.step(range, Duration::seconds(1), 1);
        assert_eq!(step, range / SAFE_RESOLUTION);
        assert!(step > Duration::seconds(1));
    }
}
