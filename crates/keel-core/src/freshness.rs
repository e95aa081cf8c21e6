//! Snapshot freshness checks.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AnalyticsError, AnalyticsResult};

/// Fails with [`AnalyticsError::StaleData`] when `as_of` is older than `max_age`
/// relative to `now`.
///
/// Timestamps in the future are treated as fresh.
pub fn ensure_fresh(
    source: &str,
    as_of: DateTime<Utc>,
    now: DateTime<Utc>,
    max_age: Duration,
) -> AnalyticsResult<()> {
    let age = now.signed_duration_since(as_of);
    if age > max_age {
        log::debug!(
            "stale snapshot {}: age {}s > {}s",
            source,
            age.num_seconds(),
            max_age.num_seconds()
        );
        return Err(AnalyticsError::StaleData {
            source_name: source.to_string(),
            age_seconds: age.num_seconds(),
            max_age_seconds: max_age.num_seconds(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_fresh_snapshot() {
        let now = Utc::now();
        let as_of = now - Duration::minutes(5);
        assert!(ensure_fresh("positions", as_of, now, Duration::minutes(10)).is_ok());
    }

    #[test]
    fn test_stale_snapshot() {
        let now = Utc::now();
        let as_of = now - Duration::hours(3);
        let err = ensure_fresh("returns:BTC-USD", as_of, now, Duration::hours(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleData);
        assert!(err.to_string().contains("returns:BTC-USD"));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let now = Utc::now();
        let as_of = now + Duration::seconds(30);
        assert!(ensure_fresh("positions", as_of, now, Duration::seconds(1)).is_ok());
    }
}
