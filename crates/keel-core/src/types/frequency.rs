//! Sampling frequency of return series.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling frequency of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SamplingFrequency {
    /// One observation per minute (24/7 markets)
    Minute,
    /// One observation per hour (24/7 markets)
    Hourly,
    /// One observation per trading day
    #[default]
    Daily,
    /// One observation per week
    Weekly,
    /// One observation per month
    Monthly,
}

impl SamplingFrequency {
    /// Returns the number of observations per year used for annualization.
    ///
    /// Daily uses 252 trading days; intraday frequencies assume a 365-day,
    /// round-the-clock market.
    #[must_use]
    pub fn periods_per_year(&self) -> u32 {
        match self {
            SamplingFrequency::Minute => 525_600,
            SamplingFrequency::Hourly => 8_760,
            SamplingFrequency::Daily => 252,
            SamplingFrequency::Weekly => 52,
            SamplingFrequency::Monthly => 12,
        }
    }
}

impl fmt::Display for SamplingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SamplingFrequency::Minute => "Minute",
            SamplingFrequency::Hourly => "Hourly",
            SamplingFrequency::Daily => "Daily",
            SamplingFrequency::Weekly => "Weekly",
            SamplingFrequency::Monthly => "Monthly",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(SamplingFrequency::Daily.periods_per_year(), 252);
        assert_eq!(SamplingFrequency::Weekly.periods_per_year(), 52);
        assert_eq!(SamplingFrequency::Monthly.periods_per_year(), 12);
        assert_eq!(SamplingFrequency::Hourly.periods_per_year(), 24 * 365);
    }

    #[test]
    fn test_default_is_daily() {
        assert_eq!(SamplingFrequency::default(), SamplingFrequency::Daily);
    }
}
