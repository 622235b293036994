//! Metric series and timeframe primitives.
//!
//! A `TimeSeries` carries no timestamps: position encodes recency. Normalized
//! `*_data` series are newest-first, `*_time_series` series are chronological.

use crate::error::CorrelationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Default day count for timeframe strings that do not parse.
pub const DEFAULT_TIMEFRAME_DAYS: f64 = 7.0;

/// Upper bound on samples in a generated series (ten years of daily samples).
pub const MAX_SAMPLE_COUNT: usize = 10 * 365;

/// An ordered sequence of samples for one metric, timeframe, and entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries(Vec<f64>);

impl TimeSeries {
    /// Creates a series from raw samples.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Creates a series of `len` copies of `value`.
    #[must_use]
    pub fn flat(value: f64, len: usize) -> Self {
        Self(vec![value; len])
    }

    /// Returns the samples as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consumes the series and returns its samples.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Returns the series in reverse order.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }
}

impl Deref for TimeSeries {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for TimeSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl FromIterator<f64> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Metric family an analysis runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Sequential price ratios
    Price,
    /// Max-scaled trading volume
    Volume,
    /// Sentiment score mapped into [0, 1]
    Sentiment,
    /// Blend of price, volume, and (when available) sentiment
    Combined,
}

impl Metric {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Volume => "volume",
            Self::Sentiment => "sentiment",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CorrelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(Self::Price),
            "volume" => Ok(Self::Volume),
            "sentiment" => Ok(Self::Sentiment),
            "combined" => Ok(Self::Combined),
            other => Err(CorrelationError::unsupported_metric(other, "metric parsing")),
        }
    }
}

/// Converts a timeframe string such as `"30d"` or `"2w"` into a day count.
///
/// Accepts `<digits><unit>` with units `h`, `d`, `w`, `m` (30 days), `y` (365 days).
/// Anything else yields [`DEFAULT_TIMEFRAME_DAYS`]. Hours produce fractional days.
#[must_use]
pub fn timeframe_days(timeframe: &str) -> f64 {
    let Some(unit) = timeframe.chars().last() else {
        return DEFAULT_TIMEFRAME_DAYS;
    };
    let digits = &timeframe[..timeframe.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return DEFAULT_TIMEFRAME_DAYS;
    }
    let Ok(value) = digits.parse::<u32>() else {
        return DEFAULT_TIMEFRAME_DAYS;
    };
    let value = f64::from(value);

    match unit {
        'h' => value / 24.0,
        'd' => value,
        'w' => value * 7.0,
        'm' => value * 30.0,
        'y' => value * 365.0,
        _ => DEFAULT_TIMEFRAME_DAYS,
    }
}

/// Number of samples in a flat fallback series covering `timeframe`.
///
/// Fractional day counts round up; the result is clamped to
/// `1..=MAX_SAMPLE_COUNT`.
#[must_use]
pub fn timeframe_sample_count(timeframe: &str) -> usize {
    let days = timeframe_days(timeframe).ceil();
    (days as usize).clamp(1, MAX_SAMPLE_COUNT)
}
