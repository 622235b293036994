//! Collaborator contracts consumed by the correlation engine.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One vendor sample. Absent fields default to 0 (price, volume) or 50 (sentiment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub price: Option<f64>,
    pub volume: Option<f64>,
    /// Sentiment on a 0-100 scale
    pub sentiment_score: Option<f64>,
}

impl DataPoint {
    /// Neutral sentiment score used when a sample carries none.
    pub const NEUTRAL_SENTIMENT: f64 = 50.0;

    #[must_use]
    pub fn price_or_zero(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }

    #[must_use]
    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }

    #[must_use]
    pub fn sentiment_or_neutral(&self) -> f64 {
        self.sentiment_score.unwrap_or(Self::NEUTRAL_SENTIMENT)
    }
}

/// An asset belonging to an ecosystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    pub market_cap: Option<f64>,
}

impl Constituent {
    #[must_use]
    pub fn new(symbol: impl Into<String>, market_cap: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            market_cap,
        }
    }
}

/// Options forwarded to sentiment lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentOptions {
    pub timeframe: String,
    pub limit: usize,
    pub sources: Vec<String>,
}

impl SentimentOptions {
    #[must_use]
    pub fn new(timeframe: impl Into<String>) -> Self {
        Self {
            timeframe: timeframe.into(),
            limit: 10,
            sources: vec!["social".to_string(), "news".to_string()],
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Sentiment summary for a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetSentiment {
    /// Score already mapped into [0, 1]
    pub normalized_score: f64,
}

/// Sentiment summary for an ecosystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemSentiment {
    /// Score on a 0-100 scale
    pub aggregate_score: f64,
    pub top_assets: Vec<Constituent>,
}

/// Price, volume, and per-sample sentiment source.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Samples for `symbol` at `interval` covering `days_back` days, oldest first.
    async fn time_series(&self, symbol: &str, interval: &str, days_back: f64)
        -> Result<Vec<DataPoint>>;

    /// Top `limit` constituents of `ecosystem`, in provider order.
    async fn ecosystem_constituents(&self, ecosystem: &str, limit: usize)
        -> Result<Vec<Constituent>>;
}

/// Aggregate sentiment source.
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn analyze_sentiment(&self, asset: &str, options: &SentimentOptions)
        -> Result<AssetSentiment>;

    async fn analyze_ecosystem_sentiment(
        &self,
        ecosystem: &str,
        options: &SentimentOptions,
    ) -> Result<EcosystemSentiment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_point_defaults_for_absent_fields() {
        let point = DataPoint::default();
        assert!((point.price_or_zero() - 0.0).abs() < f64::EPSILON);
        assert!((point.volume_or_zero() - 0.0).abs() < f64::EPSILON);
        assert!((point.sentiment_or_neutral() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sentiment_options_default_sources() {
        let options = SentimentOptions::new("30d").with_limit(5);
        assert_eq!(options.limit, 5);
        assert_eq!(options.sources, vec!["social", "news"]);
    }
}
