//! Core types for cross-ecosystem correlation analysis.
//!
//! This crate provides:
//! - `TimeSeries`, `Metric`, and timeframe parsing
//! - `TtlCache`, the expiring store shared by every analyzer
//! - `CorrelationError`, the error taxonomy
//! - Provider traits for market data and sentiment
//! - `AppConfig` and its `figment` loader

pub mod cache;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod series;
pub mod traits;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use config::{
    AnalysisConfig, AppConfig, BlendWeights, CacheConfig, EcosystemsConfig, ProviderConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{CorrelationError, Result};
pub use series::{
    timeframe_days, timeframe_sample_count, Metric, TimeSeries, MAX_SAMPLE_COUNT,
};
pub use traits::{
    AssetSentiment, Constituent, DataPoint, EcosystemSentiment, MarketDataProvider,
    SentimentOptions, SentimentProvider,
};
