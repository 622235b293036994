use crate::error::{CorrelationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub provider: ProviderConfig,
    pub analysis: AnalysisConfig,
    pub ecosystems: EcosystemsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in milliseconds.
    pub ttl_ms: u64,
    /// Maximum number of entries; 0 disables the bound.
    pub max_size: usize,
    /// Background sweep period; 0 disables the sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5 * 60 * 1000,
            max_size: 1000,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
    /// Retries after the first attempt for transient provider failures.
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lunarcrush.com/api4/public".to_string(),
            api_key: None,
            requests_per_minute: 60,
            timeout_secs: 10,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Constituents fused for daily `*_data` series.
    pub constituent_limit: usize,
    /// Constituents fused for interval `*_time_series` series.
    pub time_series_constituent_limit: usize,
    /// Weight used for constituents the provider reports without a market cap.
    pub default_market_cap: f64,
    pub blend: BlendWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            constituent_limit: 10,
            time_series_constituent_limit: 5,
            default_market_cap: 1e9,
            blend: BlendWeights::default(),
        }
    }
}

/// Weights for the combined metric.
///
/// Volume receives `1 - price` weight; the sentiment re-blend keeps
/// `1 - sentiment` of the price/volume blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub ecosystem_price: f64,
    pub asset_price: f64,
    pub sentiment: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            ecosystem_price: 0.6,
            asset_price: 0.7,
            sentiment: 0.3,
        }
    }
}

impl BlendWeights {
    /// Checks every weight lies in `[0, 1]`.
    ///
    /// # Errors
    /// Returns `CorrelationError::Config` naming the offending weight.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ecosystem_price", self.ecosystem_price),
            ("asset_price", self.asset_price),
            ("sentiment", self.sentiment),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CorrelationError::Config(format!(
                    "blend weight {name} must be in [0.0, 1.0], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Named ecosystems and their representative symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EcosystemsConfig(pub BTreeMap<String, Vec<String>>);

impl Default for EcosystemsConfig {
    fn default() -> Self {
        let entries = [
            ("ai-agents", ["FET", "OCEAN", "RNDR", "GRT", "AGIX"]),
            ("defai", ["LINK", "GRT", "FET", "OCEAN", "AAVE"]),
            ("solana", ["SOL", "RAY", "JTO", "BONK", "PYTH"]),
            ("ethereum", ["ETH", "ARB", "OP", "RPL", "LDO"]),
            ("bitcoin", ["BTC", "STX", "ORDI", "SATS", "RUNE"]),
        ];
        Self(
            entries
                .into_iter()
                .map(|(name, symbols)| {
                    (
                        name.to_string(),
                        symbols.iter().map(|s| (*s).to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

impl EcosystemsConfig {
    /// Returns the configured ecosystem names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Returns the representative symbols for an ecosystem.
    #[must_use]
    pub fn symbols(&self, ecosystem: &str) -> Option<&[String]> {
        self.0.get(ecosystem).map(Vec::as_slice)
    }
}
