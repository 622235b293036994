//! LunarCrush REST client with rate limiting.
//!
//! Serves both collaborator contracts of the correlation engine: per-asset
//! price/volume/galaxy-score series and category constituents for
//! [`MarketDataProvider`], and galaxy-score summaries for [`SentimentProvider`].
//!
//! # Example
//!
//! ```ignore
//! use eco_corr_lunarcrush::{LunarCrushClient, LunarCrushConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LunarCrushClient::new(LunarCrushConfig::default().with_api_key("key"))?;
//!
//!     let coins = client.category_coins("solana", 10).await?;
//!     println!("Top solana coin: {:?}", coins.first());
//!
//!     let series = client.coin_time_series("SOL", "1d", 30.0).await?;
//!     println!("{} daily samples", series.len());
//!
//!     Ok(())
//! }
//! ```

use crate::error::{LunarCrushError, Result};
use async_trait::async_trait;
use eco_corr_core::{
    AssetSentiment, Constituent, DataPoint, EcosystemSentiment, MarketDataProvider,
    ProviderConfig, SentimentOptions, SentimentProvider,
};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// LunarCrush public API base URL.
pub const LUNARCRUSH_API_URL: &str = "https://lunarcrush.com/api4/public";

/// Maximum accepted length for a coin symbol.
const MAX_SYMBOL_LEN: usize = 32;

/// Maximum accepted length for a category slug.
const MAX_CATEGORY_LEN: usize = 64;

/// Retries after the first attempt for transient failures.
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Upper bound on a single retry wait, whatever the server suggests.
const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Galaxy score assumed when a coin reports none.
const NEUTRAL_GALAXY_SCORE: f64 = 50.0;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the LunarCrush client.
#[derive(Clone)]
pub struct LunarCrushConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// Bearer token; requests are unauthenticated without one.
    pub api_key: Option<String>,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first attempt for retryable errors.
    pub max_retries: u32,

    /// Cap on the wait between attempts.
    pub max_retry_delay: Duration,
}

impl std::fmt::Debug for LunarCrushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LunarCrushConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("requests_per_minute", &self.requests_per_minute)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("max_retry_delay", &self.max_retry_delay)
            .finish()
    }
}

impl Default for LunarCrushConfig {
    fn default() -> Self {
        Self {
            base_url: LUNARCRUSH_API_URL.to_string(),
            api_key: None,
            requests_per_minute: nonzero!(60u32),
            timeout_secs: 10,
            max_retries: DEFAULT_MAX_RETRIES,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
        }
    }
}

impl LunarCrushConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets how many times a retryable failure is retried.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Caps the wait between attempts.
    #[must_use]
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }
}

impl From<&ProviderConfig> for LunarCrushConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            requests_per_minute: NonZeroU32::new(config.requests_per_minute)
                .unwrap_or(nonzero!(60u32)),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
        }
    }
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawTimeSeriesResponse {
    #[serde(default)]
    data: Vec<RawTimePoint>,
}

/// One bucket of a coin time series.
#[derive(Debug, Deserialize)]
struct RawTimePoint {
    /// Close price
    #[serde(default)]
    p: Option<f64>,
    /// Volume over the bucket
    #[serde(default)]
    v: Option<f64>,
    /// Galaxy score, 0-100
    #[serde(default)]
    gs: Option<f64>,
}

impl From<RawTimePoint> for DataPoint {
    fn from(raw: RawTimePoint) -> Self {
        Self {
            price: raw.p,
            volume: raw.v,
            sentiment_score: raw.gs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCoinsResponse {
    #[serde(default)]
    data: Vec<RawCoin>,
}

#[derive(Debug, Deserialize)]
struct RawCoinResponse {
    data: Option<RawCoin>,
}

#[derive(Debug, Deserialize)]
struct RawCoin {
    /// Symbol
    s: String,
    /// Market cap in USD
    #[serde(default)]
    mc: Option<f64>,
    /// Galaxy score, 0-100
    #[serde(default)]
    gs: Option<f64>,
}

/// Current snapshot of one coin.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinSnapshot {
    pub symbol: String,
    pub market_cap: Option<f64>,
    /// Galaxy score on a 0-100 scale
    pub galaxy_score: Option<f64>,
}

impl From<RawCoin> for CoinSnapshot {
    fn from(raw: RawCoin) -> Self {
        Self {
            symbol: raw.s,
            market_cap: raw.mc,
            galaxy_score: raw.gs,
        }
    }
}

impl CoinSnapshot {
    #[must_use]
    pub fn constituent(&self) -> Constituent {
        Constituent::new(self.symbol.clone(), self.market_cap)
    }
}

/// Market-cap-weighted galaxy score; coins without a positive market cap
/// weigh 1, coins without a score are skipped.
fn weighted_galaxy_score(coins: &[CoinSnapshot]) -> f64 {
    let (weighted, total) = coins
        .iter()
        .filter_map(|c| {
            let score = c.galaxy_score?;
            let weight = c.market_cap.filter(|mc| *mc > 0.0).unwrap_or(1.0);
            Some((score * weight, weight))
        })
        .fold((0.0, 0.0), |(acc_s, acc_w), (s, w)| (acc_s + s, acc_w + w));

    if total > 0.0 {
        weighted / total
    } else {
        NEUTRAL_GALAXY_SCORE
    }
}

// =============================================================================
// Client
// =============================================================================

/// LunarCrush REST API client.
pub struct LunarCrushClient {
    config: LunarCrushConfig,

    http: Client,

    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for LunarCrushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LunarCrushClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl LunarCrushClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is not HTTP(S) or the HTTP client cannot be built.
    pub fn new(mut config: LunarCrushConfig) -> Result<Self> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(LunarCrushError::Configuration(format!(
                "base URL must start with http:// or https://: {}",
                config.base_url
            )));
        }
        let trimmed = config.base_url.trim_end_matches('/').len();
        config.base_url.truncate(trimmed);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LunarCrushError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Validates a path segment so it cannot escape its endpoint.
    ///
    /// Valid segments contain only ASCII alphanumerics, hyphens, and underscores.
    fn validate_segment<'a>(kind: &str, value: &'a str, max_len: usize) -> Result<&'a str> {
        if value.is_empty() {
            return Err(LunarCrushError::InvalidIdentifier(format!(
                "{kind} cannot be empty"
            )));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(LunarCrushError::InvalidIdentifier(format!(
                "{kind} must contain only alphanumeric, hyphen, or underscore: {value}"
            )));
        }

        if value.len() > max_len {
            return Err(LunarCrushError::InvalidIdentifier(format!(
                "{kind} exceeds maximum length of {max_len}: {}",
                value.len()
            )));
        }

        Ok(value)
    }

    fn validate_symbol(symbol: &str) -> Result<&str> {
        Self::validate_segment("symbol", symbol, MAX_SYMBOL_LEN)
    }

    fn validate_category(category: &str) -> Result<&str> {
        Self::validate_segment("category", category, MAX_CATEGORY_LEN)
    }

    /// Makes a GET request, retrying retryable failures with the delay each
    /// error suggests, capped at `max_retry_delay`.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.get_once(path, query).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_secs(e.retry_delay_secs().unwrap_or(1))
                        .min(self.config.max_retry_delay);
                    tracing::warn!(
                        path,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "LunarCrush request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Waits for the rate limiter and makes a single GET request.
    async fn get_once<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!(url = %url, query = ?query, "GET");

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handles API response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after: u64 = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            tracing::warn!(retry_after, "LunarCrush rate limit hit");
            return Err(LunarCrushError::rate_limit(retry_after));
        }

        if status.as_u16() == 404 {
            return Err(LunarCrushError::not_found(response.url().path()));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LunarCrushError::api(status.as_u16(), text));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }

    // =========================================================================
    // Coin Endpoints
    // =========================================================================

    /// Gets a coin's samples, oldest first.
    ///
    /// # Arguments
    /// * `symbol` - Coin symbol (e.g., "SOL")
    /// * `interval` - Bucket size forwarded to the API (e.g., "1d")
    /// * `days_back` - Days of history; rounded up to whole days
    ///
    /// # Errors
    /// Returns error if the symbol is invalid or the API call fails.
    pub async fn coin_time_series(
        &self,
        symbol: &str,
        interval: &str,
        days_back: f64,
    ) -> Result<Vec<DataPoint>> {
        let symbol = Self::validate_symbol(symbol)?;
        let days = days_back.ceil().max(1.0) as u64;
        let path = format!("/coins/{symbol}/time-series");
        let query = [("bucket", interval.to_string()), ("days", days.to_string())];

        let response: RawTimeSeriesResponse = self.get(&path, &query).await?;
        Ok(response.data.into_iter().map(DataPoint::from).collect())
    }

    /// Gets a coin's current snapshot.
    ///
    /// # Errors
    /// Returns error if the symbol is invalid, unknown, or the API call fails.
    pub async fn coin(&self, symbol: &str) -> Result<CoinSnapshot> {
        let symbol = Self::validate_symbol(symbol)?;
        let path = format!("/coins/{symbol}");

        let response: RawCoinResponse = self.get(&path, &[]).await?;
        response
            .data
            .map(CoinSnapshot::from)
            .ok_or_else(|| LunarCrushError::not_found(format!("coins/{symbol}")))
    }

    // =========================================================================
    // Category Endpoints
    // =========================================================================

    /// Gets the largest coins of a category by market cap.
    ///
    /// # Errors
    /// Returns error if the category is invalid or the API call fails.
    pub async fn category_coins(&self, category: &str, limit: usize) -> Result<Vec<CoinSnapshot>> {
        let category = Self::validate_category(category)?;
        let path = format!("/category/{category}/coins");
        let query = [("sort", "market_cap".to_string()), ("limit", limit.to_string())];

        let response: RawCoinsResponse = self.get(&path, &query).await?;
        Ok(response
            .data
            .into_iter()
            .take(limit)
            .map(CoinSnapshot::from)
            .collect())
    }
}

// =============================================================================
// Provider Contracts
// =============================================================================

#[async_trait]
impl MarketDataProvider for LunarCrushClient {
    async fn time_series(
        &self,
        symbol: &str,
        interval: &str,
        days_back: f64,
    ) -> anyhow::Result<Vec<DataPoint>> {
        Ok(self.coin_time_series(symbol, interval, days_back).await?)
    }

    async fn ecosystem_constituents(
        &self,
        ecosystem: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Constituent>> {
        let coins = self.category_coins(ecosystem, limit).await?;
        Ok(coins.iter().map(CoinSnapshot::constituent).collect())
    }
}

#[async_trait]
impl SentimentProvider for LunarCrushClient {
    async fn analyze_sentiment(
        &self,
        asset: &str,
        _options: &SentimentOptions,
    ) -> anyhow::Result<AssetSentiment> {
        let coin = self.coin(asset).await?;
        let score = coin.galaxy_score.unwrap_or(NEUTRAL_GALAXY_SCORE);
        Ok(AssetSentiment {
            normalized_score: (score / 100.0).clamp(0.0, 1.0),
        })
    }

    async fn analyze_ecosystem_sentiment(
        &self,
        ecosystem: &str,
        options: &SentimentOptions,
    ) -> anyhow::Result<EcosystemSentiment> {
        let coins = self.category_coins(ecosystem, options.limit).await?;
        Ok(EcosystemSentiment {
            aggregate_score: weighted_galaxy_score(&coins),
            top_assets: coins.iter().map(CoinSnapshot::constituent).collect(),
        })
    }
}
