use super::{
    downsample, effective_market_cap, extract_ordered, fuse_weighted, SampleOrder,
    WeightedSeries, DAILY_INTERVAL,
};
use crate::cache::{self, AnalysisCache};
use eco_corr_core::{
    timeframe_days, timeframe_sample_count, AnalysisConfig, DataPoint, MarketDataProvider,
    SentimentOptions, SentimentProvider, TimeSeries,
};
use std::sync::Arc;

/// Normalized score used when sentiment cannot be resolved at all.
pub const NEUTRAL_SENTIMENT: f64 = 0.5;

/// A sentiment series and whether it may be memoized.
struct Resolved {
    series: Arc<TimeSeries>,
    /// `false` for flat fallbacks, which are never cached
    cacheable: bool,
}

impl Resolved {
    fn fused(series: Arc<TimeSeries>) -> Self {
        Self {
            series,
            cacheable: true,
        }
    }

    fn flat(value: f64, timeframe: &str) -> Self {
        Self {
            series: Arc::new(TimeSeries::flat(value, timeframe_sample_count(timeframe))),
            cacheable: false,
        }
    }
}

enum EcosystemOutcome {
    /// Fused 0-100 scores, newest first
    Fused(TimeSeries),
    /// No constituent had samples; aggregate 0-100 score
    Aggregate(f64),
}

/// Sentiment normalizer.
///
/// Never fails: missing per-asset data degrades to a flat series at the
/// summary score, and any provider error degrades to a flat neutral series.
pub struct SentimentMetrics {
    sentiment: Arc<dyn SentimentProvider>,
    market: Arc<dyn MarketDataProvider>,
    cache: Arc<AnalysisCache>,
    config: AnalysisConfig,
}

impl SentimentMetrics {
    pub fn new(
        sentiment: Arc<dyn SentimentProvider>,
        market: Arc<dyn MarketDataProvider>,
        cache: Arc<AnalysisCache>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            sentiment,
            market,
            cache,
            config,
        }
    }

    // =========================================================================
    // Daily data
    // =========================================================================

    /// Daily ecosystem sentiment in `[0, 1]`, newest first.
    pub async fn ecosystem_sentiment_data(
        &self,
        ecosystem: &str,
        timeframe: &str,
    ) -> Arc<TimeSeries> {
        self.resolve_ecosystem(ecosystem, timeframe).await.series
    }

    /// Daily asset sentiment in `[0, 1]`, newest first.
    pub async fn asset_sentiment_data(&self, asset: &str, timeframe: &str) -> Arc<TimeSeries> {
        self.resolve_asset(asset, timeframe).await.series
    }

    // =========================================================================
    // Interval series
    // =========================================================================

    /// Ecosystem sentiment at `interval`, oldest first.
    pub async fn ecosystem_sentiment_time_series(
        &self,
        ecosystem: &str,
        timeframe: &str,
        interval: &str,
    ) -> Arc<TimeSeries> {
        let key = format!("ecosystem_sentiment_ts_{ecosystem}_{timeframe}_{interval}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return hit;
        }
        let daily = self.resolve_ecosystem(ecosystem, timeframe).await;
        self.to_interval(key, &daily, interval)
    }

    /// Asset sentiment at `interval`, oldest first.
    pub async fn asset_sentiment_time_series(
        &self,
        asset: &str,
        timeframe: &str,
        interval: &str,
    ) -> Arc<TimeSeries> {
        let key = format!("asset_sentiment_ts_{asset}_{timeframe}_{interval}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return hit;
        }
        let daily = self.resolve_asset(asset, timeframe).await;
        self.to_interval(key, &daily, interval)
    }

    fn to_interval(&self, key: String, daily: &Resolved, interval: &str) -> Arc<TimeSeries> {
        let chronological = daily.series.reversed();
        let series = downsample(&chronological, timeframe_days(interval));
        if daily.cacheable {
            cache::store(&self.cache, key, series)
        } else {
            Arc::new(series)
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    async fn resolve_ecosystem(&self, ecosystem: &str, timeframe: &str) -> Resolved {
        let key = format!("ecosystem_sentiment_{ecosystem}_{timeframe}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Resolved::fused(hit);
        }

        match self.fetch_ecosystem(ecosystem, timeframe).await {
            Ok(EcosystemOutcome::Fused(scores)) => {
                let series = scores.iter().map(|s| s / 100.0).collect::<TimeSeries>();
                Resolved::fused(cache::store(&self.cache, key, series))
            }
            Ok(EcosystemOutcome::Aggregate(score)) => {
                tracing::debug!(ecosystem, score, "no per-asset sentiment, using flat aggregate");
                Resolved::flat(score / 100.0, timeframe)
            }
            Err(e) => {
                tracing::warn!(
                    ecosystem,
                    timeframe,
                    error = %format!("{e:#}"),
                    "ecosystem sentiment unavailable, using neutral score"
                );
                Resolved::flat(NEUTRAL_SENTIMENT, timeframe)
            }
        }
    }

    async fn resolve_asset(&self, asset: &str, timeframe: &str) -> Resolved {
        let key = format!("asset_sentiment_{asset}_{timeframe}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Resolved::fused(hit);
        }

        let options = SentimentOptions::new(timeframe);
        let summary = match self.sentiment.analyze_sentiment(asset, &options).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    asset,
                    timeframe,
                    error = %format!("{e:#}"),
                    "asset sentiment unavailable, using neutral score"
                );
                return Resolved::flat(NEUTRAL_SENTIMENT, timeframe);
            }
        };

        match self.sentiment_samples(asset, timeframe).await {
            Some(scores) => {
                let series = scores.iter().map(|s| s / 100.0).collect::<TimeSeries>();
                Resolved::fused(cache::store(&self.cache, key, series))
            }
            None => Resolved::flat(summary.normalized_score, timeframe),
        }
    }

    async fn fetch_ecosystem(
        &self,
        ecosystem: &str,
        timeframe: &str,
    ) -> anyhow::Result<EcosystemOutcome> {
        let options = SentimentOptions::new(timeframe).with_limit(self.config.constituent_limit);
        let summary = self
            .sentiment
            .analyze_ecosystem_sentiment(ecosystem, &options)
            .await?;

        let mut weighted = Vec::with_capacity(summary.top_assets.len());
        for asset in &summary.top_assets {
            if let Some(values) = self.sentiment_samples(&asset.symbol, timeframe).await {
                weighted.push(WeightedSeries {
                    market_cap: effective_market_cap(asset, self.config.default_market_cap),
                    values,
                });
            }
        }

        if weighted.is_empty() {
            return Ok(EcosystemOutcome::Aggregate(summary.aggregate_score));
        }
        Ok(EcosystemOutcome::Fused(fuse_weighted(&weighted)))
    }

    /// Raw 0-100 sentiment samples for an asset, newest first.
    ///
    /// Failures and empty results both read as `None`.
    async fn sentiment_samples(&self, symbol: &str, timeframe: &str) -> Option<Vec<f64>> {
        match self
            .market
            .time_series(symbol, DAILY_INTERVAL, timeframe_days(timeframe))
            .await
        {
            Ok(points) if !points.is_empty() => Some(extract_ordered(
                &points,
                DataPoint::sentiment_or_neutral,
                SampleOrder::NewestFirst,
            )),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(symbol, error = %format!("{e:#}"), "sentiment samples unavailable");
                None
            }
        }
    }
}
