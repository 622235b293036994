use super::{
    extract_ordered, fetch_asset_points, fetch_fused_ecosystem, FusionRequest, SampleOrder,
    DAILY_INTERVAL,
};
use crate::cache::{self, AnalysisCache};
use eco_corr_core::{timeframe_days, AnalysisConfig, DataPoint, MarketDataProvider, Result, TimeSeries};
use std::sync::Arc;

/// Converts prices into ratios against the previous sample.
///
/// `out[0] = 1`, `out[i] = p[i] / p[i-1]`; a zero predecessor yields 1.
pub fn to_sequential_ratios(prices: &[f64]) -> TimeSeries {
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| match i.checked_sub(1).map(|prev| prices[prev]) {
            Some(prev) if prev != 0.0 => price / prev,
            _ => 1.0,
        })
        .collect()
}

/// Price normalizer: fused, ratio-normalized price series.
pub struct PriceMetrics {
    market: Arc<dyn MarketDataProvider>,
    cache: Arc<AnalysisCache>,
    config: AnalysisConfig,
}

impl PriceMetrics {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        cache: Arc<AnalysisCache>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            market,
            cache,
            config,
        }
    }

    /// Daily price ratios for an ecosystem, newest first.
    ///
    /// # Errors
    /// `NoData` when the ecosystem has no priced constituents, `Provider` on
    /// fetch failure.
    pub async fn ecosystem_price_data(
        &self,
        ecosystem: &str,
        timeframe: &str,
    ) -> Result<Arc<TimeSeries>> {
        let key = format!("ecosystem_price_{ecosystem}_{timeframe}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let fused = fetch_fused_ecosystem(
            self.market.as_ref(),
            FusionRequest {
                ecosystem,
                interval: DAILY_INTERVAL,
                days_back: timeframe_days(timeframe),
                limit: self.config.constituent_limit,
                default_market_cap: self.config.default_market_cap,
                order: SampleOrder::NewestFirst,
                field: "price",
            },
            DataPoint::price_or_zero,
        )
        .await?;

        Ok(cache::store(&self.cache, key, to_sequential_ratios(&fused)))
    }

    /// Daily price ratios for one asset, newest first.
    ///
    /// # Errors
    /// `NoData` when the asset has no samples, `Provider` on fetch failure.
    pub async fn asset_price_data(&self, asset: &str, timeframe: &str) -> Result<Arc<TimeSeries>> {
        let key = format!("asset_price_{asset}_{timeframe}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let points = fetch_asset_points(
            self.market.as_ref(),
            asset,
            DAILY_INTERVAL,
            timeframe_days(timeframe),
        )
        .await?;
        let prices = extract_ordered(&points, DataPoint::price_or_zero, SampleOrder::NewestFirst);

        Ok(cache::store(&self.cache, key, to_sequential_ratios(&prices)))
    }

    /// Raw fused prices at `interval`, oldest first.
    ///
    /// # Errors
    /// Same as [`Self::ecosystem_price_data`].
    pub async fn ecosystem_price_time_series(
        &self,
        ecosystem: &str,
        timeframe: &str,
        interval: &str,
    ) -> Result<Arc<TimeSeries>> {
        let key = format!("ecosystem_price_ts_{ecosystem}_{timeframe}_{interval}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let fused = fetch_fused_ecosystem(
            self.market.as_ref(),
            FusionRequest {
                ecosystem,
                interval,
                days_back: timeframe_days(timeframe),
                limit: self.config.time_series_constituent_limit,
                default_market_cap: self.config.default_market_cap,
                order: SampleOrder::Chronological,
                field: "price",
            },
            DataPoint::price_or_zero,
        )
        .await?;

        Ok(cache::store(&self.cache, key, fused))
    }

    /// Raw asset prices at `interval`, oldest first.
    ///
    /// # Errors
    /// Same as [`Self::asset_price_data`].
    pub async fn asset_price_time_series(
        &self,
        asset: &str,
        timeframe: &str,
        interval: &str,
    ) -> Result<Arc<TimeSeries>> {
        let key = format!("asset_price_ts_{asset}_{timeframe}_{interval}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let points =
            fetch_asset_points(self.market.as_ref(), asset, interval, timeframe_days(timeframe))
                .await?;
        let prices = extract_ordered(&points, DataPoint::price_or_zero, SampleOrder::Chronological);

        Ok(cache::store(&self.cache, key, TimeSeries::new(prices)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_start_at_one() {
        let ratios = to_sequential_ratios(&[100.0, 110.0, 99.0]);
        assert_eq!(ratios.len(), 3);
        assert!((ratios[0] - 1.0).abs() < 1e-12);
        assert!((ratios[1] - 1.1).abs() < 1e-12);
        assert!((ratios[2] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn zero_predecessor_yields_one() {
        let ratios = to_sequential_ratios(&[0.0, 5.0, 10.0]);
        assert!((ratios[1] - 1.0).abs() < 1e-12);
        assert!((ratios[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_sample_is_one_and_empty_stays_empty() {
        assert_eq!(to_sequential_ratios(&[42.0]).as_slice(), &[1.0]);
        assert!(to_sequential_ratios(&[]).is_empty());
    }
}
