use super::{
    extract_ordered, fetch_asset_points, fetch_fused_ecosystem, FusionRequest, SampleOrder,
    DAILY_INTERVAL,
};
use crate::cache::{self, AnalysisCache};
use eco_corr_core::{
    timeframe_days, AnalysisConfig, CorrelationError, DataPoint, MarketDataProvider, Result,
    TimeSeries,
};
use serde::Serialize;
use std::sync::Arc;

/// Scales volumes into `[0, 1]` by dividing by the series maximum.
///
/// A series whose maximum is not positive scales to all zeros.
pub fn scale_to_max(volumes: &[f64]) -> TimeSeries {
    let max = volumes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0 && max.is_finite()) {
        return TimeSeries::flat(0.0, volumes.len());
    }
    volumes.iter().map(|v| v / max).collect()
}

/// Volume movement of an ecosystem across a timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeChange {
    pub ecosystem: String,
    /// Oldest normalized volume
    pub start_volume: f64,
    /// Newest normalized volume
    pub end_volume: f64,
    pub change: f64,
    pub percent_change: f64,
    pub timeframe: String,
}

impl VolumeChange {
    /// Builds a change record from newest-first normalized volumes.
    ///
    /// # Errors
    /// `NoData` when `volumes` is empty.
    pub fn from_newest_first(ecosystem: &str, timeframe: &str, volumes: &[f64]) -> Result<Self> {
        let (Some(&end_volume), Some(&start_volume)) = (volumes.first(), volumes.last()) else {
            return Err(CorrelationError::no_data(ecosystem, "no volume samples"));
        };

        let change = end_volume - start_volume;
        let percent_change = if start_volume == 0.0 {
            0.0
        } else {
            change / start_volume * 100.0
        };

        Ok(Self {
            ecosystem: ecosystem.to_string(),
            start_volume,
            end_volume,
            change,
            percent_change,
            timeframe: timeframe.to_string(),
        })
    }

    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.change < 0.0
    }

    #[must_use]
    pub fn is_gain(&self) -> bool {
        self.change > 0.0
    }
}

/// Volume normalizer: fused, max-scaled volume series.
pub struct VolumeMetrics {
    market: Arc<dyn MarketDataProvider>,
    cache: Arc<AnalysisCache>,
    config: AnalysisConfig,
}

impl VolumeMetrics {
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

    /// Daily max-scaled volumes for an ecosystem, newest first.
    ///
    /// # Errors
    /// `NoData` when the ecosystem has no constituents with samples,
    /// `Provider` on fetch failure.
    pub async fn ecosystem_volume_data(
        &self,
        ecosystem: &str,
        timeframe: &str,
    ) -> Result<Arc<TimeSeries>> {
        let key = format!("ecosystem_volume_{ecosystem}_{timeframe}");
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
                field: "volume",
            },
            DataPoint::volume_or_zero,
        )
        .await?;

        Ok(cache::store(&self.cache, key, scale_to_max(&fused)))
    }

    /// Daily max-scaled volumes for one asset, newest first.
    ///
    /// # Errors
    /// `NoData` when the asset has no samples, `Provider` on fetch failure.
    pub async fn asset_volume_data(&self, asset: &str, timeframe: &str) -> Result<Arc<TimeSeries>> {
        let key = format!("asset_volume_{asset}_{timeframe}");
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
        let volumes =
            extract_ordered(&points, DataPoint::volume_or_zero, SampleOrder::NewestFirst);

        Ok(cache::store(&self.cache, key, scale_to_max(&volumes)))
    }

    /// Raw fused volumes at `interval`, oldest first.
    ///
    /// # Errors
    /// Same as [`Self::ecosystem_volume_data`].
    pub async fn ecosystem_volume_time_series(
        &self,
        ecosystem: &str,
        timeframe: &str,
        interval: &str,
    ) -> Result<Arc<TimeSeries>> {
        let key = format!("ecosystem_volume_ts_{ecosystem}_{timeframe}_{interval}");
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
                field: "volume",
            },
            DataPoint::volume_or_zero,
        )
        .await?;

        Ok(cache::store(&self.cache, key, fused))
    }

    /// Raw asset volumes at `interval`, oldest first.
    ///
    /// # Errors
    /// Same as [`Self::asset_volume_data`].
    pub async fn asset_volume_time_series(
        &self,
        asset: &str,
        timeframe: &str,
        interval: &str,
    ) -> Result<Arc<TimeSeries>> {
        let key = format!("asset_volume_ts_{asset}_{timeframe}_{interval}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let points =
            fetch_asset_points(self.market.as_ref(), asset, interval, timeframe_days(timeframe))
                .await?;
        let volumes =
            extract_ordered(&points, DataPoint::volume_or_zero, SampleOrder::Chronological);

        Ok(cache::store(&self.cache, key, TimeSeries::new(volumes)))
    }

    /// Change between the oldest and newest normalized ecosystem volume.
    ///
    /// # Errors
    /// Propagates [`Self::ecosystem_volume_data`] failures.
    pub async fn ecosystem_volume_change(
        &self,
        ecosystem: &str,
        timeframe: &str,
    ) -> Result<Arc<VolumeChange>> {
        let key = format!("ecosystem_volume_change_{ecosystem}_{timeframe}");
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let volumes = self.ecosystem_volume_data(ecosystem, timeframe).await?;
        let change = VolumeChange::from_newest_first(ecosystem, timeframe, &volumes)?;

        Ok(cache::store(&self.cache, key, change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_by_maximum() {
        let scaled = scale_to_max(&[50.0, 100.0, 25.0]);
        assert_eq!(scaled.as_slice(), &[0.5, 1.0, 0.25]);
    }

    #[test]
    fn non_positive_maximum_scales_to_zeros() {
        assert_eq!(scale_to_max(&[0.0, 0.0]).as_slice(), &[0.0, 0.0]);
        assert_eq!(scale_to_max(&[-1.0, -2.0]).as_slice(), &[0.0, 0.0]);
        assert!(scale_to_max(&[]).is_empty());
    }

    #[test]
    fn volume_change_uses_oldest_as_start() {
        // newest first: end = 0.5, start = 1.0
        let change = VolumeChange::from_newest_first("solana", "14d", &[0.5, 0.8, 1.0]).unwrap();
        assert!((change.start_volume - 1.0).abs() < 1e-12);
        assert!((change.end_volume - 0.5).abs() < 1e-12);
        assert!((change.change + 0.5).abs() < 1e-12);
        assert!((change.percent_change + 50.0).abs() < 1e-9);
        assert!(change.is_loss());
        assert!(!change.is_gain());
    }

    #[test]
    fn zero_start_volume_has_zero_percent_change() {
        let change = VolumeChange::from_newest_first("defai", "14d", &[1.0, 0.0]).unwrap();
        assert!((change.percent_change - 0.0).abs() < f64::EPSILON);
        assert!(change.is_gain());
    }

    #[test]
    fn empty_volumes_is_no_data() {
        let err = VolumeChange::from_newest_first("defai", "14d", &[]).unwrap_err();
        assert!(matches!(err, CorrelationError::NoData { .. }));
    }
}
