//! Metric normalizers.
//!
//! Each family fetches raw per-asset samples, fuses constituents into a
//! market-cap-weighted ecosystem series, then applies its own normalization:
//! sequential ratios for price, max-scaling for volume, `/100` for sentiment.

mod price;
mod sentiment;
mod volume;

pub use price::{to_sequential_ratios, PriceMetrics};
pub use sentiment::{SentimentMetrics, NEUTRAL_SENTIMENT};
pub use volume::{scale_to_max, VolumeChange, VolumeMetrics};

use eco_corr_core::{
    Constituent, CorrelationError, DataPoint, MarketDataProvider, Result, TimeSeries,
};

/// Interval used by the daily `*_data` variants.
pub(crate) const DAILY_INTERVAL: &str = "1d";

/// Sample order a fused series is aligned and returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SampleOrder {
    /// Index 0 is the most recent sample
    NewestFirst,
    /// Index 0 is the oldest sample
    Chronological,
}

/// One constituent's samples with its fusion weight.
#[derive(Debug, Clone)]
pub(crate) struct WeightedSeries {
    pub market_cap: f64,
    pub values: Vec<f64>,
}

/// Resolves the weight for a constituent, substituting `default` for a
/// missing, zero, or non-finite market cap.
pub(crate) fn effective_market_cap(constituent: &Constituent, default: f64) -> f64 {
    match constituent.market_cap {
        Some(mc) if mc > 0.0 && mc.is_finite() => mc,
        _ => default,
    }
}

/// Market-cap-weighted average at each index.
///
/// The output has the first series' length; at each index only series that
/// have a sample there contribute, so `weighted = Σ(v·mc) / Σ(mc)` over those.
pub(crate) fn fuse_weighted(series: &[WeightedSeries]) -> TimeSeries {
    let Some(first) = series.first() else {
        return TimeSeries::default();
    };

    (0..first.values.len())
        .filter_map(|i| {
            let (weighted, total_weight) = series
                .iter()
                .filter_map(|s| s.values.get(i).map(|v| (v * s.market_cap, s.market_cap)))
                .fold((0.0, 0.0), |(acc_v, acc_w), (v, w)| (acc_v + v, acc_w + w));

            (total_weight > 0.0).then(|| weighted / total_weight)
        })
        .collect()
}

/// Parameters for fetching and fusing an ecosystem's constituents.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FusionRequest<'a> {
    pub ecosystem: &'a str,
    pub interval: &'a str,
    pub days_back: f64,
    pub limit: usize,
    pub default_market_cap: f64,
    pub order: SampleOrder,
    pub field: &'a str,
}

/// Fetches every constituent of an ecosystem one at a time and fuses them.
///
/// Provider failures propagate; constituents with no samples are skipped.
///
/// # Errors
/// `NoData` if the ecosystem has no constituents or none returned samples,
/// `Provider` if any fetch fails.
pub(crate) async fn fetch_fused_ecosystem(
    market: &dyn MarketDataProvider,
    request: FusionRequest<'_>,
    extract: fn(&DataPoint) -> f64,
) -> Result<TimeSeries> {
    let constituents = market
        .ecosystem_constituents(request.ecosystem, request.limit)
        .await
        .map_err(|e| CorrelationError::provider(request.ecosystem, e))?;

    if constituents.is_empty() {
        return Err(CorrelationError::no_data(
            request.ecosystem,
            "no constituents found",
        ));
    }

    let mut weighted = Vec::with_capacity(constituents.len());
    for constituent in &constituents {
        let points = market
            .time_series(&constituent.symbol, request.interval, request.days_back)
            .await
            .map_err(|e| CorrelationError::provider(&constituent.symbol, e))?;

        if points.is_empty() {
            tracing::debug!(
                ecosystem = request.ecosystem,
                symbol = %constituent.symbol,
                field = request.field,
                "constituent returned no samples"
            );
            continue;
        }

        weighted.push(WeightedSeries {
            market_cap: effective_market_cap(constituent, request.default_market_cap),
            values: extract_ordered(&points, extract, request.order),
        });
    }

    if weighted.is_empty() {
        return Err(CorrelationError::no_data(
            request.ecosystem,
            format!("no {} samples for any constituent", request.field),
        ));
    }

    tracing::debug!(
        ecosystem = request.ecosystem,
        field = request.field,
        constituents = weighted.len(),
        "fused ecosystem series"
    );

    Ok(fuse_weighted(&weighted))
}

/// Fetches one asset's samples.
///
/// # Errors
/// `Provider` if the fetch fails, `NoData` if it returns nothing.
pub(crate) async fn fetch_asset_points(
    market: &dyn MarketDataProvider,
    asset: &str,
    interval: &str,
    days_back: f64,
) -> Result<Vec<DataPoint>> {
    let points = market
        .time_series(asset, interval, days_back)
        .await
        .map_err(|e| CorrelationError::provider(asset, e))?;

    if points.is_empty() {
        return Err(CorrelationError::no_data(asset, "no time series samples"));
    }
    Ok(points)
}

/// Extracts one field from provider samples (which arrive oldest first).
pub(crate) fn extract_ordered(
    points: &[DataPoint],
    extract: fn(&DataPoint) -> f64,
    order: SampleOrder,
) -> Vec<f64> {
    match order {
        SampleOrder::Chronological => points.iter().map(extract).collect(),
        SampleOrder::NewestFirst => points.iter().rev().map(extract).collect(),
    }
}

/// Averages consecutive blocks of `period_days` daily samples.
///
/// Periods of one day or less return the input unchanged; a trailing partial
/// block is averaged over the samples it has.
pub(crate) fn downsample(values: &[f64], period_days: f64) -> TimeSeries {
    if period_days <= 1.0 || values.is_empty() {
        return TimeSeries::new(values.to_vec());
    }

    let block = (period_days.round() as usize).max(1);
    values
        .chunks(block)
        .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(market_cap: f64, values: &[f64]) -> WeightedSeries {
        WeightedSeries {
            market_cap,
            values: values.to_vec(),
        }
    }

    // ============================================
    // fuse_weighted
    // ============================================

    #[test]
    fn fuse_single_series_is_identity() {
        let fused = fuse_weighted(&[weighted(5.0, &[1.0, 2.0, 3.0])]);
        assert_eq!(fused.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn fuse_weights_by_market_cap() {
        let fused = fuse_weighted(&[weighted(3.0, &[10.0, 20.0]), weighted(1.0, &[2.0, 4.0])]);
        // (10*3 + 2*1) / 4 = 8, (20*3 + 4*1) / 4 = 16
        assert!((fused[0] - 8.0).abs() < 1e-12);
        assert!((fused[1] - 16.0).abs() < 1e-12);
    }

    #[test]
    fn fuse_uses_only_series_present_at_index() {
        let fused = fuse_weighted(&[weighted(1.0, &[1.0, 1.0, 1.0]), weighted(1.0, &[3.0])]);
        assert_eq!(fused.len(), 3);
        assert!((fused[0] - 2.0).abs() < 1e-12);
        assert!((fused[1] - 1.0).abs() < 1e-12);
        assert!((fused[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fuse_length_follows_first_series() {
        let fused = fuse_weighted(&[weighted(1.0, &[1.0]), weighted(1.0, &[3.0, 5.0, 7.0])]);
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn fuse_empty_input_is_empty() {
        assert!(fuse_weighted(&[]).is_empty());
    }

    // ============================================
    // market cap / ordering / downsampling
    // ============================================

    #[test]
    fn missing_or_zero_market_cap_uses_default() {
        let default = 1e9;
        assert!((effective_market_cap(&Constituent::new("A", None), default) - default).abs() < 1.0);
        assert!(
            (effective_market_cap(&Constituent::new("A", Some(0.0)), default) - default).abs()
                < 1.0
        );
        assert!(
            (effective_market_cap(&Constituent::new("A", Some(5.0)), default) - 5.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn newest_first_reverses_provider_order() {
        let points: Vec<DataPoint> = [1.0, 2.0, 3.0]
            .iter()
            .map(|p| DataPoint {
                price: Some(*p),
                ..DataPoint::default()
            })
            .collect();
        assert_eq!(
            extract_ordered(&points, DataPoint::price_or_zero, SampleOrder::NewestFirst),
            vec![3.0, 2.0, 1.0]
        );
        assert_eq!(
            extract_ordered(&points, DataPoint::price_or_zero, SampleOrder::Chronological),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn downsample_averages_blocks() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let weekly = downsample(&values, 7.0);
        assert_eq!(weekly.len(), 2);
        assert!((weekly[0] - 4.0).abs() < 1e-12);
        assert!((weekly[1] - 8.5).abs() < 1e-12);
    }

    #[test]
    fn downsample_daily_or_finer_is_unchanged() {
        let values = [0.2, 0.4, 0.6];
        assert_eq!(downsample(&values, 1.0).as_slice(), &values);
        assert_eq!(downsample(&values, 1.0 / 6.0).as_slice(), &values);
    }
}
