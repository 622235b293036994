//! Combined metric: weighted blend of price, volume, and optional sentiment.

use eco_corr_core::{BlendWeights, TimeSeries};

/// `primary_weight·primary[i] + (1 − primary_weight)·secondary[i]` over the
/// primary's indices; a missing secondary sample contributes 0.
fn weighted_blend(primary: &[f64], secondary: &[f64], primary_weight: f64) -> TimeSeries {
    let secondary_weight = 1.0 - primary_weight;
    primary
        .iter()
        .enumerate()
        .map(|(i, p)| {
            primary_weight * p + secondary_weight * secondary.get(i).copied().unwrap_or(0.0)
        })
        .collect()
}

fn with_sentiment(blend: TimeSeries, sentiment: Option<&[f64]>, weight: f64) -> TimeSeries {
    match sentiment {
        Some(sentiment) => weighted_blend(&blend, sentiment, 1.0 - weight),
        None => blend,
    }
}

/// Ecosystem blend. Length follows the volume series.
pub fn combine_ecosystem(
    price: &[f64],
    volume: &[f64],
    sentiment: Option<&[f64]>,
    weights: &BlendWeights,
) -> TimeSeries {
    let price_weight = weights.ecosystem_price;
    let blend = volume
        .iter()
        .enumerate()
        .map(|(i, v)| {
            price_weight * price.get(i).copied().unwrap_or(0.0) + (1.0 - price_weight) * v
        })
        .collect();
    with_sentiment(blend, sentiment, weights.sentiment)
}

/// Asset blend. Length follows the price series.
pub fn combine_asset(
    price: &[f64],
    volume: &[f64],
    sentiment: Option<&[f64]>,
    weights: &BlendWeights,
) -> TimeSeries {
    let blend = weighted_blend(price, volume, weights.asset_price);
    with_sentiment(blend, sentiment, weights.sentiment)
}
