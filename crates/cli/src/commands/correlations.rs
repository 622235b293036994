//! Correlation commands for ecosystems and individual assets.

use super::{ecosystems_or_configured, print_json};
use anyhow::{anyhow, Result};
use clap::Args;
use eco_corr_core::{AppConfig, Metric};
use eco_corr_engine::{CorrelationOptions, EcosystemCorrelator};

/// Arguments for the ecosystem-correlations command.
#[derive(Args, Debug, Clone)]
pub struct EcosystemCorrelationsArgs {
    /// Ecosystems to correlate; defaults to every configured ecosystem
    pub ecosystems: Vec<String>,

    /// Lookback window (e.g., "7d", "30d", "1y")
    #[arg(long, default_value = "30d")]
    pub timeframe: String,

    /// price, volume, sentiment, or combined
    #[arg(long, default_value = "combined")]
    pub metric: Metric,

    /// Minimum correlation for a pair to be reported
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub min_correlation: f64,
}

/// Arguments for the asset-correlations command.
#[derive(Args, Debug, Clone)]
pub struct AssetCorrelationsArgs {
    /// Asset symbols to correlate
    pub assets: Vec<String>,

    /// Use the configured symbols of this ecosystem when no assets are given
    #[arg(long)]
    pub ecosystem: Option<String>,

    /// Lookback window (e.g., "7d", "30d", "1y")
    #[arg(long, default_value = "30d")]
    pub timeframe: String,

    /// price, volume, sentiment, or combined
    #[arg(long, default_value = "price")]
    pub metric: Metric,

    /// Minimum correlation for a pair to be reported
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub min_correlation: f64,
}

/// Runs the ecosystem-correlations command.
///
/// # Errors
/// Returns an error if any ecosystem's series cannot be built.
pub async fn run_ecosystem_correlations(
    correlator: &EcosystemCorrelator,
    config: &AppConfig,
    args: EcosystemCorrelationsArgs,
) -> Result<()> {
    let ecosystems = ecosystems_or_configured(args.ecosystems, config);
    let options = CorrelationOptions::ecosystem_defaults()
        .with_timeframe(args.timeframe)
        .with_metric(args.metric)
        .with_min_correlation(args.min_correlation);

    tracing::info!(ecosystems = ?ecosystems, metric = %options.metric, "correlating ecosystems");
    let analysis = correlator
        .ecosystem_correlations(&ecosystems, &options)
        .await?;

    print_json(analysis.as_ref())
}

/// Runs the asset-correlations command.
///
/// # Errors
/// Returns an error if no assets resolve or any asset's series cannot be built.
pub async fn run_asset_correlations(
    correlator: &EcosystemCorrelator,
    config: &AppConfig,
    args: AssetCorrelationsArgs,
) -> Result<()> {
    let assets = resolve_assets(args.assets, args.ecosystem.as_deref(), config)?;
    let options = CorrelationOptions::asset_defaults()
        .with_timeframe(args.timeframe)
        .with_metric(args.metric)
        .with_min_correlation(args.min_correlation);

    tracing::info!(assets = ?assets, metric = %options.metric, "correlating assets");
    let analysis = correlator.asset_correlations(&assets, &options).await?;

    print_json(analysis.as_ref())
}

fn resolve_assets(
    assets: Vec<String>,
    ecosystem: Option<&str>,
    config: &AppConfig,
) -> Result<Vec<String>> {
    if !assets.is_empty() {
        return Ok(assets);
    }

    let ecosystem =
        ecosystem.ok_or_else(|| anyhow!("pass asset symbols or --ecosystem <name>"))?;
    config
        .ecosystems
        .symbols(ecosystem)
        .map(<[String]>::to_vec)
        .ok_or_else(|| anyhow!("ecosystem '{ecosystem}' is not configured"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_assets_win() {
        let config = AppConfig::default();
        let assets = resolve_assets(vec!["BTC".into()], Some("solana"), &config).unwrap();
        assert_eq!(assets, vec!["BTC"]);
    }

    #[test]
    fn configured_ecosystem_symbols_are_used() {
        let config = AppConfig::default();
        let assets = resolve_assets(Vec::new(), Some("bitcoin"), &config).unwrap();
        assert_eq!(assets, config.ecosystems.symbols("bitcoin").unwrap());
    }

    #[test]
    fn unknown_ecosystem_is_an_error() {
        let config = AppConfig::default();
        assert!(resolve_assets(Vec::new(), Some("nowhere"), &config).is_err());
        assert!(resolve_assets(Vec::new(), None, &config).is_err());
    }
}
