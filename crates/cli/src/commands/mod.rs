//! CLI commands for cross-ecosystem correlation analysis.

pub mod capital_flows;
pub mod correlations;
pub mod lead_lag;

pub use capital_flows::{run_capital_flows, CapitalFlowsArgs};
pub use correlations::{
    run_asset_correlations, run_ecosystem_correlations, AssetCorrelationsArgs,
    EcosystemCorrelationsArgs,
};
pub use lead_lag::{run_lead_lag, LeadLagArgs};

use anyhow::Result;
use eco_corr_core::{AppConfig, ConfigLoader, MarketDataProvider, SentimentProvider};
use eco_corr_engine::EcosystemCorrelator;
use eco_corr_lunarcrush::{LunarCrushClient, LunarCrushConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Loads layered configuration, optionally with a named profile.
///
/// # Errors
/// Returns an error if a config source is malformed or the blend weights are invalid.
pub fn load_config(profile: Option<&str>) -> Result<AppConfig> {
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile)?,
        None => ConfigLoader::load()?,
    };
    tracing::debug!(
        base_url = %config.provider.base_url,
        ecosystems = config.ecosystems.0.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Wires the LunarCrush client into a correlator and starts the cache sweeper.
///
/// # Errors
/// Returns an error if the HTTP client or correlator cannot be built.
pub fn build_correlator(config: &AppConfig, with_sentiment: bool) -> Result<EcosystemCorrelator> {
    let client = Arc::new(LunarCrushClient::new(LunarCrushConfig::from(
        &config.provider,
    ))?);

    let market: Arc<dyn MarketDataProvider> = client.clone();
    let sentiment: Option<Arc<dyn SentimentProvider>> = if with_sentiment {
        Some(client)
    } else {
        tracing::info!("sentiment disabled");
        None
    };

    let correlator = EcosystemCorrelator::from_config(config, market, sentiment)?;

    if config.cache.sweep_interval_secs > 0 {
        let _sweeper = correlator
            .cache()
            .spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));
    }

    Ok(correlator)
}

/// Falls back to every configured ecosystem when none were given.
pub(crate) fn ecosystems_or_configured(requested: Vec<String>, config: &AppConfig) -> Vec<String> {
    if requested.is_empty() {
        config.ecosystems.names()
    } else {
        requested
    }
}

/// Prints a result as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_uses_configured_ecosystems() {
        let config = AppConfig::default();
        let resolved = ecosystems_or_configured(Vec::new(), &config);
        assert_eq!(resolved, config.ecosystems.names());
        assert_eq!(resolved.len(), 5);
    }

    #[test]
    fn explicit_request_is_kept_in_order() {
        let config = AppConfig::default();
        let requested = vec!["solana".to_string(), "bitcoin".to_string()];
        assert_eq!(ecosystems_or_configured(requested.clone(), &config), requested);
    }
}
