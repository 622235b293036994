//! Lead-lag detection command.

use super::{ecosystems_or_configured, print_json};
use anyhow::Result;
use clap::Args;
use eco_corr_core::{AppConfig, Metric};
use eco_corr_engine::{EcosystemCorrelator, LeadLagOptions};

#[derive(Args, Debug, Clone)]
pub struct LeadLagArgs {
    /// Ecosystems to compare; defaults to every configured ecosystem
    pub ecosystems: Vec<String>,

    /// Lookback window (e.g., "30d", "90d")
    #[arg(long, default_value = "90d")]
    pub timeframe: String,

    /// Sampling interval of each series (e.g., "1d", "1w")
    #[arg(long, default_value = "1d")]
    pub interval: String,

    /// price, volume, or sentiment
    #[arg(long, default_value = "price")]
    pub metric: Metric,

    /// Largest shift tested in either direction, in samples
    #[arg(long, default_value_t = 14)]
    pub lag_max: u32,
}

impl From<LeadLagArgs> for LeadLagOptions {
    fn from(args: LeadLagArgs) -> Self {
        Self {
            timeframe: args.timeframe,
            interval: args.interval,
            metric: args.metric,
            lag_max: args.lag_max,
        }
    }
}

/// Runs the lead-lag command.
///
/// # Errors
/// Returns an error for the combined metric or when any series cannot be built.
pub async fn run_lead_lag(
    correlator: &EcosystemCorrelator,
    config: &AppConfig,
    mut args: LeadLagArgs,
) -> Result<()> {
    let ecosystems = ecosystems_or_configured(std::mem::take(&mut args.ecosystems), config);
    let options = LeadLagOptions::from(args);

    tracing::info!(
        ecosystems = ?ecosystems,
        metric = %options.metric,
        lag_max = options.lag_max,
        "detecting lead-lag relationships"
    );
    let analysis = correlator
        .lead_lag_relationships(&ecosystems, &options)
        .await?;

    print_json(analysis.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_onto_options() {
        let args = LeadLagArgs {
            ecosystems: vec!["solana".into()],
            timeframe: "30d".into(),
            interval: "1w".into(),
            metric: Metric::Volume,
            lag_max: 3,
        };
        let options = LeadLagOptions::from(args);
        assert_eq!(options.timeframe, "30d");
        assert_eq!(options.interval, "1w");
        assert_eq!(options.metric, Metric::Volume);
        assert_eq!(options.lag_max, 3);
    }
}
