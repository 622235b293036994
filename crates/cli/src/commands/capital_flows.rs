//! Capital flow estimation command.

use super::{ecosystems_or_configured, print_json};
use anyhow::Result;
use clap::Args;
use eco_corr_core::AppConfig;
use eco_corr_engine::{CapitalFlowOptions, EcosystemCorrelator};

#[derive(Args, Debug, Clone)]
pub struct CapitalFlowsArgs {
    /// Ecosystems to include; defaults to every configured ecosystem
    pub ecosystems: Vec<String>,

    /// Window over which volume change is measured
    #[arg(long, default_value = "14d")]
    pub timeframe: String,

    /// Smallest flow reported, as a percentage of its source ecosystem's total outflow
    #[arg(long, default_value_t = 5.0)]
    pub min_flow_percentage: f64,
}

/// Runs the capital-flows command.
///
/// # Errors
/// Returns an error if any ecosystem's volume change cannot be computed.
pub async fn run_capital_flows(
    correlator: &EcosystemCorrelator,
    config: &AppConfig,
    args: CapitalFlowsArgs,
) -> Result<()> {
    let ecosystems = ecosystems_or_configured(args.ecosystems, config);
    let options = CapitalFlowOptions {
        timeframe: args.timeframe,
        min_flow_percentage: args.min_flow_percentage,
    };

    tracing::info!(ecosystems = ?ecosystems, timeframe = %options.timeframe, "estimating capital flows");
    let analysis = correlator.capital_flows(&ecosystems, &options).await?;

    if analysis.significant_flows.is_empty() {
        tracing::info!("no flows above threshold");
    }
    print_json(analysis.as_ref())
}
