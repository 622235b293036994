use clap::{Parser, Subcommand};

mod commands;

use commands::{
    AssetCorrelationsArgs, CapitalFlowsArgs, EcosystemCorrelationsArgs, LeadLagArgs,
};

#[derive(Parser)]
#[command(name = "eco-corr")]
#[command(about = "Cross-ecosystem correlation analysis for crypto markets", long_about = None)]
struct Cli {
    /// Config profile layered over config/Config.toml (loads config/Config.<profile>.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Skip the sentiment provider; the combined metric blends price and volume only
    #[arg(long, global = true)]
    no_sentiment: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate ecosystems pairwise
    EcosystemCorrelations(EcosystemCorrelationsArgs),
    /// Correlate individual assets pairwise
    AssetCorrelations(AssetCorrelationsArgs),
    /// Detect which ecosystems lead or lag the others
    LeadLag(LeadLagArgs),
    /// Estimate capital moving between ecosystems
    CapitalFlows(CapitalFlowsArgs),
}

fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            // stdout carries the JSON report
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let config = commands::load_config(cli.config.as_deref())?;
    let correlator = commands::build_correlator(&config, !cli.no_sentiment)?;

    match cli.command {
        Commands::EcosystemCorrelations(args) => {
            commands::run_ecosystem_correlations(&correlator, &config, args).await?;
        }
        Commands::AssetCorrelations(args) => {
            commands::run_asset_correlations(&correlator, &config, args).await?;
        }
        Commands::LeadLag(args) => {
            commands::run_lead_lag(&correlator, &config, args).await?;
        }
        Commands::CapitalFlows(args) => {
            commands::run_capital_flows(&correlator, &config, args).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_corr_core::Metric;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "eco-corr",
            "lead-lag",
            "solana",
            "ethereum",
            "--no-sentiment",
            "--config",
            "dev",
        ])
        .unwrap();

        assert!(cli.no_sentiment);
        assert_eq!(cli.config.as_deref(), Some("dev"));
        match cli.command {
            Commands::LeadLag(args) => {
                assert_eq!(args.ecosystems, vec!["solana", "ethereum"]);
                assert_eq!(args.lag_max, 14);
                assert_eq!(args.metric, Metric::Price);
            }
            _ => panic!("expected lead-lag"),
        }
    }

    #[test]
    fn correlation_defaults() {
        let cli = Cli::try_parse_from(["eco-corr", "ecosystem-correlations"]).unwrap();
        match cli.command {
            Commands::EcosystemCorrelations(args) => {
                assert!(args.ecosystems.is_empty());
                assert_eq!(args.timeframe, "30d");
                assert_eq!(args.metric, Metric::Combined);
                assert!((args.min_correlation - 0.5).abs() < f64::EPSILON);
            }
            _ => panic!("expected ecosystem-correlations"),
        }
    }

    #[test]
    fn asset_correlation_defaults_to_price() {
        let cli =
            Cli::try_parse_from(["eco-corr", "asset-correlations", "BTC", "ETH"]).unwrap();
        match cli.command {
            Commands::AssetCorrelations(args) => {
                assert_eq!(args.assets, vec!["BTC", "ETH"]);
                assert_eq!(args.metric, Metric::Price);
            }
            _ => panic!("expected asset-correlations"),
        }
    }

    #[test]
    fn capital_flow_defaults() {
        let cli = Cli::try_parse_from(["eco-corr", "capital-flows", "--timeframe", "7d"]).unwrap();
        match cli.command {
            Commands::CapitalFlows(args) => {
                assert_eq!(args.timeframe, "7d");
                assert!((args.min_flow_percentage - 5.0).abs() < f64::EPSILON);
            }
            _ => panic!("expected capital-flows"),
        }
    }

    #[test]
    fn flow_threshold_help_describes_source_outflow() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        let sub = cmd.find_subcommand("capital-flows").unwrap();
        let arg = sub
            .get_arguments()
            .find(|a| a.get_id().as_str() == "min_flow_percentage")
            .unwrap();
        let help = arg.get_help().unwrap().to_string();
        assert!(help.contains("total outflow"), "{help}");
    }

    #[test]
    fn rejects_unknown_metric() {
        let result = Cli::try_parse_from(["eco-corr", "lead-lag", "--metric", "momentum"]);
        assert!(result.is_err());
    }
}
