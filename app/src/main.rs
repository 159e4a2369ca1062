// In app/src/main.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use api_client::{AlpacaProvider, BarProvider, DataAcquisition, FixtureProvider};
use app_config::{ScanRequestFile, Settings};
use clap::{Args, Parser, Subcommand};
use core_types::{ScanReport, ScanRequest, Timeframe};
use engine::{RefreshScheduler, ScanSession, Scanner};
use strategies::StrategyRegistry;
use tracing_subscriber::prelude::*;

mod report;

use crate::report::{render_catalog, render_report};

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Scans equities for buy and sell signals across a catalog of technical strategies.")]
struct Cli {
    /// Serve bars from a JSON fixture file instead of the market data API.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Directory holding base.toml and the environment overrides.
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs one scan and prints the report.
    Scan(ScanArgs),

    /// Scans repeatedly on the refresh interval until interrupted.
    Watch {
        #[command(flatten)]
        scan: ScanArgs,

        /// Seconds between refreshes; defaults to the configured interval.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Checks connectivity to the data provider.
    Status,

    /// Lists every registered strategy.
    Strategies,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// Symbols to scan, comma separated (e.g., "AAPL,MSFT").
    #[arg(short, long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Strategy ids to evaluate, comma separated.
    #[arg(short = 'S', long = "strategy", value_delimiter = ',')]
    strategies: Vec<String>,

    /// Bar timeframe (1Min, 5Min, 15Min, 30Min, 1Hour, 4Hour, 1Day).
    #[arg(short, long)]
    timeframe: Option<Timeframe>,

    /// Bars to fetch per symbol.
    #[arg(short, long)]
    limit: Option<usize>,

    /// Read the request from a TOML file; flags override its fields.
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// Print the JSON wire form instead of the table.
    #[arg(long)]
    json: bool,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings_from(&cli.config_dir)
        .with_context(|| format!("loading settings from {}", cli.config_dir.display()))?;

    let level = settings
        .app
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("reqwest", tracing::Level::WARN)
            .with_target("hyper", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::info!(environment = %settings.app.environment, "Starting signal scanner");

    match cli.command {
        Commands::Scan(args) => {
            let scanner = build_scanner(&settings, cli.fixture.as_ref())?;
            let request = build_request(&args, &settings)?;
            handle_scan(&scanner, request, args.json).await?;
        }
        Commands::Watch { scan, interval } => {
            let scanner = build_scanner(&settings, cli.fixture.as_ref())?;
            let request = build_request(&scan, &settings)?;
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| settings.scanner.refresh_interval());
            handle_watch(scanner, request, interval, scan.json).await?;
        }
        Commands::Status => {
            let scanner = build_scanner(&settings, cli.fixture.as_ref())?;
            let status = scanner.status().await;
            println!(
                "{}: {}",
                if status.connected { "connected" } else { "disconnected" },
                status.message
            );
        }
        Commands::Strategies => {
            let registry = StrategyRegistry::builtin()?;
            print!("{}", render_catalog(&registry));
        }
    }

    Ok(())
}

// --- Wiring ---

fn build_scanner(settings: &Settings, fixture: Option<&PathBuf>) -> Result<Scanner> {
    let registry = Arc::new(StrategyRegistry::builtin()?);

    let provider: Arc<dyn BarProvider> = match fixture {
        Some(path) => {
            let provider = FixtureProvider::from_json_file(path)?;
            tracing::info!(path = %path.display(), "Using fixture bars");
            Arc::new(provider)
        }
        None => Arc::new(AlpacaProvider::new(&settings.alpaca)?),
    };

    let acquisition = DataAcquisition::from_settings(provider, &settings.acquisition);
    tracing::info!(
        provider = acquisition.provider_name(),
        strategies = registry.len(),
        "Scanner ready"
    );
    Ok(Scanner::new(registry, acquisition))
}

/// Request file (if any), then flags, then the `[scanner]` settings.
fn build_request(args: &ScanArgs, settings: &Settings) -> Result<ScanRequest> {
    let mut file = match &args.request {
        Some(path) => app_config::load_scan_request(path)
            .with_context(|| format!("reading scan request {}", path.display()))?,
        None => ScanRequestFile::default(),
    };

    if !args.symbols.is_empty() {
        file.symbols = args.symbols.clone();
    }
    if !args.strategies.is_empty() {
        file.strategies = args.strategies.clone();
    }
    if args.timeframe.is_some() {
        file.timeframe = args.timeframe;
    }
    if args.limit.is_some() {
        file.bar_limit = args.limit;
    }

    Ok(file.resolve(&settings.scanner)?)
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_wire())?);
    } else {
        print!("{}", render_report(report));
    }
    Ok(())
}

// --- Subcommand Logic ---

async fn handle_scan(scanner: &Scanner, request: ScanRequest, json: bool) -> Result<()> {
    let session = ScanSession::new();
    let report = scanner.run(&session, &request).await?;
    print_report(&report, json)?;
    if report.is_failed() {
        anyhow::bail!(
            "scan failed: {}",
            report.error.as_deref().unwrap_or("no symbol could be fetched")
        );
    }
    Ok(())
}

async fn handle_watch(scanner: Scanner, request: ScanRequest, interval: Duration, json: bool) -> Result<()> {
    // Reject bad requests before the loop starts.
    scanner.registry().check_ids(&request.strategy_ids)?;

    let session = ScanSession::with_request(request);
    let (handle, mut outcomes) = RefreshScheduler::spawn(Arc::new(scanner), session, interval);
    tracing::info!(interval_secs = interval.as_secs(), "Watching; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping the scheduler");
                break;
            }
            outcome = outcomes.recv() => match outcome {
                Some(Ok(report)) => print_report(&report, json)?,
                Some(Err(err)) => tracing::warn!(error = %err, "Refresh produced no report"),
                None => break,
            },
        }
    }

    handle.stop().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_rejects_a_zero_interval() {
        assert!(Cli::try_parse_from(["signal-scanner", "watch", "--interval", "0"]).is_err());

        let cli = Cli::try_parse_from(["signal-scanner", "watch", "--interval", "5", "-s", "AAPL,MSFT"]).unwrap();
        match cli.command {
            Commands::Watch { scan, interval } => {
                assert_eq!(interval, Some(5));
                assert_eq!(scan.symbols, vec!["AAPL", "MSFT"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_the_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "symbols = [\"NVDA\"]\nstrategies = [\"Golden Cross\"]\ntimeframe = \"1Day\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "signal-scanner",
            "scan",
            "--request",
            path.to_str().unwrap(),
            "-t",
            "15Min",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let request = build_request(&args, &Settings::default()).unwrap();
        assert_eq!(request.symbols, vec!["NVDA"]);
        assert_eq!(request.strategy_ids, vec!["Golden Cross"]);
        assert_eq!(request.timeframe, Timeframe::FifteenMinutes);
        assert_eq!(request.bar_limit, Timeframe::FifteenMinutes.default_bar_limit());
    }
}
