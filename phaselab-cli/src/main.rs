//! PhaseLab CLI: run phase-scanner backtests.
//!
//! Commands:
//! - `run`: replay a CSV file or a seeded synthetic series through one session
//! - `batch`: run several config files in parallel
//! - `config`: print the effective config after defaults, as JSON

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use phaselab_core::data::SyntheticConfig;
use phaselab_runner::{
    load_series, run_backtest, run_many, BacktestConfig, BacktestResult, SeriesSource,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phaselab", about = "PhaseLab CLI: session-phase backtesting for FX")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one instrument through the classifier, scanner and hunter.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol override (only without --config).
        #[arg(long)]
        symbol: Option<String>,

        /// CSV file with time,open,high,low,close[,volume] columns.
        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        /// Use a seeded random walk instead of a CSV file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for --synthetic.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Bar count for --synthetic.
        #[arg(long, default_value_t = 2000)]
        bars: usize,

        /// Print the full result (trades, equity curve) instead of a summary.
        #[arg(long, default_value_t = false)]
        full: bool,
    },
    /// Run several configs in parallel, each on its own synthetic series.
    Batch {
        /// TOML config files, one per instrument.
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Base seed; each config gets `seed + index`.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 2000)]
        bars: usize,
    },
    /// Print the effective config after defaults.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            symbol,
            data,
            synthetic,
            seed,
            bars,
            full,
        } => run_cmd(config, symbol, data, synthetic, seed, bars, full),
        Commands::Batch { configs, seed, bars } => batch_cmd(&configs, seed, bars),
        Commands::Config { config } => {
            let config = resolve_config(config.as_deref(), None)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn resolve_config(path: Option<&Path>, symbol: Option<String>) -> Result<BacktestConfig> {
    match (path, symbol) {
        (Some(_), Some(_)) => bail!("--symbol cannot be combined with --config"),
        (Some(path), None) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        (None, symbol) => {
            let config = BacktestConfig::for_symbol(symbol.as_deref().unwrap_or("EURUSD"));
            config.validate()?;
            Ok(config)
        }
    }
}

fn synthetic_source(seed: u64, bars: usize) -> SeriesSource {
    SeriesSource::Synthetic(SyntheticConfig {
        seed,
        bars,
        ..SyntheticConfig::default()
    })
}

fn run_cmd(
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    data: Option<PathBuf>,
    synthetic: bool,
    seed: u64,
    bars: usize,
    full: bool,
) -> Result<()> {
    let config = resolve_config(config_path.as_deref(), symbol)?;
    let source = match (data, synthetic) {
        (Some(path), _) => SeriesSource::Csv(path),
        (None, true) => synthetic_source(seed, bars),
        (None, false) => bail!("one of --data or --synthetic is required"),
    };

    let series = load_series(&config, &source).context("loading bars")?;
    let result = run_backtest(&config, series)?;
    if full {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result)?;
    }
    Ok(())
}

fn batch_cmd(paths: &[PathBuf], seed: u64, bars: usize) -> Result<()> {
    let mut jobs = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let config = resolve_config(Some(path), None)?;
        let series = load_series(&config, &synthetic_source(seed + i as u64, bars))?;
        jobs.push((config, series));
    }

    info!(runs = jobs.len(), "batch started");
    let mut failed = 0;
    for (path, outcome) in paths.iter().zip(run_many(jobs)) {
        match outcome {
            Ok(result) => print_summary(&result)?,
            Err(err) => {
                failed += 1;
                eprintln!("{}: {err}", path.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} runs failed", paths.len());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) -> Result<()> {
    let summary = serde_json::json!({
        "run_id": result.run_id,
        "symbol": result.symbol,
        "start": result.start,
        "end": result.end,
        "bars": result.bar_count,
        "signals": result.signal_count,
        "phase_changes": result.phase_history.len(),
        "risk_halts": result.risk_halts,
        "metrics": result.metrics,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
