//! Backtest runner: replays a series bar by bar through one session.
//!
//! Entry points:
//! - `run_backtest()`: one config, one pre-loaded series. Used by the CLI.
//! - `run_many()`: independent instruments in parallel, one session each.
//! - `load_series()`: resolve a CSV file or a seeded synthetic walk.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use phaselab_core::data::{load_csv, random_walk, DataError, HistoricalFeed, SyntheticConfig};
use phaselab_core::domain::{ClosedTrade, OhlcSeries};
use phaselab_core::engine::{Session, SessionEvent};
use phaselab_core::execution::SimulatedVenue;
use phaselab_core::phase::PhaseTransition;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("no bars to replay for '{0}'")]
    EmptySeries(String),
}

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bar_count: usize,
    pub signal_count: usize,
    pub rejected_orders: usize,
    pub risk_halts: usize,
    pub metrics: PerformanceMetrics,
    pub phase_history: Vec<PhaseTransition>,
    pub trades: Vec<ClosedTrade>,
    /// One equity value per processed bar, plus a final point when the
    /// run ends with positions still open.
    pub equity_curve: Vec<f64>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Where the bars of a run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesSource {
    /// CSV file with naive timestamps in the configured feed timezone.
    Csv(PathBuf),
    /// Seeded random walk; the config's timeframe overrides the walk's.
    Synthetic(SyntheticConfig),
}

pub fn load_series(
    config: &BacktestConfig,
    source: &SeriesSource,
) -> Result<OhlcSeries, RunError> {
    let series = match source {
        SeriesSource::Csv(path) => load_csv(path, &config.policy())?,
        SeriesSource::Synthetic(synthetic) => random_walk(&SyntheticConfig {
            timeframe: config.backtest.timeframe,
            ..synthetic.clone()
        })?,
    };
    debug!(symbol = %config.backtest.symbol, bars = series.len(), "series loaded");
    Ok(series)
}

/// Replay `series` through a fresh session built from `config`.
///
/// Each step hands the session the trailing `window_size` bars ending at the
/// feed cursor. Positions still open after the last bar are closed at its
/// close so every trade appears in the result.
pub fn run_backtest(
    config: &BacktestConfig,
    series: OhlcSeries,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let symbol = config.backtest.symbol.clone();
    let bars = series.bars();
    let (Some(first), Some(last)) = (bars.first().cloned(), bars.last().cloned()) else {
        return Err(RunError::EmptySeries(symbol));
    };

    let instrument = config.instrument_spec();
    let initial_balance = config.backtest.initial_balance;
    let venue = SimulatedVenue::new(initial_balance, instrument.clone());
    let mut session = Session::new(
        instrument,
        config.policy(),
        config.engine_config(),
        venue,
        Arc::new(config.calendar()),
    );

    info!(%run_id, %symbol, bars = series.len(), "backtest started");
    let mut feed = HistoricalFeed::new(symbol.as_str(), config.backtest.timeframe, series);
    let window_size = config.backtest.window_size;
    while !feed.is_finished() {
        session.on_bar(feed.window(window_size));
        feed.advance();
    }
    session.flatten(&last);

    let events = session.events();
    let signal_count = events.count(|e| matches!(e, SessionEvent::SignalEmitted { .. }));
    let rejected_orders = events.count(|e| matches!(e, SessionEvent::OrderRejected { .. }));
    let risk_halts = events.count(|e| matches!(e, SessionEvent::RiskHalt { .. }));
    let phase_history = session.classifier().history().to_vec();
    let bar_count = session.bars_processed();

    let venue = session.into_venue();
    let ledger = venue.ledger();
    let trades = ledger.history().to_vec();
    let equity_curve: Vec<f64> = ledger.equity_curve().iter().map(|p| p.equity).collect();
    let metrics = PerformanceMetrics::compute(&equity_curve, &trades, initial_balance);

    info!(
        %run_id,
        %symbol,
        trades = metrics.trade_count,
        final_equity = metrics.final_equity,
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbol,
        start: first.timestamp,
        end: last.timestamp,
        bar_count,
        signal_count,
        rejected_orders,
        risk_halts,
        metrics,
        phase_history,
        trades,
        equity_curve,
    })
}

/// Run independent instruments in parallel. Results keep the input order.
pub fn run_many(
    jobs: Vec<(BacktestConfig, OhlcSeries)>,
) -> Vec<Result<BacktestResult, RunError>> {
    jobs.into_par_iter()
        .map(|(config, series)| run_backtest(&config, series))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaselab_core::data::Timeframe;

    fn synthetic(seed: u64, bars: usize) -> SyntheticConfig {
        SyntheticConfig {
            seed,
            bars,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn empty_series_is_an_error() {
        let config = BacktestConfig::for_symbol("EURUSD");
        let series = OhlcSeries::new(Vec::new()).unwrap();
        let err = run_backtest(&config, series).unwrap_err();
        assert!(matches!(err, RunError::EmptySeries(s) if s == "EURUSD"));
    }

    #[test]
    fn invalid_config_is_rejected_before_replay() {
        let mut config = BacktestConfig::for_symbol("EURUSD");
        config.backtest.window_size = 1;
        let series = load_series(&config, &SeriesSource::Synthetic(synthetic(1, 50))).unwrap();
        assert!(matches!(
            run_backtest(&config, series),
            Err(RunError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn synthetic_source_takes_config_timeframe() {
        let mut config = BacktestConfig::for_symbol("EURUSD");
        config.backtest.timeframe = Timeframe::M15;
        let series = load_series(&config, &SeriesSource::Synthetic(synthetic(3, 10))).unwrap();
        let bars = series.bars();
        assert_eq!(bars[1].timestamp - bars[0].timestamp, Timeframe::M15.duration());
    }

    #[test]
    fn result_covers_every_bar() {
        let config = BacktestConfig::for_symbol("EURUSD");
        let series = load_series(&config, &SeriesSource::Synthetic(synthetic(7, 600))).unwrap();
        let result = run_backtest(&config, series).unwrap();
        assert_eq!(result.bar_count, 600);
        assert!(result.equity_curve.len() >= 600);
        assert_eq!(result.metrics.trade_count, result.trades.len());
        assert_eq!(result.run_id, config.run_id().unwrap());
        assert!(result.start < result.end);
    }
}
