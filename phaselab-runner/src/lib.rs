//! PhaseLab Runner: backtest orchestration, configuration and metrics.
//!
//! This crate builds on `phaselab-core` to provide:
//! - TOML configuration with validation and content-addressed run ids
//! - Single-instrument bar-by-bar replay through a historical feed
//! - Parallel independent runs across instruments
//! - Performance metrics over the equity curve and closed trades

pub mod config;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, BacktestSection, ConfigError, RunId};
pub use metrics::PerformanceMetrics;
pub use runner::{load_series, run_backtest, run_many, BacktestResult, RunError, SeriesSource};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn run_error_is_send() {
        assert_send::<RunError>();
    }
}
