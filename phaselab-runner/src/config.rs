//! TOML backtest configuration.
//!
//! Every section is optional and falls back to the engine defaults, so a
//! config file can be as short as a `[backtest]` table naming the symbol.

use std::path::{Path, PathBuf};

use phaselab_core::data::Timeframe;
use phaselab_core::domain::InstrumentSpec;
use phaselab_core::engine::EngineConfig;
use phaselab_core::execution::RiskConfig;
use phaselab_core::hunter::{HunterConfig, Sizing};
use phaselab_core::phase::ClassifierConfig;
use phaselab_core::scanner::ScannerConfig;
use phaselab_core::time::{NewsEvent, SessionConfig, StaticCalendar, TimeWindowPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content hash of a config; identical configs share a run id.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[backtest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbol: String,
    pub initial_balance: f64,
    /// Bars handed to the session on each step, the newest last.
    pub window_size: usize,
    pub timeframe: Timeframe,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            initial_balance: 10_000.0,
            window_size: 120,
            timeframe: Timeframe::M5,
        }
    }
}

/// Full configuration of one single-instrument backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    /// Omitted: derived from the symbol as a five-digit FX major.
    pub instrument: Option<InstrumentSpec>,
    pub sessions: SessionConfig,
    pub classifier: ClassifierConfig,
    pub scanner: ScannerConfig,
    pub hunter: HunterConfig,
    pub risk: RiskConfig,
    /// Scheduled macro events checked by the trade gate.
    pub news: Vec<NewsEvent>,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Default config for `symbol`.
    pub fn for_symbol(symbol: &str) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.to_string(),
                ..BacktestSection::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.symbol.trim().is_empty() {
            return Err(invalid("backtest.symbol is empty"));
        }
        if !(b.initial_balance.is_finite() && b.initial_balance > 0.0) {
            return Err(invalid(format!(
                "backtest.initial_balance must be positive, got {}",
                b.initial_balance
            )));
        }
        if b.window_size < 3 {
            return Err(invalid(format!(
                "backtest.window_size must be at least 3, got {}",
                b.window_size
            )));
        }

        let instrument = self.instrument_spec();
        if instrument.pip_size <= 0.0 || instrument.pip_value_per_lot <= 0.0 {
            return Err(invalid("instrument pip size and pip value must be positive"));
        }
        if instrument.min_lot <= 0.0 {
            return Err(invalid("instrument.min_lot must be positive"));
        }

        if self.hunter.risk_reward <= 0.0 {
            return Err(invalid(format!(
                "hunter.risk_reward must be positive, got {}",
                self.hunter.risk_reward
            )));
        }
        if self.hunter.stop_buffer_pips < 0.0 {
            return Err(invalid("hunter.stop_buffer_pips cannot be negative"));
        }
        if let Sizing::Fixed { lots } = self.hunter.sizing {
            if lots <= 0.0 {
                return Err(invalid(format!("fixed sizing needs positive lots, got {lots}")));
            }
        }

        for (name, pct) in [
            ("risk.max_daily_loss_pct", self.risk.max_daily_loss_pct),
            ("risk.max_drawdown_pct", self.risk.max_drawdown_pct),
            ("risk.risk_per_trade_pct", self.risk.risk_per_trade_pct),
        ] {
            if !(pct > 0.0 && pct <= 100.0) {
                return Err(invalid(format!("{name} must be in (0, 100], got {pct}")));
            }
        }

        let names: Vec<&str> = self.sessions.killzones.iter().map(|k| k.name.as_str()).collect();
        for wanted in &self.hunter.hunt_killzones {
            if !names.contains(&wanted.as_str()) {
                return Err(invalid(format!(
                    "hunter.hunt_killzones names unknown killzone '{wanted}'"
                )));
            }
        }
        if self.sessions.news_lookahead_minutes < 0 {
            return Err(invalid("sessions.news_lookahead_minutes cannot be negative"));
        }
        Ok(())
    }

    /// BLAKE3 over the canonical JSON form.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// The `[instrument]` table, or the FX-major defaults for the symbol.
    /// The backtest symbol always wins over the table's own.
    pub fn instrument_spec(&self) -> InstrumentSpec {
        match &self.instrument {
            Some(spec) => InstrumentSpec {
                symbol: self.backtest.symbol.clone(),
                ..spec.clone()
            },
            None => InstrumentSpec::fx_major(&self.backtest.symbol),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            timeframe: self.backtest.timeframe,
            classifier: self.classifier.clone(),
            scanner: self.scanner.clone(),
            hunter: self.hunter.clone(),
            risk: self.risk.clone(),
        }
    }

    pub fn policy(&self) -> TimeWindowPolicy {
        TimeWindowPolicy::new(self.sessions.clone())
    }

    pub fn calendar(&self) -> StaticCalendar {
        StaticCalendar::new(self.news.clone())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[backtest]
symbol = "GBPUSD"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = BacktestConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.backtest.symbol, "GBPUSD");
        assert_eq!(config.backtest.initial_balance, 10_000.0);
        assert_eq!(config.backtest.timeframe, Timeframe::M5);
        assert_eq!(config.hunter, HunterConfig::default());
        assert_eq!(config.risk, RiskConfig::default());
        let spec = config.instrument_spec();
        assert_eq!(spec.symbol, "GBPUSD");
        assert_eq!(spec.currencies, vec!["GBP".to_string(), "USD".to_string()]);
    }

    #[test]
    fn sections_override_defaults() {
        let config = BacktestConfig::from_toml(
            r#"
[backtest]
symbol = "EURUSD"
initial_balance = 50000.0
window_size = 200
timeframe = "M15"

[hunter]
risk_reward = 2.0
stop_buffer_pips = 3.0
sizing = { mode = "fixed", lots = 0.5 }

[risk]
max_daily_loss_pct = 2.0

[sessions]
trading_tz = "Europe/London"
news_lookahead_minutes = 45

[[news]]
time = "2025-03-05T13:30:00Z"
currency = "USD"
impact = "high"
name = "CPI"
"#,
        )
        .unwrap();
        assert_eq!(config.backtest.window_size, 200);
        assert_eq!(config.backtest.timeframe, Timeframe::M15);
        assert_eq!(config.hunter.risk_reward, 2.0);
        assert_eq!(config.hunter.sizing, Sizing::Fixed { lots: 0.5 });
        assert_eq!(config.hunter.cooldown_minutes, 60);
        assert_eq!(config.risk.max_daily_loss_pct, 2.0);
        assert_eq!(config.risk.max_drawdown_pct, 10.0);
        assert_eq!(config.sessions.trading_tz, chrono_tz::Europe::London);
        assert_eq!(config.sessions.news_lookahead_minutes, 45);
        assert_eq!(config.calendar().len(), 1);
    }

    #[test]
    fn instrument_table_keeps_backtest_symbol() {
        let config = BacktestConfig::from_toml(
            r#"
[backtest]
symbol = "USDJPY"

[instrument]
pip_size = 0.01
pip_value_per_lot = 6.7
currencies = ["USD", "JPY"]
"#,
        )
        .unwrap();
        let spec = config.instrument_spec();
        assert_eq!(spec.symbol, "USDJPY");
        assert_eq!(spec.pip_size, 0.01);
        assert_eq!(spec.lot_step, 0.01);
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            "[backtest]\nsymbol = \"\"",
            "[backtest]\ninitial_balance = 0.0",
            "[backtest]\nwindow_size = 2",
            "[hunter]\nrisk_reward = 0.0",
            "[hunter]\nsizing = { mode = \"fixed\", lots = 0.0 }",
            "[risk]\nmax_drawdown_pct = 150.0",
            "[hunter]\nhunt_killzones = [\"Tokyo Lunch\"]",
        ];
        for case in cases {
            let err = BacktestConfig::from_toml(case).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{case}: {err}");
        }
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = BacktestConfig::from_toml("[backtest\nsymbol = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn run_id_is_content_addressed() {
        let a = BacktestConfig::for_symbol("EURUSD");
        let b = BacktestConfig::for_symbol("EURUSD");
        let mut c = a.clone();
        c.hunter.risk_reward = 3.0;

        let id = a.run_id().unwrap();
        assert_eq!(id.len(), 64);
        assert_eq!(id, b.run_id().unwrap());
        assert_ne!(id, c.run_id().unwrap());
    }

    #[test]
    fn engine_config_carries_sections() {
        let mut config = BacktestConfig::for_symbol("EURUSD");
        config.scanner.swing_strength = 3;
        config.risk.risk_per_trade_pct = 1.0;
        config.backtest.timeframe = Timeframe::M15;
        let engine = config.engine_config();
        assert_eq!(engine.scanner.swing_strength, 3);
        assert_eq!(engine.risk.risk_per_trade_pct, 1.0);
        assert_eq!(engine.timeframe, Timeframe::M15);
    }
}
