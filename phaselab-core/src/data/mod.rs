//! Market data collaborators: the source interface, a replay cursor over
//! pre-loaded history, CSV loading and seeded synthetic series.

pub mod feed;
pub mod loader;
pub mod synthetic;

pub use feed::HistoricalFeed;
pub use loader::{load_csv, read_csv};
pub use synthetic::{random_walk, SyntheticConfig};

use crate::domain::{OhlcSeries, SeriesError};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data unavailable: {0}")]
    Unavailable(String),

    #[error("invalid generator config: {0}")]
    InvalidConfig(String),

    #[error("feed exhausted after {len} bars")]
    Exhausted { len: usize },

    #[error("row {row}: cannot interpret timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),
}

/// Bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    #[default]
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn minutes(self) -> i64 {
        match self {
            Self::M1 => 1,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::M30 => 30,
            Self::H1 => 60,
            Self::H4 => 240,
            Self::D1 => 1440,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::M1 => "M1",
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
        };
        f.write_str(s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M1" => Ok(Self::M1),
            "M5" => Ok(Self::M5),
            "M15" => Ok(Self::M15),
            "M30" => Ok(Self::M30),
            "H1" => Ok(Self::H1),
            "H4" => Ok(Self::H4),
            "D1" => Ok(Self::D1),
            other => Err(format!("unknown timeframe '{other}'")),
        }
    }
}

/// Source of bar windows. Implemented by the historical replay feed; a live
/// broker adapter would implement the same shape.
pub trait MarketDataSource: Send {
    /// The newest `count` bars (or fewer, early in the history).
    fn get_window(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<OhlcSeries, DataError>;
}
