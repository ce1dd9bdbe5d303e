//! Domain types shared by the scanner, classifier, hunter and ledger.

pub mod bar;
pub mod ids;
pub mod instrument;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{Bar, OhlcSeries, SeriesError};
pub use ids::{BlockId, GapId, TicketGen, TicketId};
pub use instrument::InstrumentSpec;
pub use position::{Position, PositionStatus};
pub use signal::TradeSignal;
pub use trade::{ClosedTrade, ExitReason};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional bias of a pattern, a signal or a position.
///
/// A bullish trade is a long (buy), a bearish trade is a short (sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// +1.0 for bullish, -1.0 for bearish.
    pub fn sign(self) -> f64 {
        match self {
            Self::Bullish => 1.0,
            Self::Bearish => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Bullish => Self::Bearish,
            Self::Bearish => Self::Bullish,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}
