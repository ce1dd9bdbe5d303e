//! TradeSignal, the output of the signal hunter.

use super::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fully specified trade idea: direction, entry, protective stop, target and size.
///
/// Immutable once emitted. The ledger copies these fields into a `Position`
/// and keeps accounting state there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub volume: f64,
    pub open_timestamp: DateTime<Utc>,
}

impl TradeSignal {
    /// Price distance between entry and stop.
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Price distance between entry and target.
    pub fn reward(&self) -> f64 {
        (self.take_profit - self.entry_price).abs()
    }

    /// Stop below entry and target above for longs; mirrored for shorts.
    pub fn levels_are_consistent(&self) -> bool {
        match self.direction {
            Direction::Bullish => {
                self.stop_loss < self.entry_price && self.take_profit > self.entry_price
            }
            Direction::Bearish => {
                self.stop_loss > self.entry_price && self.take_profit < self.entry_price
            }
        }
    }
}
