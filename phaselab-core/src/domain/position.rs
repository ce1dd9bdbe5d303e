//! Position, a ledger entry created from a signal.

use super::{Bar, Direction, ExitReason, TicketId, TradeSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a position. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// An open (or just-closed) simulated position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticket: TicketId,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub volume: f64,
    pub open_timestamp: DateTime<Utc>,
    pub status: PositionStatus,
    /// Unrealized P/L at the last mark, in account currency.
    pub floating_pnl: f64,
}

impl Position {
    pub fn from_signal(ticket: TicketId, signal: &TradeSignal) -> Self {
        Self {
            ticket,
            direction: signal.direction,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            volume: signal.volume,
            open_timestamp: signal.open_timestamp,
            status: PositionStatus::Open,
            floating_pnl: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Bullish
    }

    /// Whether the bar's range touched the stop.
    pub fn stop_touched(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Bullish => bar.low <= self.stop_loss,
            Direction::Bearish => bar.high >= self.stop_loss,
        }
    }

    /// Whether the bar's range touched the target.
    pub fn target_touched(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Bullish => bar.high >= self.take_profit,
            Direction::Bearish => bar.low <= self.take_profit,
        }
    }

    /// Exit triggered by this bar, if any, with the fill price.
    ///
    /// When one bar spans both levels the stop is resolved first.
    pub fn triggered_exit(&self, bar: &Bar) -> Option<(ExitReason, f64)> {
        if self.stop_touched(bar) {
            Some((ExitReason::StopLoss, self.stop_loss))
        } else if self.target_touched(bar) {
            Some((ExitReason::TakeProfit, self.take_profit))
        } else {
            None
        }
    }
}
