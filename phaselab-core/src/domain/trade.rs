//! ClosedTrade, a completed round trip in the ledger history.

use super::{Direction, Position, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Closed through the venue interface (end of run, operator close).
    Manual,
    /// Part of the volume closed through the venue; the rest stayed open
    /// under the same ticket.
    PartialClose,
}

/// A complete round-trip trade record, entry to exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub ticket: TicketId,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub volume: f64,
    pub pnl: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn from_position(
        position: &Position,
        exit_price: f64,
        pnl: f64,
        close_time: DateTime<Utc>,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            ticket: position.ticket,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            volume: position.volume,
            pnl,
            open_time: position.open_timestamp,
            close_time,
            exit_reason,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
