//! PositionLedger: simulated positions, balance and the equity curve.
//!
//! Invariant: `equity() == balance + Σ floating_pnl(open)` after every
//! mutation. Balance only moves when a position closes.

use super::{AccountSnapshot, VenueError};
use crate::domain::{
    Bar, ClosedTrade, Direction, ExitReason, InstrumentSpec, Position, PositionStatus, TicketGen,
    TicketId, TradeSignal,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Volumes closer than this are the same size.
const VOLUME_EPSILON: f64 = 1e-9;

/// One point of the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct PositionLedger {
    instrument: InstrumentSpec,
    tickets: TicketGen,
    open: Vec<Position>,
    closed: Vec<ClosedTrade>,
    balance: f64,
    peak_equity: f64,
    daily_start_balance: f64,
    equity_curve: Vec<EquityPoint>,
}

impl PositionLedger {
    pub fn new(initial_balance: f64, instrument: InstrumentSpec) -> Self {
        Self {
            instrument,
            tickets: TicketGen::default(),
            open: Vec::new(),
            closed: Vec::new(),
            balance: initial_balance,
            peak_equity: initial_balance,
            daily_start_balance: initial_balance,
            equity_curve: Vec::new(),
        }
    }

    pub fn instrument(&self) -> &InstrumentSpec {
        &self.instrument
    }

    /// Store the signal as an open position with zero floating P/L.
    pub fn open(&mut self, signal: &TradeSignal) -> Result<TicketId, VenueError> {
        if !signal.volume.is_finite() || signal.volume <= 0.0 {
            return Err(VenueError::InvalidVolume(signal.volume));
        }
        if !signal.levels_are_consistent() {
            return Err(VenueError::InconsistentLevels {
                entry: signal.entry_price,
                stop: signal.stop_loss,
                target: signal.take_profit,
            });
        }
        let ticket = self.tickets.next_ticket();
        self.open.push(Position::from_signal(ticket, signal));
        Ok(ticket)
    }

    /// Mark every open position to `bar` and resolve stop/target touches.
    ///
    /// Touches use the bar's high and low; a bar spanning both levels closes
    /// at the stop. Survivors carry floating P/L at the bar's close.
    pub fn mark(&mut self, bar: &Bar) -> Vec<ClosedTrade> {
        let mut closed = Vec::new();
        let mut still_open = Vec::with_capacity(self.open.len());

        for mut pos in std::mem::take(&mut self.open) {
            match pos.triggered_exit(bar) {
                Some((reason, price)) => {
                    closed.push(self.realize(&mut pos, price, bar.timestamp, reason));
                }
                None => {
                    pos.floating_pnl = self.instrument.pnl(
                        pos.direction,
                        pos.entry_price,
                        bar.close,
                        pos.volume,
                    );
                    still_open.push(pos);
                }
            }
        }

        self.open = still_open;
        self.peak_equity = self.peak_equity.max(self.equity());
        closed
    }

    /// Close `ticket` at `price` outside the stop/target path.
    pub fn close(
        &mut self,
        ticket: TicketId,
        price: f64,
        at: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<ClosedTrade, VenueError> {
        let idx = self
            .open
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or(VenueError::UnknownTicket(ticket))?;
        let mut pos = self.open.remove(idx);
        let trade = self.realize(&mut pos, price, at, reason);
        self.peak_equity = self.peak_equity.max(self.equity());
        Ok(trade)
    }

    /// Close `volume` lots of `ticket` at `price`, leaving the rest open.
    ///
    /// The closed slice is realized as its own history entry. The remainder
    /// keeps its ticket and levels, with floating P/L scaled down to its new
    /// size. Closing the full open size is a plain manual close.
    pub fn close_partial(
        &mut self,
        ticket: TicketId,
        volume: f64,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError> {
        let idx = self
            .open
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or(VenueError::UnknownTicket(ticket))?;
        let open_volume = self.open[idx].volume;
        if !volume.is_finite() || volume <= 0.0 || volume > open_volume + VOLUME_EPSILON {
            return Err(VenueError::InvalidVolume(volume));
        }
        if open_volume - volume < VOLUME_EPSILON {
            return self.close(ticket, price, at, ExitReason::Manual);
        }

        let remaining = open_volume - volume;
        let mut slice = self.open[idx].clone();
        slice.volume = volume;
        let pos = &mut self.open[idx];
        pos.floating_pnl *= remaining / open_volume;
        pos.volume = remaining;

        let trade = self.realize(&mut slice, price, at, ExitReason::PartialClose);
        self.peak_equity = self.peak_equity.max(self.equity());
        Ok(trade)
    }

    /// Close everything at `price` (end of a replay).
    pub fn close_all(&mut self, price: f64, at: DateTime<Utc>) -> Vec<ClosedTrade> {
        let tickets: Vec<_> = self.open.iter().map(|p| p.ticket).collect();
        tickets
            .into_iter()
            .filter_map(|t| self.close(t, price, at, ExitReason::Manual).ok())
            .collect()
    }

    pub fn modify(&mut self, ticket: TicketId, stop: f64, target: f64) -> Result<(), VenueError> {
        let pos = self
            .open
            .iter_mut()
            .find(|p| p.ticket == ticket)
            .ok_or(VenueError::UnknownTicket(ticket))?;
        let consistent = match pos.direction {
            Direction::Bullish => stop < pos.entry_price && target > pos.entry_price,
            Direction::Bearish => stop > pos.entry_price && target < pos.entry_price,
        };
        if !consistent {
            return Err(VenueError::InconsistentLevels {
                entry: pos.entry_price,
                stop,
                target,
            });
        }
        pos.stop_loss = stop;
        pos.take_profit = target;
        Ok(())
    }

    fn realize(
        &mut self,
        pos: &mut Position,
        price: f64,
        at: DateTime<Utc>,
        reason: ExitReason,
    ) -> ClosedTrade {
        let pnl = self
            .instrument
            .pnl(pos.direction, pos.entry_price, price, pos.volume);
        pos.status = PositionStatus::Closed;
        pos.floating_pnl = 0.0;
        self.balance += pnl;
        let trade = ClosedTrade::from_position(pos, price, pnl, at, reason);
        self.closed.push(trade.clone());
        trade
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn floating_pnl(&self) -> f64 {
        self.open.iter().map(|p| p.floating_pnl).sum()
    }

    pub fn equity(&self) -> f64 {
        self.balance + self.floating_pnl()
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn daily_start_balance(&self) -> f64 {
        self.daily_start_balance
    }

    pub fn start_day(&mut self) {
        self.daily_start_balance = self.balance;
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open
    }

    pub fn history(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn record_equity(&mut self, at: DateTime<Utc>) {
        self.equity_curve.push(EquityPoint {
            timestamp: at,
            balance: self.balance,
            equity: self.equity(),
        });
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Revalue open positions at `mark_price` from scratch and return the
    /// absolute drift from `equity()`. Zero right after `mark` at that close.
    pub fn verify_equity(&self, mark_price: f64) -> f64 {
        let recomputed: f64 = self.balance
            + self
                .open
                .iter()
                .map(|p| {
                    self.instrument
                        .pnl(p.direction, p.entry_price, mark_price, p.volume)
                })
                .sum::<f64>();
        (recomputed - self.equity()).abs()
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            balance: self.balance,
            equity: self.equity(),
            peak_equity: self.peak_equity,
            daily_start_balance: self.daily_start_balance,
            open_positions: self.open.len(),
        }
    }
}
