//! Venue implementations: ledger-backed simulation and dry-run recording.

use super::ledger::PositionLedger;
use super::{AccountSnapshot, OrderVenue, VenueError};
use crate::domain::{
    Bar, ClosedTrade, ExitReason, InstrumentSpec, Position, TicketGen, TicketId, TradeSignal,
};
use chrono::{DateTime, Utc};
use tracing::info;

/// Backtest venue: every call goes straight to the [`PositionLedger`].
#[derive(Debug, Clone)]
pub struct SimulatedVenue {
    ledger: PositionLedger,
}

impl SimulatedVenue {
    pub fn new(initial_balance: f64, instrument: InstrumentSpec) -> Self {
        Self {
            ledger: PositionLedger::new(initial_balance, instrument),
        }
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> PositionLedger {
        self.ledger
    }

    /// Flatten every open position at `price`.
    pub fn close_all(&mut self, price: f64, at: DateTime<Utc>) -> Vec<ClosedTrade> {
        self.ledger.close_all(price, at)
    }
}

impl OrderVenue for SimulatedVenue {
    fn open(&mut self, signal: &TradeSignal) -> Result<TicketId, VenueError> {
        self.ledger.open(signal)
    }

    fn close(
        &mut self,
        ticket: TicketId,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError> {
        self.ledger.close(ticket, price, at, ExitReason::Manual)
    }

    fn close_partial(
        &mut self,
        ticket: TicketId,
        volume: f64,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError> {
        self.ledger.close_partial(ticket, volume, price, at)
    }

    fn modify(&mut self, ticket: TicketId, stop: f64, target: f64) -> Result<(), VenueError> {
        self.ledger.modify(ticket, stop, target)
    }

    fn mark(&mut self, bar: &Bar) -> Vec<ClosedTrade> {
        self.ledger.mark(bar)
    }

    fn record_equity(&mut self, at: DateTime<Utc>) {
        self.ledger.record_equity(at);
    }

    fn start_day(&mut self) {
        self.ledger.start_day();
    }

    fn account(&self) -> AccountSnapshot {
        self.ledger.snapshot()
    }
}

/// Demo venue: records intended orders under mock tickets and never moves
/// the balance. Stops and targets are not simulated.
#[derive(Debug, Clone)]
pub struct DryRunVenue {
    balance: f64,
    tickets: TicketGen,
    orders: Vec<Position>,
}

/// First mock ticket handed out in dry-run mode.
pub const DRY_RUN_FIRST_TICKET: u64 = 1000;

impl DryRunVenue {
    pub fn new(balance: f64) -> Self {
        Self {
            balance,
            tickets: TicketGen::starting_at(DRY_RUN_FIRST_TICKET),
            orders: Vec::new(),
        }
    }

    /// Orders still considered open.
    pub fn orders(&self) -> &[Position] {
        &self.orders
    }
}

impl OrderVenue for DryRunVenue {
    fn open(&mut self, signal: &TradeSignal) -> Result<TicketId, VenueError> {
        if !signal.volume.is_finite() || signal.volume <= 0.0 {
            return Err(VenueError::InvalidVolume(signal.volume));
        }
        let ticket = self.tickets.next_ticket();
        info!(
            %ticket,
            direction = %signal.direction,
            volume = signal.volume,
            entry = signal.entry_price,
            stop = signal.stop_loss,
            target = signal.take_profit,
            "dry-run order"
        );
        self.orders.push(Position::from_signal(ticket, signal));
        Ok(ticket)
    }

    fn close(
        &mut self,
        ticket: TicketId,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError> {
        let idx = self
            .orders
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or(VenueError::UnknownTicket(ticket))?;
        let pos = self.orders.remove(idx);
        info!(%ticket, price, "dry-run close");
        Ok(ClosedTrade::from_position(&pos, price, 0.0, at, ExitReason::Manual))
    }

    fn close_partial(
        &mut self,
        ticket: TicketId,
        volume: f64,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError> {
        let idx = self
            .orders
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or(VenueError::UnknownTicket(ticket))?;
        let open_volume = self.orders[idx].volume;
        if !volume.is_finite() || volume <= 0.0 || volume > open_volume {
            return Err(VenueError::InvalidVolume(volume));
        }
        if volume == open_volume {
            return self.close(ticket, price, at);
        }
        let mut slice = self.orders[idx].clone();
        slice.volume = volume;
        self.orders[idx].volume = open_volume - volume;
        info!(%ticket, volume, price, "dry-run partial close");
        Ok(ClosedTrade::from_position(
            &slice,
            price,
            0.0,
            at,
            ExitReason::PartialClose,
        ))
    }

    fn modify(&mut self, ticket: TicketId, stop: f64, target: f64) -> Result<(), VenueError> {
        let pos = self
            .orders
            .iter_mut()
            .find(|p| p.ticket == ticket)
            .ok_or(VenueError::UnknownTicket(ticket))?;
        pos.stop_loss = stop;
        pos.take_profit = target;
        Ok(())
    }

    fn mark(&mut self, _bar: &Bar) -> Vec<ClosedTrade> {
        Vec::new()
    }

    fn record_equity(&mut self, _at: DateTime<Utc>) {}

    fn start_day(&mut self) {}

    fn account(&self) -> AccountSnapshot {
        AccountSnapshot {
            balance: self.balance,
            equity: self.balance,
            peak_equity: self.balance,
            daily_start_balance: self.balance,
            open_positions: self.orders.len(),
        }
    }
}
