//! Execution: the simulated position ledger, order venues and risk gates.
//!
//! The session only ever talks to an [`OrderVenue`]. In backtests that is a
//! [`SimulatedVenue`] wrapping the [`PositionLedger`]; in demo mode it is a
//! [`DryRunVenue`] that records what would have been sent.

pub mod ledger;
pub mod risk;
pub mod venue;

pub use ledger::{EquityPoint, PositionLedger};
pub use risk::{position_size, HaltReason, RiskConfig, RiskWarden};
pub use venue::{DryRunVenue, SimulatedVenue, DRY_RUN_FIRST_TICKET};

use crate::domain::{Bar, ClosedTrade, TicketId, TradeSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VenueError {
    #[error("ticket {0} is not an open position")]
    UnknownTicket(TicketId),

    #[error("invalid volume {0}")]
    InvalidVolume(f64),

    #[error("stop {stop} / target {target} inconsistent with entry {entry}")]
    InconsistentLevels { entry: f64, stop: f64, target: f64 },

    #[error("order rejected by venue: {0}")]
    Rejected(String),
}

/// Account state as the risk gate sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    pub peak_equity: f64,
    pub daily_start_balance: f64,
    pub open_positions: usize,
}

/// Minimal order interface shared by simulated and live execution.
pub trait OrderVenue: Send {
    /// Open a position for the signal and return its ticket.
    fn open(&mut self, signal: &TradeSignal) -> Result<TicketId, VenueError>;

    /// Close `ticket` at `price`.
    fn close(
        &mut self,
        ticket: TicketId,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError>;

    /// Close `volume` lots of `ticket` at `price`; the rest stays open.
    /// Rejects a volume above the open size.
    fn close_partial(
        &mut self,
        ticket: TicketId,
        volume: f64,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<ClosedTrade, VenueError>;

    /// Move the protective levels of an open position.
    fn modify(&mut self, ticket: TicketId, stop: f64, target: f64) -> Result<(), VenueError>;

    /// Mark open positions to `bar`, returning whatever closed on it.
    fn mark(&mut self, bar: &Bar) -> Vec<ClosedTrade>;

    /// Snapshot the equity curve at `at`.
    fn record_equity(&mut self, at: DateTime<Utc>);

    /// Start a new trading day for daily-loss accounting.
    fn start_day(&mut self);

    fn account(&self) -> AccountSnapshot;
}
