//! Typed session telemetry.
//!
//! Every record pushed into an [`EventLog`] is also emitted through `tracing`
//! with structured fields, so tests assert on the log while binaries get
//! ordinary log lines.

use crate::domain::{ClosedTrade, TicketId, TradeSignal};
use crate::execution::HaltReason;
use crate::hunter::Rejection;
use crate::phase::PhaseTransition;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged(PhaseTransition),
    SignalEmitted {
        at: DateTime<Utc>,
        signal: TradeSignal,
    },
    SignalRejected {
        at: DateTime<Utc>,
        rejection: Rejection,
    },
    PositionOpened {
        ticket: TicketId,
        signal: TradeSignal,
    },
    PositionClosed(ClosedTrade),
    OrderRejected {
        at: DateTime<Utc>,
        reason: String,
    },
    RiskHalt {
        at: DateTime<Utc>,
        reason: HaltReason,
    },
    DailyReset {
        day: NaiveDate,
    },
}

impl SessionEvent {
    fn emit(&self) {
        match self {
            Self::PhaseChanged(t) => {
                info!(from = %t.from, to = %t.to, at = %t.at, "phase changed");
            }
            Self::SignalEmitted { at, signal } => info!(
                %at,
                direction = %signal.direction,
                entry = signal.entry_price,
                stop = signal.stop_loss,
                target = signal.take_profit,
                volume = signal.volume,
                "signal emitted"
            ),
            Self::SignalRejected { at, rejection } => {
                debug!(%at, %rejection, "signal rejected");
            }
            Self::PositionOpened { ticket, signal } => info!(
                %ticket,
                direction = %signal.direction,
                entry = signal.entry_price,
                "position opened"
            ),
            Self::PositionClosed(trade) => info!(
                ticket = %trade.ticket,
                exit = trade.exit_price,
                pnl = trade.pnl,
                reason = ?trade.exit_reason,
                "position closed"
            ),
            Self::OrderRejected { at, reason } => warn!(%at, %reason, "order rejected"),
            Self::RiskHalt { at, reason } => warn!(%at, ?reason, "risk halt"),
            Self::DailyReset { day } => debug!(%day, "daily reset"),
        }
    }
}

/// Append-only record of what a session did.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SessionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SessionEvent) {
        event.emit();
        self.events.push(event);
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events matching `pred`, in order.
    pub fn filter<'a, F>(&'a self, pred: F) -> impl Iterator<Item = &'a SessionEvent> + 'a
    where
        F: Fn(&SessionEvent) -> bool + 'a,
    {
        self.events.iter().filter(move |e| pred(e))
    }

    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&SessionEvent) -> bool,
    {
        self.events.iter().filter(|e| pred(e)).count()
    }
}
