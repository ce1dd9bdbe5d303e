//! Session: one instrument's full pipeline state, advanced one bar at a time.

use super::events::{EventLog, SessionEvent};
use super::EngineConfig;
use crate::data::Timeframe;
use crate::domain::{Bar, ClosedTrade, InstrumentSpec, TicketId, TradeSignal};
use crate::execution::{AccountSnapshot, OrderVenue, RiskWarden, SimulatedVenue};
use crate::hunter::{HuntContext, Rejection, SignalHunter};
use crate::phase::{MarketPhase, PhaseClassifier, PhaseTransition};
use crate::scanner::{ScanReport, ScannerConfig, ScannerState};
use crate::time::{NewsFeed, NoNews, TimeWindowPolicy};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::trace;

/// What one call to [`Session::on_bar`] did.
#[derive(Debug, Clone, Default)]
pub struct BarOutcome {
    pub transition: Option<PhaseTransition>,
    pub closed: Vec<ClosedTrade>,
    pub scan: ScanReport,
    pub signal: Option<TradeSignal>,
    pub opened: Option<TicketId>,
    pub rejection: Option<Rejection>,
}

/// Owns the classifier, scanner arena, hunter, risk warden and venue for a
/// single instrument. Nothing in here is shared, so independent instruments
/// run as independent sessions.
pub struct Session<V: OrderVenue = SimulatedVenue> {
    instrument: InstrumentSpec,
    timeframe: Timeframe,
    policy: TimeWindowPolicy,
    classifier: PhaseClassifier,
    scanner_config: ScannerConfig,
    scanner: ScannerState,
    hunter: SignalHunter,
    warden: RiskWarden,
    venue: V,
    news: Arc<dyn NewsFeed>,
    events: EventLog,
    bars_processed: usize,
}

impl Session<SimulatedVenue> {
    /// Backtest session on a fresh ledger with no news.
    pub fn backtest(
        instrument: InstrumentSpec,
        policy: TimeWindowPolicy,
        config: EngineConfig,
        initial_balance: f64,
    ) -> Self {
        let venue = SimulatedVenue::new(initial_balance, instrument.clone());
        Self::new(instrument, policy, config, venue, Arc::new(NoNews))
    }

    /// Close whatever is still open at the last bar's close.
    pub fn flatten(&mut self, last: &Bar) -> Vec<ClosedTrade> {
        let closed = self.venue.close_all(last.close, last.timestamp);
        self.record_closed(&closed);
        if !closed.is_empty() {
            self.venue.record_equity(last.timestamp);
        }
        closed
    }
}

impl<V: OrderVenue> Session<V> {
    pub fn new(
        instrument: InstrumentSpec,
        policy: TimeWindowPolicy,
        config: EngineConfig,
        venue: V,
        news: Arc<dyn NewsFeed>,
    ) -> Self {
        Self {
            timeframe: config.timeframe,
            classifier: PhaseClassifier::new(config.classifier, instrument.pip_size),
            scanner_config: config.scanner,
            scanner: ScannerState::new(),
            hunter: SignalHunter::new(config.hunter),
            warden: RiskWarden::new(config.risk),
            instrument,
            policy,
            venue,
            news,
            events: EventLog::new(),
            bars_processed: 0,
        }
    }

    /// Run the per-bar pipeline on `window`, whose last bar is the new one.
    ///
    /// Order: daily reset, mark open positions, classify, scan, hunt, risk
    /// gate and open, then one equity point. A signal opened here is first
    /// marked on the next bar. An empty window changes nothing.
    pub fn on_bar(&mut self, window: &[Bar]) -> BarOutcome {
        let mut outcome = BarOutcome::default();
        let Some(bar) = window.last() else {
            return outcome;
        };
        let now = bar.timestamp;
        self.bars_processed += 1;

        self.roll_day(now);

        outcome.closed = self.venue.mark(bar);
        self.record_closed(&outcome.closed);

        outcome.transition = self.classifier.update(window, &self.policy);
        if let Some(t) = &outcome.transition {
            self.events.push(SessionEvent::PhaseChanged(t.clone()));
        }

        outcome.scan = self.scanner.update(window, &self.scanner_config);

        let account = self.venue.account();
        let ctx = HuntContext {
            now,
            timeframe: self.timeframe,
            phase: self.classifier.current_phase(),
            scan: &outcome.scan,
            scanner: &self.scanner,
            policy: &self.policy,
            news: self.news.as_ref(),
            instrument: &self.instrument,
            warden: &self.warden,
            balance: account.balance,
        };
        match self.hunter.hunt(&ctx) {
            Ok(signal) => {
                self.events.push(SessionEvent::SignalEmitted {
                    at: now,
                    signal: signal.clone(),
                });
                outcome.opened = self.submit(&signal, now);
                outcome.signal = Some(signal);
            }
            Err(rejection) => {
                // Gate closures are the common case; keep them out of the log.
                if let Rejection::TradeGateClosed(gate) = &rejection {
                    trace!(%now, ?gate, "trade gate closed");
                } else {
                    self.events.push(SessionEvent::SignalRejected {
                        at: now,
                        rejection: rejection.clone(),
                    });
                }
                outcome.rejection = Some(rejection);
            }
        }

        self.venue.record_equity(now);
        outcome
    }

    /// Risk-gate `signal` and hand it to the venue.
    pub fn submit(&mut self, signal: &TradeSignal, at: DateTime<Utc>) -> Option<TicketId> {
        self.roll_day(at);
        let was_halted = self.warden.halted().is_some();
        if let Err(reason) = self.warden.allow_trade(&self.venue.account()) {
            if !was_halted {
                self.events.push(SessionEvent::RiskHalt { at, reason });
            }
            return None;
        }
        match self.venue.open(signal) {
            Ok(ticket) => {
                self.events.push(SessionEvent::PositionOpened {
                    ticket,
                    signal: signal.clone(),
                });
                Some(ticket)
            }
            Err(e) => {
                self.events.push(SessionEvent::OrderRejected {
                    at,
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        let day = self.policy.local_date(now);
        let had_day = self.warden.trading_day().is_some();
        if self.warden.begin_day(day) {
            self.venue.start_day();
            if had_day {
                self.events.push(SessionEvent::DailyReset { day });
            }
        }
    }

    fn record_closed(&mut self, closed: &[ClosedTrade]) {
        for trade in closed {
            self.warden.log_trade(trade.pnl);
            self.events.push(SessionEvent::PositionClosed(trade.clone()));
        }
    }

    pub fn phase(&self) -> MarketPhase {
        self.classifier.current_phase()
    }

    pub fn classifier(&self) -> &PhaseClassifier {
        &self.classifier
    }

    pub fn scanner(&self) -> &ScannerState {
        &self.scanner
    }

    pub fn hunter(&self) -> &SignalHunter {
        &self.hunter
    }

    pub fn warden(&self) -> &RiskWarden {
        &self.warden
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn into_venue(self) -> V {
        self.venue
    }

    pub fn account(&self) -> AccountSnapshot {
        self.venue.account()
    }

    pub fn policy(&self) -> &TimeWindowPolicy {
        &self.policy
    }

    pub fn instrument(&self) -> &InstrumentSpec {
        &self.instrument
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }
}
