//! SignalHunter: turns scanner output, phase and session time into at most
//! one trade signal per bar.
//!
//! The hunt is a fixed sequence of gates. Each gate that fails yields a typed
//! [`Rejection`] so the session can log exactly why a bar produced nothing.
//! Only a Manipulation phase inside one of the hunt killzones with a Judas
//! swing on the tape proceeds to the gap/block confluence search.

pub mod confluence;

pub use confluence::{entry_price, find_confluence, protective_stop, Confluence, SearchParams};

use crate::data::Timeframe;
use crate::domain::{InstrumentSpec, TradeSignal};
use crate::execution::RiskWarden;
use crate::phase::MarketPhase;
use crate::scanner::{find_optimal_trade_entry_zone, ScanReport, ScannerState};
use crate::time::{NewsFeed, TimeWindowPolicy, TradeGate, LONDON_OPEN, NEW_YORK_AM};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ── Configuration ──────────────────────────────────────────────────

/// How the hunter sizes a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Sizing {
    /// Always the same lot count.
    Fixed { lots: f64 },
    /// Defer to the risk warden's per-trade risk percentage.
    Risk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterConfig {
    pub cooldown_minutes: i64,
    /// Target distance as a multiple of the stop distance.
    pub risk_reward: f64,
    pub stop_buffer_pips: f64,
    /// Maximum gap/block anchor separation, in bars of the session timeframe.
    pub proximity_bars: i32,
    /// Newest active gaps considered per hunt.
    pub max_fvgs: usize,
    /// Newest active blocks considered per hunt.
    pub max_obs: usize,
    /// Killzones in which a Manipulation phase may be traded.
    pub hunt_killzones: Vec<String>,
    pub sizing: Sizing,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 60,
            risk_reward: 1.0,
            stop_buffer_pips: 5.0,
            proximity_bars: 10,
            max_fvgs: 3,
            max_obs: 10,
            hunt_killzones: vec![LONDON_OPEN.to_string(), NEW_YORK_AM.to_string()],
            sizing: Sizing::Risk,
        }
    }
}

// ── Hunt inputs and outcomes ───────────────────────────────────────

/// Everything one hunt looks at. Borrowed from the session for one bar.
pub struct HuntContext<'a> {
    pub now: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub phase: MarketPhase,
    pub scan: &'a ScanReport,
    pub scanner: &'a ScannerState,
    pub policy: &'a TimeWindowPolicy,
    pub news: &'a dyn NewsFeed,
    pub instrument: &'a InstrumentSpec,
    pub warden: &'a RiskWarden,
    pub balance: f64,
}

/// Why a hunt produced no signal.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    #[error("trade gate closed: {0:?}")]
    TradeGateClosed(TradeGate),

    #[error("cooldown active for another {remaining_secs}s")]
    Cooldown { remaining_secs: i64 },

    #[error("no displacement on the last bar")]
    NoDisplacement,

    #[error("no market structure shift")]
    NoStructureShift,

    #[error("phase {0} is not hunted")]
    WrongPhase(MarketPhase),

    #[error("outside the hunt killzones")]
    OutsideHuntKillzone,

    #[error("no judas swing")]
    NoJudasSwing,

    #[error("no OTE zone: need a swing high and a swing low")]
    NoOteZone,

    #[error("no gap/block pair in confluence")]
    NoConfluence,
}

// ── SignalHunter ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SignalHunter {
    config: HunterConfig,
    last_signal: Option<DateTime<Utc>>,
}

impl SignalHunter {
    pub fn new(config: HunterConfig) -> Self {
        Self {
            config,
            last_signal: None,
        }
    }

    pub fn config(&self) -> &HunterConfig {
        &self.config
    }

    /// Timestamp of the last emitted signal, the cooldown anchor.
    pub fn last_signal(&self) -> Option<DateTime<Utc>> {
        self.last_signal
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.config.cooldown_minutes)
    }

    /// Run every gate for this bar; on success the cooldown restarts at `now`.
    pub fn hunt(&mut self, ctx: &HuntContext<'_>) -> Result<TradeSignal, Rejection> {
        let gate = ctx
            .policy
            .trade_gate(ctx.now, ctx.news, &ctx.instrument.currencies);
        if !gate.is_open() {
            return Err(Rejection::TradeGateClosed(gate));
        }
        if let Some(last) = self.last_signal {
            let elapsed = ctx.now - last;
            if elapsed < self.cooldown() {
                return Err(Rejection::Cooldown {
                    remaining_secs: (self.cooldown() - elapsed).num_seconds(),
                });
            }
        }

        if !ctx.scan.displacement {
            return Err(Rejection::NoDisplacement);
        }
        if ctx.scan.structure_shift.is_none() {
            return Err(Rejection::NoStructureShift);
        }

        if ctx.phase != MarketPhase::Manipulation {
            return Err(Rejection::WrongPhase(ctx.phase));
        }
        let in_hunt_zone = self
            .config
            .hunt_killzones
            .iter()
            .any(|name| ctx.policy.in_killzone(ctx.now, name));
        if !in_hunt_zone {
            return Err(Rejection::OutsideHuntKillzone);
        }
        if ctx.scan.judas_swing.is_none() {
            return Err(Rejection::NoJudasSwing);
        }

        let ote = find_optimal_trade_entry_zone(&ctx.scan.swings).ok_or(Rejection::NoOteZone)?;

        let mut gaps = ctx.scanner.get_active_fvgs();
        gaps.reverse();
        gaps.truncate(self.config.max_fvgs);
        let mut blocks = ctx.scanner.get_active_obs(self.config.max_obs);
        blocks.reverse();

        let params = SearchParams {
            ote: &ote,
            swings: &ctx.scan.swings,
            max_gap_distance: ctx.timeframe.duration() * self.config.proximity_bars,
            stop_buffer: ctx.instrument.pips_to_price(self.config.stop_buffer_pips),
        };
        let found = find_confluence(&gaps, &blocks, &params).ok_or(Rejection::NoConfluence)?;

        let signal = self.build_signal(&found, ctx);
        debug!(
            gap = %found.gap,
            block = %found.block,
            direction = %found.direction,
            entry = signal.entry_price,
            stop = signal.stop_loss,
            target = signal.take_profit,
            "confluence found"
        );
        self.last_signal = Some(ctx.now);
        Ok(signal)
    }

    fn build_signal(&self, found: &Confluence, ctx: &HuntContext<'_>) -> TradeSignal {
        let risk = (found.entry - found.stop).abs();
        let take_profit = found.entry + found.direction.sign() * risk * self.config.risk_reward;
        let volume = match self.config.sizing {
            Sizing::Fixed { lots } => ctx.instrument.round_lots(lots),
            Sizing::Risk => ctx.warden.calculate_lot_size(
                ctx.balance,
                ctx.instrument.to_pips(risk),
                ctx.instrument,
            ),
        };
        TradeSignal {
            direction: found.direction,
            entry_price: found.entry,
            stop_loss: found.stop,
            take_profit,
            volume,
            open_timestamp: ctx.now,
        }
    }
}

impl Default for SignalHunter {
    fn default() -> Self {
        Self::new(HunterConfig::default())
    }
}
