//! RiskWarden: daily-loss and drawdown halts, lot sizing, daily counters.

use super::AccountSnapshot;
use crate::domain::InstrumentSpec;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Limits in percent (3.0 = 3%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_daily_loss_pct: f64,
    pub max_drawdown_pct: f64,
    pub risk_per_trade_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: 3.0,
            max_drawdown_pct: 10.0,
            risk_per_trade_pct: 0.5,
        }
    }
}

/// Why new opens are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HaltReason {
    DailyLoss { daily_pnl: f64, limit: f64 },
    Drawdown { drawdown: f64, limit: f64 },
}

/// Lots that risk `risk_pct` of `balance` over a stop `stop_pips` away,
/// rounded to the lot step and floored at the minimum lot.
pub fn position_size(
    balance: f64,
    risk_pct: f64,
    stop_pips: f64,
    instrument: &InstrumentSpec,
) -> f64 {
    if stop_pips <= 0.0 || instrument.pip_value_per_lot <= 0.0 {
        return instrument.min_lot;
    }
    let risk_amount = balance * risk_pct / 100.0;
    instrument.round_lots(risk_amount / (stop_pips * instrument.pip_value_per_lot))
}

#[derive(Debug, Clone)]
pub struct RiskWarden {
    config: RiskConfig,
    trading_day: Option<NaiveDate>,
    halted: Option<HaltReason>,
    trades_today: u32,
    wins_today: u32,
}

impl RiskWarden {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            trading_day: None,
            halted: None,
            trades_today: 0,
            wins_today: 0,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Roll to `day` if it differs from the current trading day. Clears any
    /// halt and the daily counters. Returns true when a reset happened.
    pub fn begin_day(&mut self, day: NaiveDate) -> bool {
        if self.trading_day == Some(day) {
            return false;
        }
        let first = self.trading_day.is_none();
        self.trading_day = Some(day);
        self.halted = None;
        self.trades_today = 0;
        self.wins_today = 0;
        if !first {
            info!(%day, "daily risk reset");
        }
        true
    }

    pub fn trading_day(&self) -> Option<NaiveDate> {
        self.trading_day
    }

    /// Daily loss measured on realized balance against the day's opening
    /// balance; breached at or beyond the limit.
    pub fn is_daily_loss_breached(&self, account: &AccountSnapshot) -> Option<HaltReason> {
        let daily_pnl = account.balance - account.daily_start_balance;
        let limit = account.daily_start_balance.abs() * self.config.max_daily_loss_pct / 100.0;
        (daily_pnl <= -limit).then_some(HaltReason::DailyLoss { daily_pnl, limit })
    }

    /// Peak-to-trough drawdown of equity as a fraction of the peak.
    pub fn is_max_drawdown_breached(&self, account: &AccountSnapshot) -> Option<HaltReason> {
        if account.peak_equity <= 0.0 {
            return None;
        }
        let drawdown = (account.peak_equity - account.equity) / account.peak_equity;
        let limit = self.config.max_drawdown_pct / 100.0;
        (drawdown >= limit).then_some(HaltReason::Drawdown { drawdown, limit })
    }

    /// Check both limits; a breach latches until the next `begin_day`.
    pub fn allow_trade(&mut self, account: &AccountSnapshot) -> Result<(), HaltReason> {
        if let Some(reason) = self.halted {
            return Err(reason);
        }
        let breach = self
            .is_daily_loss_breached(account)
            .or_else(|| self.is_max_drawdown_breached(account));
        match breach {
            Some(reason) => {
                warn!(?reason, "trading halted by risk limits");
                self.halted = Some(reason);
                Err(reason)
            }
            None => Ok(()),
        }
    }

    pub fn halted(&self) -> Option<HaltReason> {
        self.halted
    }

    pub fn calculate_lot_size(
        &self,
        balance: f64,
        stop_pips: f64,
        instrument: &InstrumentSpec,
    ) -> f64 {
        position_size(balance, self.config.risk_per_trade_pct, stop_pips, instrument)
    }

    /// Count a closed trade toward today's tally.
    pub fn log_trade(&mut self, pnl: f64) {
        self.trades_today += 1;
        if pnl > 0.0 {
            self.wins_today += 1;
        }
    }

    pub fn trades_today(&self) -> u32 {
        self.trades_today
    }

    pub fn wins_today(&self) -> u32 {
        self.wins_today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: f64, equity: f64, peak: f64, day_start: f64) -> AccountSnapshot {
        AccountSnapshot {
            balance,
            equity,
            peak_equity: peak,
            daily_start_balance: day_start,
            open_positions: 0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn lot_size_from_risk() {
        let spec = InstrumentSpec::default();
        // 0.5% of 10k = $50 over 25 pips at $10/pip/lot = 0.2 lots.
        assert!((position_size(10_000.0, 0.5, 25.0, &spec) - 0.2).abs() < 1e-12);
        assert_eq!(position_size(10_000.0, 0.5, 0.0, &spec), spec.min_lot);
        assert_eq!(position_size(100.0, 0.5, 500.0, &spec), spec.min_lot);
    }

    #[test]
    fn daily_loss_at_limit_halts() {
        let mut w = RiskWarden::new(RiskConfig::default());
        w.begin_day(day(5));
        assert!(w.allow_trade(&account(9_701.0, 9_701.0, 10_000.0, 10_000.0)).is_ok());
        let err = w
            .allow_trade(&account(9_700.0, 9_700.0, 10_000.0, 10_000.0))
            .unwrap_err();
        assert!(matches!(err, HaltReason::DailyLoss { .. }));
    }

    #[test]
    fn drawdown_measured_on_equity() {
        let mut w = RiskWarden::new(RiskConfig::default());
        w.begin_day(day(5));
        // Balance untouched, floating loss takes equity 11% under the peak.
        let acct = account(11_000.0, 9_800.0, 11_000.0, 11_000.0);
        assert!(matches!(
            w.allow_trade(&acct),
            Err(HaltReason::Drawdown { .. })
        ));
    }

    #[test]
    fn halt_latches_until_next_day() {
        let mut w = RiskWarden::new(RiskConfig::default());
        w.begin_day(day(5));
        assert!(w.allow_trade(&account(9_600.0, 9_600.0, 10_000.0, 10_000.0)).is_err());
        // Recovery within the same day does not lift the halt.
        assert!(w.allow_trade(&account(10_000.0, 10_000.0, 10_000.0, 10_000.0)).is_err());
        assert!(!w.begin_day(day(5)));
        assert!(w.begin_day(day(6)));
        assert!(w.halted().is_none());
        assert!(w.allow_trade(&account(9_600.0, 9_600.0, 10_000.0, 9_600.0)).is_ok());
    }

    #[test]
    fn daily_counters_reset() {
        let mut w = RiskWarden::new(RiskConfig::default());
        w.begin_day(day(5));
        w.log_trade(50.0);
        w.log_trade(-20.0);
        assert_eq!((w.trades_today(), w.wins_today()), (2, 1));
        w.begin_day(day(6));
        assert_eq!((w.trades_today(), w.wins_today()), (0, 0));
    }
}
