//! Performance metrics: pure functions over the equity curve and trade list.

use phaselab_core::domain::ClosedTrade;
use serde::{Deserialize, Serialize};

/// Aggregate statistics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_balance: f64,
    pub final_equity: f64,
    pub total_return: f64,
    /// Largest peak-to-trough decline as a positive fraction of the peak.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Infinite when there are winners and no losers.
    pub profit_factor: f64,
    pub trade_count: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[ClosedTrade], initial_balance: f64) -> Self {
        let final_equity = equity_curve.last().copied().unwrap_or(initial_balance);
        let (gross_profit, gross_loss) = gross(trades);
        Self {
            initial_balance,
            final_equity,
            total_return: total_return(initial_balance, final_equity),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            gross_profit,
            gross_loss,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final - initial) / initial`; zero for a non-positive start.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

/// Max over t of `(running_peak - equity) / running_peak`.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Fraction of trades with positive P/L.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit over gross loss.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let (gross_profit, gross_loss) = gross(trades);
    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// (sum of winning P/L, absolute sum of losing P/L).
fn gross(trades: &[ClosedTrade]) -> (f64, f64) {
    trades.iter().fold((0.0, 0.0), |(profit, loss), t| {
        if t.pnl > 0.0 {
            (profit + t.pnl, loss)
        } else {
            (profit, loss - t.pnl.min(0.0))
        }
    })
}
