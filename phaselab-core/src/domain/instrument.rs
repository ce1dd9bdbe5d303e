//! Instrument metadata: pip size, pip value and lot rounding.

use super::Direction;
use serde::{Deserialize, Serialize};

/// Contract description of a traded instrument.
///
/// P/L is quoted in account currency as `pips × pip_value_per_lot × lots`.
/// For a five-digit XXX/USD pair that is 0.0001 and $10 per standard lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub pip_size: f64,
    pub pip_value_per_lot: f64,
    pub lot_step: f64,
    pub min_lot: f64,
    /// Currencies whose macro events are relevant (e.g. `["EUR", "USD"]`).
    pub currencies: Vec<String>,
}

impl InstrumentSpec {
    pub fn fx_major(symbol: &str) -> Self {
        let currencies = if symbol.len() == 6 && symbol.is_ascii() {
            vec![symbol[..3].to_string(), symbol[3..].to_string()]
        } else {
            Vec::new()
        };
        Self {
            symbol: symbol.to_string(),
            pip_size: 0.0001,
            pip_value_per_lot: 10.0,
            lot_step: 0.01,
            min_lot: 0.01,
            currencies,
        }
    }

    /// Convert a price distance into pips.
    pub fn to_pips(&self, distance: f64) -> f64 {
        distance / self.pip_size
    }

    /// Convert a pip count into a price distance.
    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    /// Account-currency P/L of moving from `entry` to `exit`.
    pub fn pnl(&self, direction: Direction, entry: f64, exit: f64, volume: f64) -> f64 {
        let pips = self.to_pips((exit - entry) * direction.sign());
        pips * self.pip_value_per_lot * volume
    }

    /// Round a raw lot size to the step, never below the minimum lot.
    pub fn round_lots(&self, lots: f64) -> f64 {
        if !lots.is_finite() || lots <= 0.0 {
            return self.min_lot;
        }
        let stepped = if self.lot_step > 0.0 {
            (lots / self.lot_step).round() * self.lot_step
        } else {
            lots
        };
        let rounded = (stepped.max(self.min_lot) * 100.0).round() / 100.0;
        rounded.max(self.min_lot)
    }
}

impl Default for InstrumentSpec {
    fn default() -> Self {
        Self::fx_major("EURUSD")
    }
}
