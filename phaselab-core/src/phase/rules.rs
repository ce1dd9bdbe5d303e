//! The phase transition rule as a pure function.

use super::{MarketPhase, PhaseNote, RangeSide};
use crate::domain::{Bar, Direction};
use crate::scanner::PriceRange;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Relative break beyond the consolidation range needed for a sweep
    /// (0.0005 = 0.05%).
    pub sweep_tolerance: f64,
    /// Bars in the recent average true range.
    pub volatility_short: usize,
    /// Bars in the trailing average true range it is compared against.
    pub volatility_long: usize,
    /// Recent / trailing volatility ratio that marks a pullback.
    pub pullback_factor: f64,
    /// Close-to-close move, in pips, that marks distribution.
    pub distribution_pips: f64,
    /// How many bars back the distribution move is measured from.
    pub distribution_bars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sweep_tolerance: 0.0005,
            volatility_short: 5,
            volatility_long: 20,
            pullback_factor: 1.5,
            distribution_pips: 20.0,
            distribution_bars: 10,
        }
    }
}

/// Everything the rule looks at for one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseInputs {
    pub bar: Bar,
    pub in_asian: bool,
    pub in_early_london: bool,
    /// High/low of the current Asian session so far.
    pub asian_range: Option<PriceRange>,
    /// Most recently recorded consolidation range.
    pub recorded_range: Option<PriceRange>,
    /// Average true range over the short and long periods.
    pub recent_volatility: Option<f64>,
    pub baseline_volatility: Option<f64>,
    /// Close `distribution_bars` ago.
    pub reference_close: Option<f64>,
    pub pip_size: f64,
}

/// Evaluate the transition rules in priority order; `None` means stay put.
///
/// A `Some` whose phase equals `current` is a re-entry: the caller merges
/// the annotation without restarting the phase clock.
pub fn next_phase(
    current: MarketPhase,
    inputs: &PhaseInputs,
    cfg: &ClassifierConfig,
) -> Option<PhaseNote> {
    // 1. Asian session pre-empts everything.
    if inputs.in_asian {
        let range = inputs.asian_range?;
        return Some(PhaseNote::Consolidation { range });
    }

    // 2. Early London sweep of the recorded range, from any phase.
    if inputs.in_early_london {
        if let Some(range) = inputs.recorded_range {
            if let Some(note) = sweep_of(range, &inputs.bar, cfg.sweep_tolerance) {
                return Some(note);
            }
        }
    }

    // 3. Volatility expansion after the sweep.
    if current == MarketPhase::Manipulation {
        if let (Some(recent), Some(baseline)) =
            (inputs.recent_volatility, inputs.baseline_volatility)
        {
            if baseline > 0.0 && recent > baseline * cfg.pullback_factor {
                return Some(PhaseNote::Retracement {
                    recent_volatility: recent,
                    baseline_volatility: baseline,
                });
            }
        }
    }

    // 4. Sustained move away from N bars ago.
    if matches!(
        current,
        MarketPhase::Manipulation | MarketPhase::Retracement
    ) && inputs.pip_size > 0.0
    {
        if let Some(reference) = inputs.reference_close {
            let moved = inputs.bar.close - reference;
            let pips = moved.abs() / inputs.pip_size;
            if pips > cfg.distribution_pips {
                let direction = if moved > 0.0 {
                    Direction::Bullish
                } else {
                    Direction::Bearish
                };
                return Some(PhaseNote::Distribution {
                    displacement_pips: pips,
                    direction,
                });
            }
        }
    }

    None
}

fn sweep_of(range: PriceRange, bar: &Bar, tolerance: f64) -> Option<PhaseNote> {
    let upper = range.high * (1.0 + tolerance);
    let lower = range.low * (1.0 - tolerance);
    if bar.high > upper {
        Some(PhaseNote::Manipulation {
            swept: RangeSide::High,
            level: range.high,
            break_size: bar.high - range.high,
            bias: Direction::Bearish,
        })
    } else if bar.low < lower {
        Some(PhaseNote::Manipulation {
            swept: RangeSide::Low,
            level: range.low,
            break_size: range.low - bar.low,
            bias: Direction::Bullish,
        })
    } else {
        None
    }
}
