//! Pattern scanner: windowed detectors over OHLC bars.
//!
//! Every detector is a pure function of the window it is given and is safe to
//! call on short windows (empty list, `None` or `false`, never an error).
//! Cross-call mitigation tracking lives in [`ScannerState`], an explicit value
//! owned by the session rather than hidden inside the detectors.

pub mod blocks;
pub mod gaps;
pub mod state;
pub mod structure;
pub mod swings;

pub use blocks::{
    find_breaker_blocks, find_mitigation_blocks, find_order_blocks, BreakerBlock,
    MitigationBlock, OrderBlock,
};
pub use gaps::{find_fair_value_gaps, FairValueGap};
pub use state::{ScanReport, ScannerState};
pub use structure::{
    detect_displacement, detect_judas_swing, detect_market_structure_shift, is_range_bound,
};
pub use swings::{
    find_optimal_trade_entry_zone, find_swing_points, get_liquidity_pools, session_range,
    LiquidityPools, OteZone, SwingPoint, SwingPoints,
};

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Detector parameters shared by the session and the hunter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub ob_lookback: usize,
    pub displacement_multiplier: f64,
    pub displacement_lookback: usize,
    pub swing_strength: usize,
    pub structure_lookback: usize,
    pub judas_lookback: usize,
    pub range_threshold: f64,
    pub range_lookback: usize,
    pub liquidity_lookback: usize,
    /// Cap on the active order block view.
    pub max_active_blocks: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ob_lookback: 20,
            displacement_multiplier: 1.5,
            displacement_lookback: 20,
            swing_strength: 2,
            structure_lookback: 20,
            judas_lookback: 20,
            range_threshold: 5.0,
            range_lookback: 20,
            liquidity_lookback: 50,
            max_active_blocks: 10,
        }
    }
}

/// High/low extent of a group of bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
}

impl PriceRange {
    pub fn of(bars: &[Bar]) -> Option<Self> {
        let first = bars.first()?;
        Some(bars.iter().skip(1).fold(
            Self {
                high: first.high,
                low: first.low,
            },
            |acc, b| Self {
                high: acc.high.max(b.high),
                low: acc.low.min(b.low),
            },
        ))
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

/// Mean candle body of `bars` (0.0 for an empty slice).
pub fn average_body(bars: &[Bar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    bars.iter().map(Bar::body).sum::<f64>() / bars.len() as f64
}

/// The last `count` bars of `window` (all of it when shorter).
pub(crate) fn tail(window: &[Bar], count: usize) -> &[Bar] {
    &window[window.len().saturating_sub(count)..]
}
