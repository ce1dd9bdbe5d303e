//! Swing points, liquidity pools and the levels derived from swing legs.

use super::{tail, PriceRange};
use crate::domain::{Bar, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retracement ratios bounding the optimal trade entry zone.
pub const OTE_SHALLOW: f64 = 0.62;
pub const OTE_DEEP: f64 = 0.79;

/// A local extreme at `index` within the scanned window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Swing highs and lows, each ordered by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingPoints {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

impl SwingPoints {
    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }

    pub fn max_high(&self) -> Option<f64> {
        self.highs.iter().map(|s| s.price).reduce(f64::max)
    }

    pub fn min_low(&self) -> Option<f64> {
        self.lows.iter().map(|s| s.price).reduce(f64::min)
    }
}

/// Bars with at least `strength` neighbours on each side whose high (low) is
/// greater (less) than or equal to every neighbour's.
///
/// Equal neighbours do not disqualify a bar, so a flat top yields several
/// adjacent swing highs.
pub fn find_swing_points(window: &[Bar], strength: usize) -> SwingPoints {
    let mut points = SwingPoints::default();
    if strength == 0 || window.len() < 2 * strength + 1 {
        return points;
    }

    for i in strength..window.len() - strength {
        let neighbours = window[i - strength..=i + strength]
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != strength)
            .map(|(_, b)| b);
        let bar = &window[i];

        let (mut is_high, mut is_low) = (true, true);
        for other in neighbours {
            is_high &= bar.high >= other.high;
            is_low &= bar.low <= other.low;
        }

        if is_high {
            points.highs.push(SwingPoint {
                index: i,
                timestamp: bar.timestamp,
                price: bar.high,
            });
        }
        if is_low {
            points.lows.push(SwingPoint {
                index: i,
                timestamp: bar.timestamp,
                price: bar.low,
            });
        }
    }
    points
}

/// Candidate sweep targets: swing levels inside the last `lookback` bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPools {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

pub fn get_liquidity_pools(window: &[Bar], lookback: usize, strength: usize) -> LiquidityPools {
    let swings = find_swing_points(tail(window, lookback), strength);
    LiquidityPools {
        highs: swings.highs.iter().map(|s| s.price).collect(),
        lows: swings.lows.iter().map(|s| s.price).collect(),
    }
}

/// The 62%–79% retracement band of a swing leg. `bottom < top` always.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OteZone {
    pub bottom: f64,
    pub top: f64,
    /// Direction of the leg being retraced.
    pub direction: Direction,
}

impl OteZone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }
}

/// OTE zone of the most recent swing leg.
///
/// The leg runs from the older of the last swing high and last swing low to
/// the newer one: low then high is a bullish leg, high then low bearish.
/// Returns `None` without both a swing high and a swing low, or when both sit
/// on the same bar.
pub fn find_optimal_trade_entry_zone(swings: &SwingPoints) -> Option<OteZone> {
    let high = swings.highs.last()?;
    let low = swings.lows.last()?;
    let range = high.price - low.price;

    if high.index > low.index {
        Some(OteZone {
            bottom: high.price - range * OTE_DEEP,
            top: high.price - range * OTE_SHALLOW,
            direction: Direction::Bullish,
        })
    } else if low.index > high.index {
        Some(OteZone {
            bottom: low.price + range * OTE_SHALLOW,
            top: low.price + range * OTE_DEEP,
            direction: Direction::Bearish,
        })
    } else {
        None
    }
}

/// High/low of the bars whose timestamp satisfies `in_session`.
///
/// The caller decides session membership (usually a local-time window from
/// the time policy).
pub fn session_range<F>(bars: &[Bar], in_session: F) -> Option<PriceRange>
where
    F: Fn(DateTime<Utc>) -> bool,
{
    let inside: Vec<Bar> = bars
        .iter()
        .filter(|b| in_session(b.timestamp))
        .cloned()
        .collect();
    PriceRange::of(&inside)
}
