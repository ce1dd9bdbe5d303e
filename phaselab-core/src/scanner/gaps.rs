//! Fair value gaps: three-bar price imbalances.

use crate::domain::{Bar, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A price imbalance left between two adjacent bars of a three-bar sequence.
///
/// `anchor_index` is relative to the window the gap was found in; across scans
/// the stable handle is `anchor_timestamp` (or the arena id in `ScannerState`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub low: f64,
    pub high: f64,
    pub anchor_index: usize,
    pub anchor_timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub mitigated: bool,
    pub mitigated_at_price: Option<f64>,
}

impl FairValueGap {
    /// One-way mitigation check.
    ///
    /// A bullish gap is mitigated once price trades down to its lower bound,
    /// a bearish gap once price trades up to its upper bound. After the first
    /// `true` the flag never reverts and `price` is ignored.
    pub fn is_mitigated(&mut self, price: f64) -> bool {
        if self.mitigated {
            return true;
        }
        let hit = match self.direction {
            Direction::Bullish => price <= self.low,
            Direction::Bearish => price >= self.high,
        };
        if hit {
            self.mitigated = true;
            self.mitigated_at_price = Some(price);
        }
        self.mitigated
    }

    /// Mitigate against the side of a bar that trades into the gap.
    pub fn mitigate_with_bar(&mut self, bar: &Bar) -> bool {
        let probe = match self.direction {
            Direction::Bullish => bar.low,
            Direction::Bearish => bar.high,
        };
        self.is_mitigated(probe)
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn size(&self) -> f64 {
        self.high - self.low
    }
}

/// Scan every (prev, curr, next) triple in the window for gaps.
///
/// Bullish when `curr.low > prev.high` (gap `[prev.high, curr.low]`), bearish
/// when `curr.high < prev.low` (gap `[curr.high, prev.low]`). The gap is
/// anchored on `curr` and needs a following bar to be confirmed. Output is
/// ordered by anchor timestamp.
pub fn find_fair_value_gaps(window: &[Bar]) -> Vec<FairValueGap> {
    if window.len() < 3 {
        return Vec::new();
    }

    let mut gaps = Vec::new();
    for i in 1..window.len() - 1 {
        let prev = &window[i - 1];
        let curr = &window[i];

        if curr.low > prev.high {
            gaps.push(FairValueGap {
                low: prev.high,
                high: curr.low,
                anchor_index: i,
                anchor_timestamp: curr.timestamp,
                direction: Direction::Bullish,
                mitigated: false,
                mitigated_at_price: None,
            });
        } else if curr.high < prev.low {
            gaps.push(FairValueGap {
                low: curr.high,
                high: prev.low,
                anchor_index: i,
                anchor_timestamp: curr.timestamp,
                direction: Direction::Bearish,
                mitigated: false,
                mitigated_at_price: None,
            });
        }
    }
    gaps
}
