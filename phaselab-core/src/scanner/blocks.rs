//! Order blocks and the blocks derived from failed structure.

use super::swings::SwingPoints;
use crate::domain::{Bar, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The last opposing candle before a displacement candle.
///
/// `price` is the single reference level: the high of the down-candle before
/// a bullish displacement, the low of the up-candle before a bearish one. The
/// candle's full range is kept for breaker detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub price: f64,
    pub anchor_index: usize,
    pub anchor_timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub mitigated: bool,
    pub candle_high: f64,
    pub candle_low: f64,
}

impl OrderBlock {
    /// One-way mitigation check, same lifecycle as a fair value gap.
    pub fn is_mitigated(&mut self, price: f64) -> bool {
        if self.mitigated {
            return true;
        }
        self.mitigated = match self.direction {
            Direction::Bullish => price <= self.price,
            Direction::Bearish => price >= self.price,
        };
        self.mitigated
    }

    pub fn mitigate_with_bar(&mut self, bar: &Bar) -> bool {
        let probe = match self.direction {
            Direction::Bullish => bar.low,
            Direction::Bearish => bar.high,
        };
        self.is_mitigated(probe)
    }
}

/// Find one order block per qualifying displacement bar.
///
/// Rolling average body over `lookback` bars (inclusive of the candidate); a
/// bar displaces when its body exceeds `displacement_multiplier` times that
/// average. Only displacement bars preceded by an opposite-colour candle
/// produce a block.
pub fn find_order_blocks(
    window: &[Bar],
    lookback: usize,
    displacement_multiplier: f64,
) -> Vec<OrderBlock> {
    if lookback == 0 || window.len() <= lookback {
        return Vec::new();
    }

    let bodies: Vec<f64> = window.iter().map(Bar::body).collect();
    let mut rolling: f64 = bodies[1..=lookback].iter().sum();
    let mut blocks = Vec::new();

    for i in lookback..window.len() {
        if i > lookback {
            rolling += bodies[i] - bodies[i - lookback];
        }
        let avg_body = rolling / lookback as f64;
        let candle = &window[i];
        if candle.body() <= displacement_multiplier * avg_body {
            continue;
        }

        let prev = &window[i - 1];
        let block = if candle.is_bullish() && prev.is_bearish() {
            Some((Direction::Bullish, prev.high))
        } else if candle.is_bearish() && prev.is_bullish() {
            Some((Direction::Bearish, prev.low))
        } else {
            None
        };

        if let Some((direction, price)) = block {
            blocks.push(OrderBlock {
                price,
                anchor_index: i - 1,
                anchor_timestamp: prev.timestamp,
                direction,
                mitigated: false,
                candle_high: prev.high,
                candle_low: prev.low,
            });
        }
    }
    blocks
}

/// An order block that price later closed through on the far side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerBlock {
    pub anchor_timestamp: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    /// Direction of the original order block.
    pub direction: Direction,
    pub break_timestamp: DateTime<Utc>,
}

/// Order blocks that failed: a bullish block closed through above its candle
/// high, a bearish block closed through below its candle low.
pub fn find_breaker_blocks(window: &[Bar], blocks: &[OrderBlock]) -> Vec<BreakerBlock> {
    blocks
        .iter()
        .filter_map(|ob| {
            let broken = window
                .iter()
                .filter(|b| b.timestamp > ob.anchor_timestamp)
                .find(|b| match ob.direction {
                    Direction::Bullish => b.close > ob.candle_high,
                    Direction::Bearish => b.close < ob.candle_low,
                })?;
            Some(BreakerBlock {
                anchor_timestamp: ob.anchor_timestamp,
                high: ob.candle_high,
                low: ob.candle_low,
                direction: ob.direction,
                break_timestamp: broken.timestamp,
            })
        })
        .collect()
}

/// A swing point whose candle was later closed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationBlock {
    pub anchor_timestamp: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    /// Bullish for a failed swing low, bearish for a failed swing high.
    pub direction: Direction,
    pub break_timestamp: DateTime<Utc>,
}

/// Swing highs later closed below their candle low, and swing lows later
/// closed above their candle high.
pub fn find_mitigation_blocks(window: &[Bar], swings: &SwingPoints) -> Vec<MitigationBlock> {
    let mut out = Vec::new();
    let mut scan = |index: usize, direction: Direction| {
        let Some(anchor) = window.get(index) else {
            return;
        };
        let broken = window[index + 1..].iter().find(|b| match direction {
            Direction::Bearish => b.close < anchor.low,
            Direction::Bullish => b.close > anchor.high,
        });
        if let Some(b) = broken {
            out.push(MitigationBlock {
                anchor_timestamp: anchor.timestamp,
                high: anchor.high,
                low: anchor.low,
                direction,
                break_timestamp: b.timestamp,
            });
        }
    };
    for sh in &swings.highs {
        scan(sh.index, Direction::Bearish);
    }
    for sl in &swings.lows {
        scan(sl.index, Direction::Bullish);
    }
    out
}
