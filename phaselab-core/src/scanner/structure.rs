//! Displacement, structure shifts, liquidity sweeps and range detection.

use super::swings::find_swing_points;
use super::{average_body, tail, PriceRange};
use crate::domain::{Bar, Direction};

/// True iff the last bar's body exceeds `multiplier` times the average body
/// of the `lookback` bars before it.
pub fn detect_displacement(window: &[Bar], multiplier: f64, lookback: usize) -> bool {
    if lookback == 0 || window.len() < lookback + 1 {
        return false;
    }
    let (last, earlier) = match window.split_last() {
        Some(split) => split,
        None => return false,
    };
    last.body() > multiplier * average_body(tail(earlier, lookback))
}

/// Close of the latest bar beyond the swing extremes of the recent window.
///
/// Swings are found in the last `lookback` bars excluding the current one;
/// the current bar is the breaking candidate. Bullish is checked first.
pub fn detect_market_structure_shift(
    window: &[Bar],
    lookback: usize,
    swing_strength: usize,
) -> Option<Direction> {
    let recent = tail(window, lookback);
    let (current, prior) = recent.split_last()?;
    let swings = find_swing_points(prior, swing_strength);

    if swings.max_high().is_some_and(|h| current.close > h) {
        return Some(Direction::Bullish);
    }
    if swings.min_low().is_some_and(|l| current.close < l) {
        return Some(Direction::Bearish);
    }
    None
}

/// Liquidity sweep of a recent swing extreme rejected on the same bar.
///
/// Bearish: the bar trades above the highest recent swing high, closes down,
/// and its upper wick is longer than its body. Bullish mirrors this on swing
/// lows with a bullish close and a dominant lower wick.
pub fn detect_judas_swing(
    window: &[Bar],
    lookback: usize,
    swing_strength: usize,
) -> Option<Direction> {
    let recent = tail(window, lookback);
    let (current, prior) = recent.split_last()?;
    let swings = find_swing_points(prior, swing_strength);

    let swept_high = swings.max_high().is_some_and(|h| current.high > h);
    if swept_high && current.is_bearish() && current.upper_wick() > current.body() {
        return Some(Direction::Bearish);
    }
    let swept_low = swings.min_low().is_some_and(|l| current.low < l);
    if swept_low && current.is_bullish() && current.lower_wick() > current.body() {
        return Some(Direction::Bullish);
    }
    None
}

/// True iff the high-low extent of the last `lookback` bars is narrower than
/// `threshold_multiplier` average bodies.
pub fn is_range_bound(window: &[Bar], threshold_multiplier: f64, lookback: usize) -> bool {
    if lookback == 0 || window.len() < lookback {
        return false;
    }
    let recent = tail(window, lookback);
    match PriceRange::of(recent) {
        Some(range) => range.width() < threshold_multiplier * average_body(recent),
        None => false,
    }
}
