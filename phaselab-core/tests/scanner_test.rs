//! Scanner integration tests: detectors and the arena over realistic windows.

use chrono::{DateTime, Duration, TimeZone, Utc};
use phaselab_core::domain::{Bar, Direction};
use phaselab_core::scanner::{
    detect_market_structure_shift, find_fair_value_gaps, find_order_blocks, ScannerConfig,
    ScannerState,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
}

fn bars(rows: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    rows.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar::new(t0() + Duration::minutes(5 * i as i64), o, h, l, c))
        .collect()
}

/// Mid prices 1.1000, 1.1020, 1.1040, 1.1020 repeated, ±5 pips of range.
fn zigzag(n: usize) -> Vec<(f64, f64, f64, f64)> {
    let cycle = [1.1000, 1.1020, 1.1040, 1.1020];
    (0..n)
        .map(|i| {
            let mid = cycle[i % cycle.len()];
            (mid, mid + 0.0005, mid - 0.0005, mid)
        })
        .collect()
}

/// Twenty small down candles, then a large up candle and one follow-through bar.
fn decline_then_impulse() -> Vec<(f64, f64, f64, f64)> {
    let mut rows: Vec<_> = (0..20)
        .map(|i| {
            let open = 1.1000 - i as f64 * 0.0002;
            let close = open - 0.0002;
            (open, open + 0.0001, close - 0.0001, close)
        })
        .collect();
    rows.push((1.0960, 1.1012, 1.0958, 1.1010));
    rows.push((1.1010, 1.1025, 1.1005, 1.1020));
    rows
}

// ── Fair value gaps ──────────────────────────────────────────────────

#[test]
fn three_bar_imbalance_yields_bullish_gap() {
    let window = bars(&[
        (1.0, 1.1, 0.95, 1.08),
        (1.2, 1.25, 1.15, 1.22),
        (1.3, 1.35, 1.22, 1.33),
    ]);
    let gaps = find_fair_value_gaps(&window);
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].direction, Direction::Bullish);
    assert!((gaps[0].low - 1.1).abs() < 1e-12);
    assert!((gaps[0].high - 1.15).abs() < 1e-12);
}

#[test]
fn overlapping_ramp_then_flat_has_no_gaps() {
    let mut rows: Vec<_> = (0..15)
        .map(|i| {
            let o = 1.1000 + i as f64 * 0.0003;
            (o, o + 0.0005, o - 0.0002, o + 0.0003)
        })
        .collect();
    let last = rows[rows.len() - 1].3;
    rows.extend((0..10).map(|_| (last, last + 0.0002, last - 0.0002, last)));
    assert!(find_fair_value_gaps(&bars(&rows)).is_empty());
}

// ── Structure ────────────────────────────────────────────────────────

#[test]
fn close_above_every_swing_high_is_bullish_shift() {
    let mut rows = zigzag(19);
    rows.push((1.1040, 1.1085, 1.1035, 1.1080));
    assert_eq!(
        detect_market_structure_shift(&bars(&rows), 20, 2),
        Some(Direction::Bullish)
    );
}

#[test]
fn close_below_every_swing_low_is_bearish_shift() {
    let mut rows = zigzag(19);
    rows.push((1.1000, 1.1005, 1.0955, 1.0960));
    assert_eq!(
        detect_market_structure_shift(&bars(&rows), 20, 2),
        Some(Direction::Bearish)
    );
}

#[test]
fn flat_series_has_no_shift() {
    let rows = vec![(1.1, 1.1005, 1.0995, 1.1); 25];
    assert_eq!(detect_market_structure_shift(&bars(&rows), 20, 2), None);
}

// ── Order blocks and the arena ───────────────────────────────────────

#[test]
fn last_down_candle_before_impulse_is_bullish_block() {
    let window = bars(&decline_then_impulse());
    let blocks = find_order_blocks(&window, 20, 1.5);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].direction, Direction::Bullish);
    assert_eq!(blocks[0].anchor_index, 19);
    assert!((blocks[0].price - 1.0963).abs() < 1e-9);
}

#[test]
fn arena_tracks_block_until_price_returns() {
    let cfg = ScannerConfig::default();
    let mut rows = decline_then_impulse();
    let mut state = ScannerState::new();

    let report = state.update(&bars(&rows), &cfg);
    assert_eq!(report.new_blocks.len(), 1);
    let id = report.new_blocks[0];
    assert_eq!(state.get_active_obs(10).len(), 1);

    // Same window again: nothing new, nothing mitigated.
    let again = state.update(&bars(&rows), &cfg);
    assert!(again.new_blocks.is_empty());
    assert!(again.mitigated_blocks.is_empty());

    // Price trades back down into the block.
    rows.push((1.1020, 1.1022, 1.0960, 1.0990));
    let report = state.update(&bars(&rows), &cfg);
    assert!(report.mitigated_blocks.contains(&id));
    assert!(state.block(id).is_some_and(|b| b.mitigated));
    assert!(state.get_active_obs(10).iter().all(|(active, _)| *active != id));
}
