//! Gap/block confluence search and trade level construction.

use crate::domain::{BlockId, Direction, GapId};
use crate::scanner::{FairValueGap, OrderBlock, OteZone, SwingPoints};
use chrono::Duration;
use serde::Serialize;

/// A gap and block that agree with each other and with the OTE zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confluence {
    pub gap: GapId,
    pub block: BlockId,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
}

/// Entry on the gap edge nearest the block: the lower of gap low and block
/// level for longs, the higher of gap high and block level for shorts.
pub fn entry_price(gap: &FairValueGap, block: &OrderBlock) -> f64 {
    match gap.direction {
        Direction::Bullish => gap.low.min(block.price),
        Direction::Bearish => gap.high.max(block.price),
    }
}

/// Protective stop beyond the most recent swing extreme, or `None` when it
/// would not sit on the losing side of `entry`.
pub fn protective_stop(
    direction: Direction,
    entry: f64,
    swings: &SwingPoints,
    buffer: f64,
) -> Option<f64> {
    match direction {
        Direction::Bullish => {
            let stop = swings.lows.last()?.price - buffer;
            (stop < entry).then_some(stop)
        }
        Direction::Bearish => {
            let stop = swings.highs.last()?.price + buffer;
            (stop > entry).then_some(stop)
        }
    }
}

/// Search inputs beyond the candidate lists.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams<'a> {
    pub ote: &'a OteZone,
    pub swings: &'a SwingPoints,
    pub max_gap_distance: Duration,
    pub stop_buffer: f64,
}

/// First qualifying (gap, block) pair.
///
/// `gaps` and `blocks` are expected newest-first; gaps drive the outer loop.
/// Candidates with a stop on the wrong side are skipped, not fatal.
pub fn find_confluence(
    gaps: &[(GapId, &FairValueGap)],
    blocks: &[(BlockId, &OrderBlock)],
    params: &SearchParams<'_>,
) -> Option<Confluence> {
    for (gap_id, gap) in gaps {
        if gap.direction != params.ote.direction {
            continue;
        }
        for (block_id, block) in blocks {
            if block.direction != gap.direction {
                continue;
            }
            let distance = (gap.anchor_timestamp - block.anchor_timestamp).abs();
            if distance > params.max_gap_distance {
                continue;
            }
            let entry = entry_price(gap, block);
            if !params.ote.contains(entry) {
                continue;
            }
            let Some(stop) = protective_stop(gap.direction, entry, params.swings, params.stop_buffer)
            else {
                continue;
            };
            return Some(Confluence {
                gap: *gap_id,
                block: *block_id,
                direction: gap.direction,
                entry,
                stop,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SwingPoint;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn gap(low: f64, high: f64, minute: i64, direction: Direction) -> FairValueGap {
        FairValueGap {
            low,
            high,
            anchor_index: 0,
            anchor_timestamp: ts(minute),
            direction,
            mitigated: false,
            mitigated_at_price: None,
        }
    }

    fn block(price: f64, minute: i64, direction: Direction) -> OrderBlock {
        OrderBlock {
            price,
            anchor_index: 0,
            anchor_timestamp: ts(minute),
            direction,
            mitigated: false,
            candle_high: price,
            candle_low: price - 0.0005,
        }
    }

    fn swings(low: f64, high: f64) -> SwingPoints {
        SwingPoints {
            highs: vec![SwingPoint {
                index: 5,
                timestamp: ts(25),
                price: high,
            }],
            lows: vec![SwingPoint {
                index: 1,
                timestamp: ts(5),
                price: low,
            }],
        }
    }

    fn bullish_zone() -> OteZone {
        OteZone {
            bottom: 1.1010,
            top: 1.1040,
            direction: Direction::Bullish,
        }
    }

    #[test]
    fn entry_is_nearer_edge() {
        let g = gap(1.1020, 1.1030, 0, Direction::Bullish);
        assert_eq!(entry_price(&g, &block(1.1025, 0, Direction::Bullish)), 1.1020);
        assert_eq!(entry_price(&g, &block(1.1015, 0, Direction::Bullish)), 1.1015);
        let g = gap(1.1020, 1.1030, 0, Direction::Bearish);
        assert_eq!(entry_price(&g, &block(1.1035, 0, Direction::Bearish)), 1.1035);
    }

    #[test]
    fn stop_must_be_on_losing_side() {
        let s = swings(1.1000, 1.1060);
        assert!((protective_stop(Direction::Bullish, 1.1020, &s, 0.0005).unwrap() - 1.0995).abs() < 1e-12);
        assert_eq!(protective_stop(Direction::Bullish, 1.0990, &s, 0.0005), None);
        assert!((protective_stop(Direction::Bearish, 1.1020, &s, 0.0005).unwrap() - 1.1065).abs() < 1e-12);
        assert_eq!(protective_stop(Direction::Bullish, 1.0995, &s, 0.0005), None);
    }

    #[test]
    fn first_matching_pair_wins() {
        let zone = bullish_zone();
        let s = swings(1.1000, 1.1060);
        let newer = gap(1.1020, 1.1030, 30, Direction::Bullish);
        let older = gap(1.1015, 1.1025, 10, Direction::Bullish);
        let ob = block(1.1022, 20, Direction::Bullish);
        let params = SearchParams {
            ote: &zone,
            swings: &s,
            max_gap_distance: Duration::minutes(50),
            stop_buffer: 0.0005,
        };
        let found = find_confluence(
            &[(GapId(2), &newer), (GapId(1), &older)],
            &[(BlockId(0), &ob)],
            &params,
        )
        .unwrap();
        assert_eq!(found.gap, GapId(2));
        assert!((found.entry - 1.1020).abs() < 1e-12);
    }

    #[test]
    fn proximity_and_direction_filter() {
        let zone = bullish_zone();
        let s = swings(1.1000, 1.1060);
        let g = gap(1.1020, 1.1030, 0, Direction::Bullish);
        let far = block(1.1022, 120, Direction::Bullish);
        let wrong = block(1.1022, 5, Direction::Bearish);
        let params = SearchParams {
            ote: &zone,
            swings: &s,
            max_gap_distance: Duration::minutes(50),
            stop_buffer: 0.0005,
        };
        assert!(find_confluence(
            &[(GapId(0), &g)],
            &[(BlockId(0), &far), (BlockId(1), &wrong)],
            &params
        )
        .is_none());
    }

    #[test]
    fn entry_outside_zone_is_skipped() {
        let zone = bullish_zone();
        let s = swings(1.1000, 1.1060);
        let g = gap(1.1045, 1.1050, 0, Direction::Bullish);
        let ob = block(1.1048, 0, Direction::Bullish);
        let params = SearchParams {
            ote: &zone,
            swings: &s,
            max_gap_distance: Duration::minutes(50),
            stop_buffer: 0.0005,
        };
        assert!(find_confluence(&[(GapId(0), &g)], &[(BlockId(0), &ob)], &params).is_none());
    }
}
