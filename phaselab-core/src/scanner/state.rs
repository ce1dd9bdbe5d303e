//! Scanner state: an arena of gap and block records carried across bars.
//!
//! Each `update` rescans the current window, registers records it has not seen
//! before (keyed by anchor timestamp and direction) under a fresh stable id,
//! and runs one-way mitigation against every bar that formed after a record.
//! The same window sequence always produces the same ids, so a test can
//! rebuild the state from scratch and compare.
//!
//! The arena is bounded by the window: once a window starts after a record's
//! anchor, the record and its seen-key are dropped, except for the newest
//! `max_active_blocks` unmitigated blocks. Anchors older than the furthest
//! window start are never registered again.

use super::blocks::{find_order_blocks, OrderBlock};
use super::gaps::{find_fair_value_gaps, FairValueGap};
use super::structure::{
    detect_displacement, detect_judas_swing, detect_market_structure_shift, is_range_bound,
};
use super::swings::{find_swing_points, SwingPoints};
use super::ScannerConfig;
use crate::domain::{Bar, BlockId, Direction, GapId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// A tracked record plus the timestamp after which bars may mitigate it.
#[derive(Debug, Clone)]
struct Tracked<T> {
    record: T,
    /// Timestamp of the bar that completed the pattern.
    formed_at: DateTime<Utc>,
}

/// What one scan of the window found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub new_gaps: Vec<GapId>,
    pub new_blocks: Vec<BlockId>,
    pub mitigated_gaps: Vec<GapId>,
    pub mitigated_blocks: Vec<BlockId>,
    pub displacement: bool,
    pub structure_shift: Option<Direction>,
    pub judas_swing: Option<Direction>,
    pub range_bound: bool,
    /// Swing points of the whole window; indices are window positions.
    pub swings: SwingPoints,
}

#[derive(Debug, Clone, Default)]
pub struct ScannerState {
    gaps: BTreeMap<GapId, Tracked<FairValueGap>>,
    blocks: BTreeMap<BlockId, Tracked<OrderBlock>>,
    seen_gaps: HashSet<(DateTime<Utc>, Direction)>,
    seen_blocks: HashSet<(DateTime<Utc>, Direction)>,
    next_gap: u32,
    next_block: u32,
    last_seen: Option<DateTime<Utc>>,
    /// Furthest window start so far; nothing anchored before it is tracked.
    horizon: Option<DateTime<Utc>>,
}

impl ScannerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the newest bar processed so far.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// Rescan `window` and advance the arena.
    pub fn update(&mut self, window: &[Bar], cfg: &ScannerConfig) -> ScanReport {
        let mut report = ScanReport::default();
        let Some(newest) = window.last() else {
            return report;
        };
        let since = self.last_seen;

        // Existing records: only bars not yet seen can mitigate them.
        for (id, entry) in self.gaps.iter_mut().filter(|(_, e)| !e.record.mitigated) {
            let cutoff = since.map_or(entry.formed_at, |s| s.max(entry.formed_at));
            if mitigate_after(window, cutoff, |b| entry.record.mitigate_with_bar(b)) {
                report.mitigated_gaps.push(*id);
            }
        }
        for (id, entry) in self.blocks.iter_mut().filter(|(_, e)| !e.record.mitigated) {
            let cutoff = since.map_or(entry.formed_at, |s| s.max(entry.formed_at));
            if mitigate_after(window, cutoff, |b| entry.record.mitigate_with_bar(b)) {
                report.mitigated_blocks.push(*id);
            }
        }

        // New records: replay every bar after formation.
        for gap in find_fair_value_gaps(window) {
            if self.before_horizon(gap.anchor_timestamp)
                || !self.seen_gaps.insert((gap.anchor_timestamp, gap.direction))
            {
                continue;
            }
            let formed_at = window[gap.anchor_index + 1].timestamp;
            let mut entry = Tracked {
                record: gap,
                formed_at,
            };
            mitigate_after(window, formed_at, |b| entry.record.mitigate_with_bar(b));
            let id = GapId(self.next_gap);
            self.next_gap += 1;
            report.new_gaps.push(id);
            self.gaps.insert(id, entry);
        }
        for block in find_order_blocks(window, cfg.ob_lookback, cfg.displacement_multiplier) {
            if self.before_horizon(block.anchor_timestamp)
                || !self.seen_blocks.insert((block.anchor_timestamp, block.direction))
            {
                continue;
            }
            let formed_at = window[block.anchor_index + 1].timestamp;
            let mut entry = Tracked {
                record: block,
                formed_at,
            };
            mitigate_after(window, formed_at, |b| entry.record.mitigate_with_bar(b));
            let id = BlockId(self.next_block);
            self.next_block += 1;
            report.new_blocks.push(id);
            self.blocks.insert(id, entry);
        }

        self.prune(window, cfg.max_active_blocks);
        self.last_seen = Some(newest.timestamp);

        report.displacement =
            detect_displacement(window, cfg.displacement_multiplier, cfg.displacement_lookback);
        report.structure_shift =
            detect_market_structure_shift(window, cfg.structure_lookback, cfg.swing_strength);
        report.judas_swing = detect_judas_swing(window, cfg.judas_lookback, cfg.swing_strength);
        report.range_bound = is_range_bound(window, cfg.range_threshold, cfg.range_lookback);
        report.swings = find_swing_points(window, cfg.swing_strength);
        report
    }

    fn before_horizon(&self, anchor: DateTime<Utc>) -> bool {
        self.horizon.is_some_and(|h| anchor < h)
    }

    /// Drop whatever has scrolled out of the window. Blocks outside it
    /// survive only while among the `keep_blocks` newest unmitigated ones.
    fn prune(&mut self, window: &[Bar], keep_blocks: usize) {
        let Some(first) = window.first() else {
            return;
        };
        let horizon = self
            .horizon
            .map_or(first.timestamp, |h| h.max(first.timestamp));
        self.horizon = Some(horizon);

        self.gaps.retain(|_, e| e.record.anchor_timestamp >= horizon);
        self.seen_gaps.retain(|(ts, _)| *ts >= horizon);
        self.seen_blocks.retain(|(ts, _)| *ts >= horizon);

        let mut unmitigated: Vec<_> = self
            .blocks
            .iter()
            .filter(|(_, e)| !e.record.mitigated)
            .map(|(id, e)| (e.record.anchor_timestamp, *id))
            .collect();
        unmitigated.sort_unstable();
        let newest: HashSet<BlockId> = unmitigated
            .iter()
            .rev()
            .take(keep_blocks)
            .map(|(_, id)| *id)
            .collect();
        self.blocks
            .retain(|id, e| e.record.anchor_timestamp >= horizon || newest.contains(id));
    }

    pub fn gap(&self, id: GapId) -> Option<&FairValueGap> {
        self.gaps.get(&id).map(|e| &e.record)
    }

    pub fn block(&self, id: BlockId) -> Option<&OrderBlock> {
        self.blocks.get(&id).map(|e| &e.record)
    }

    /// Unmitigated gaps inside the window, oldest anchor first.
    pub fn get_active_fvgs(&self) -> Vec<(GapId, &FairValueGap)> {
        let mut active: Vec<_> = self
            .gaps
            .iter()
            .filter(|(_, e)| !e.record.mitigated)
            .map(|(id, e)| (*id, &e.record))
            .collect();
        active.sort_by_key(|(id, g)| (g.anchor_timestamp, *id));
        active
    }

    /// The `limit` most recent unmitigated blocks, oldest anchor first.
    pub fn get_active_obs(&self, limit: usize) -> Vec<(BlockId, &OrderBlock)> {
        let mut active: Vec<_> = self
            .blocks
            .iter()
            .filter(|(_, e)| !e.record.mitigated)
            .map(|(id, e)| (*id, &e.record))
            .collect();
        active.sort_by_key(|(id, b)| (b.anchor_timestamp, *id));
        let skip = active.len().saturating_sub(limit);
        active.split_off(skip)
    }

    /// Total records held, mitigated or not.
    pub fn tracked_len(&self) -> usize {
        self.gaps.len() + self.blocks.len()
    }

    /// Keys remembered to stop re-registration.
    pub fn seen_len(&self) -> usize {
        self.seen_gaps.len() + self.seen_blocks.len()
    }
}

#[cfg(test)]
impl ScannerState {
    /// Register a hand-built gap, bypassing detection.
    pub(crate) fn track_gap(&mut self, gap: FairValueGap) -> GapId {
        let id = GapId(self.next_gap);
        self.next_gap += 1;
        self.seen_gaps.insert((gap.anchor_timestamp, gap.direction));
        let formed_at = gap.anchor_timestamp;
        self.gaps.insert(
            id,
            Tracked {
                record: gap,
                formed_at,
            },
        );
        id
    }

    /// Register a hand-built block, bypassing detection.
    pub(crate) fn track_block(&mut self, block: OrderBlock) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.seen_blocks.insert((block.anchor_timestamp, block.direction));
        let formed_at = block.anchor_timestamp;
        self.blocks.insert(
            id,
            Tracked {
                record: block,
                formed_at,
            },
        );
        id
    }
}

/// Feed `mitigate` every bar stamped after `cutoff`; true if it flipped.
fn mitigate_after<F>(window: &[Bar], cutoff: DateTime<Utc>, mut mitigate: F) -> bool
where
    F: FnMut(&Bar) -> bool,
{
    let start = window.partition_point(|b| b.timestamp <= cutoff);
    window[start..].iter().any(|b| mitigate(b))
}
