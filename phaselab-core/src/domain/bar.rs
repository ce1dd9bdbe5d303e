//! Bar and OhlcSeries, the fundamental market data units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar for a single instrument on a single timeframe step.
///
/// Timestamps are UTC. Conversion into the trading timezone happens in the
/// time policy, never on the bar itself. Bars are immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Absolute candle body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Distance from the top of the body to the high.
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Distance from the bottom of the body to the low.
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// True range against the previous close (plain range for the first bar).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.range(),
        }
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Errors raised while building a series.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} is not strictly after its predecessor")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} has inconsistent OHLC values")]
    InsaneBar {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Ordered sequence of bars with strictly increasing timestamps.
///
/// Indexed both by position and by timestamp; `window_ending_at` gives the
/// view a live feed would have produced at that position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcSeries {
    bars: Vec<Bar>,
}

impl OhlcSeries {
    /// Validate ordering and bar sanity, then wrap.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(SeriesError::InsaneBar {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(SeriesError::NonIncreasingTimestamp {
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Position of the bar stamped exactly `timestamp`.
    pub fn position_of(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.bars
            .binary_search_by_key(&timestamp, |b| b.timestamp)
            .ok()
    }

    /// Up to `count` bars ending at (and including) position `index`.
    ///
    /// Returns an empty slice when `index` is out of range.
    pub fn window_ending_at(&self, index: usize, count: usize) -> &[Bar] {
        if index >= self.bars.len() || count == 0 {
            return &[];
        }
        let start = (index + 1).saturating_sub(count);
        &self.bars[start..=index]
    }

    /// Bars whose timestamps fall in `[from, to)`.
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[Bar] {
        let start = self.bars.partition_point(|b| b.timestamp < from);
        let end = self.bars.partition_point(|b| b.timestamp < to);
        if start >= end {
            return &[];
        }
        &self.bars[start..end]
    }
}
