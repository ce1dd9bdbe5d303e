//! HistoricalFeed: a replay cursor over a pre-loaded series.

use super::{DataError, MarketDataSource, Timeframe};
use crate::domain::{Bar, OhlcSeries};

/// Steps through a loaded series one bar at a time.
///
/// The cursor starts on the first bar. `get_window` returns bars ending at
/// the cursor (inclusive); the feed is finished once the cursor passes the
/// last bar.
#[derive(Debug, Clone)]
pub struct HistoricalFeed {
    symbol: String,
    timeframe: Timeframe,
    series: OhlcSeries,
    cursor: usize,
}

impl HistoricalFeed {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, series: OhlcSeries) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            series,
            cursor: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn series(&self) -> &OhlcSeries {
        &self.series
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bar under the cursor.
    pub fn current(&self) -> Option<&Bar> {
        self.series.get(self.cursor)
    }

    /// Move to the next bar. Returns false once the feed is finished.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.series.len() {
            self.cursor += 1;
        }
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.series.len()
    }

    /// Borrowing variant of `get_window` for the replay loop.
    pub fn window(&self, count: usize) -> &[Bar] {
        self.series.window_ending_at(self.cursor, count)
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl MarketDataSource for HistoricalFeed {
    fn get_window(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<OhlcSeries, DataError> {
        if symbol != self.symbol {
            return Err(DataError::Unavailable(format!(
                "feed carries {}, not {symbol}",
                self.symbol
            )));
        }
        if timeframe != self.timeframe {
            return Err(DataError::Unavailable(format!(
                "feed is {}, requested {timeframe}",
                self.timeframe
            )));
        }
        if self.is_finished() {
            return Err(DataError::Exhausted {
                len: self.series.len(),
            });
        }
        Ok(OhlcSeries::new(self.window(count).to_vec())?)
    }
}
