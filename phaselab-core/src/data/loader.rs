//! CSV bar import.
//!
//! Expected header: `time,open,high,low,close[,volume]` (`timestamp` and
//! `datetime` are accepted for the first column). Timestamps carrying an
//! offset (RFC 3339) are taken as-is; naive timestamps are interpreted in the
//! policy's feed timezone.

use super::DataError;
use crate::domain::{Bar, OhlcSeries};
use crate::time::TimeWindowPolicy;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M",
];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "timestamp", alias = "datetime")]
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

fn parse_timestamp(raw: &str, policy: &TimeWindowPolicy) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| policy.normalize_feed_time(naive))
}

/// Parse bars from any CSV reader and validate them into a series.
pub fn read_csv<R: Read>(reader: R, policy: &TimeWindowPolicy) -> Result<OhlcSeries, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let r = record?;
        let timestamp =
            parse_timestamp(&r.time, policy).ok_or_else(|| DataError::InvalidTimestamp {
                row,
                value: r.time.clone(),
            })?;
        let mut bar = Bar::new(timestamp, r.open, r.high, r.low, r.close);
        bar.volume = r.volume;
        bars.push(bar);
    }
    debug!(bars = bars.len(), "csv parsed");
    Ok(OhlcSeries::new(bars)?)
}

pub fn load_csv(path: &Path, policy: &TimeWindowPolicy) -> Result<OhlcSeries, DataError> {
    let file = File::open(path)?;
    read_csv(file, policy)
}
