//! Seeded synthetic bars for offline runs and tests.

use super::{DataError, Timeframe};
use crate::domain::{Bar, OhlcSeries};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub bars: usize,
    pub start: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub start_price: f64,
    /// Typical absolute body size, in price units.
    pub body_scale: f64,
    /// Chance that a bar is an impulse candle several times the usual size.
    pub impulse_probability: f64,
    pub impulse_multiplier: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bars: 2_000,
            start: Utc
                .with_ymd_and_hms(2025, 3, 3, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            timeframe: Timeframe::M5,
            start_price: 1.0850,
            body_scale: 0.0004,
            impulse_probability: 0.03,
            impulse_multiplier: 5.0,
        }
    }
}

impl SyntheticConfig {
    /// Reject parameters the generator cannot draw from.
    pub fn validate(&self) -> Result<(), DataError> {
        if !(0.0..=1.0).contains(&self.impulse_probability) {
            return Err(DataError::InvalidConfig(format!(
                "impulse_probability must be within [0, 1], got {}",
                self.impulse_probability
            )));
        }
        if !self.body_scale.is_finite() || self.body_scale <= 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "body_scale must be positive, got {}",
                self.body_scale
            )));
        }
        if !self.start_price.is_finite() || self.start_price <= 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "start_price must be positive, got {}",
                self.start_price
            )));
        }
        if !self.impulse_multiplier.is_finite() {
            return Err(DataError::InvalidConfig(format!(
                "impulse_multiplier must be finite, got {}",
                self.impulse_multiplier
            )));
        }
        Ok(())
    }
}

/// Random-walk OHLC series. Identical configs give identical series.
///
/// Each bar opens at the previous close; occasional impulse candles give
/// the scanner displacement and gaps to find.
pub fn random_walk(config: &SyntheticConfig) -> Result<OhlcSeries, DataError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let step = config.timeframe.duration();
    let mut bars = Vec::with_capacity(config.bars);
    let mut close = config.start_price;

    for i in 0..config.bars {
        let open = close;
        let mut body = rng.gen_range(-1.0..1.0) * config.body_scale;
        if rng.gen_bool(config.impulse_probability) {
            body *= config.impulse_multiplier;
        }
        close = (open + body).max(config.body_scale);
        let upper = rng.gen_range(0.0..1.0) * config.body_scale * 0.5;
        let lower = rng.gen_range(0.0..1.0) * config.body_scale * 0.5;
        let high = open.max(close) + upper;
        let low = (open.min(close) - lower).max(f64::EPSILON);
        bars.push(Bar::new(config.start + step * i as i32, open, high, low, close));
    }

    Ok(OhlcSeries::new(bars)?)
}
