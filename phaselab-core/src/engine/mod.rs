//! Per-bar pipeline.
//!
//! A [`Session`] runs, for every new bar:
//!
//! 1. Daily reset of risk counters when the trading-timezone date rolls
//! 2. Mark open positions (stop/target resolution, floating P/L)
//! 3. Phase classification
//! 4. Pattern scan and arena update
//! 5. Signal hunt, risk gate, order
//! 6. Equity point

pub mod events;
pub mod session;

pub use events::{EventLog, SessionEvent};
pub use session::{BarOutcome, Session};

use crate::data::Timeframe;
use crate::execution::RiskConfig;
use crate::hunter::HunterConfig;
use crate::phase::ClassifierConfig;
use crate::scanner::ScannerConfig;
use serde::{Deserialize, Serialize};

/// Strategy tunables a session is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal spacing of the bars fed to the session.
    pub timeframe: Timeframe,
    pub classifier: ClassifierConfig,
    pub scanner: ScannerConfig,
    pub hunter: HunterConfig,
    pub risk: RiskConfig,
}
