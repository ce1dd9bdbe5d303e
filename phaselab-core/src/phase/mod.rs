//! Market phase state machine.
//!
//! [`MarketPhase`] is a plain sum type and every phase carries a typed
//! annotation ([`PhaseNote`]) describing why it was entered. The transition
//! rule itself is the pure [`next_phase`] function; [`PhaseClassifier`] owns
//! the current phase, its start time and the transition history.

pub mod classifier;
pub mod rules;

pub use classifier::{PhaseClassifier, PhaseTransition};
pub use rules::{next_phase, ClassifierConfig, PhaseInputs};

use crate::domain::Direction;
use crate::scanner::PriceRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MarketPhase {
    #[default]
    Unknown,
    Consolidation,
    Manipulation,
    Retracement,
    Distribution,
}

impl MarketPhase {
    pub const ALL: [MarketPhase; 5] = [
        Self::Unknown,
        Self::Consolidation,
        Self::Manipulation,
        Self::Retracement,
        Self::Distribution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Consolidation => "Consolidation",
            Self::Manipulation => "Manipulation",
            Self::Retracement => "Retracement",
            Self::Distribution => "Distribution",
        }
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarketPhase {
    type Err = PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PhaseError::UnknownPhase(s.to_string()))
    }
}

/// Which edge of the consolidation range was swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSide {
    High,
    Low,
}

/// Typed annotation attached to the current phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseNote {
    Unknown,
    Consolidation {
        range: PriceRange,
    },
    Manipulation {
        swept: RangeSide,
        level: f64,
        /// Distance beyond the range edge, in price units.
        break_size: f64,
        /// Expected follow-through: a swept high sets up a bearish move.
        bias: Direction,
    },
    Retracement {
        recent_volatility: f64,
        baseline_volatility: f64,
    },
    Distribution {
        displacement_pips: f64,
        direction: Direction,
    },
}

impl PhaseNote {
    /// The phase this annotation belongs to.
    pub fn phase(&self) -> MarketPhase {
        match self {
            Self::Unknown => MarketPhase::Unknown,
            Self::Consolidation { .. } => MarketPhase::Consolidation,
            Self::Manipulation { .. } => MarketPhase::Manipulation,
            Self::Retracement { .. } => MarketPhase::Retracement,
            Self::Distribution { .. } => MarketPhase::Distribution,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PhaseError {
    #[error("unknown market phase '{0}'")]
    UnknownPhase(String),

    #[error("annotation for {note} cannot describe a transition to {target}")]
    AnnotationMismatch {
        target: MarketPhase,
        note: MarketPhase,
    },
}
