//! Stateful wrapper around the transition rule.

use super::rules::{next_phase, ClassifierConfig, PhaseInputs};
use super::{MarketPhase, PhaseError, PhaseNote};
use crate::domain::Bar;
use crate::scanner::PriceRange;
use crate::time::TimeWindowPolicy;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One entry in the transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: MarketPhase,
    pub to: MarketPhase,
    /// Timestamp of the bar that caused the transition.
    pub at: DateTime<Utc>,
    pub note: PhaseNote,
}

#[derive(Debug, Clone)]
pub struct PhaseClassifier {
    config: ClassifierConfig,
    pip_size: f64,
    phase: MarketPhase,
    note: PhaseNote,
    started_at: Option<DateTime<Utc>>,
    recorded_range: Option<PriceRange>,
    history: Vec<PhaseTransition>,
}

impl PhaseClassifier {
    pub fn new(config: ClassifierConfig, pip_size: f64) -> Self {
        Self {
            config,
            pip_size,
            phase: MarketPhase::Unknown,
            note: PhaseNote::Unknown,
            started_at: None,
            recorded_range: None,
            history: Vec::new(),
        }
    }

    pub fn current_phase(&self) -> MarketPhase {
        self.phase
    }

    pub fn phase_note(&self) -> &PhaseNote {
        &self.note
    }

    /// Timestamp of the bar that started the current phase (`None` while
    /// still in the initial `Unknown`).
    pub fn phase_started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn phase_duration(&self, now: DateTime<Utc>) -> Duration {
        self.started_at
            .map_or_else(Duration::zero, |start| now - start)
    }

    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    /// Last consolidation range seen, kept after leaving Consolidation.
    pub fn recorded_range(&self) -> Option<PriceRange> {
        self.recorded_range
    }

    /// Classify the latest bar of `window`. Returns the transition if the
    /// phase changed.
    pub fn update(
        &mut self,
        window: &[Bar],
        policy: &TimeWindowPolicy,
    ) -> Option<PhaseTransition> {
        let inputs = self.inputs(window, policy)?;
        let at = inputs.bar.timestamp;
        let note = next_phase(self.phase, &inputs, &self.config)?;
        let target = note.phase();
        match self.transition_to(target, note, at) {
            Ok(transition) => transition,
            // next_phase only yields notes that match their own phase.
            Err(_) => None,
        }
    }

    /// Move to `target` with `note` stamped at `at`.
    ///
    /// Re-entering the current phase replaces the annotation and keeps the
    /// phase start time; no history entry is written. A note that belongs to
    /// another phase is rejected and leaves the classifier untouched.
    pub fn transition_to(
        &mut self,
        target: MarketPhase,
        note: PhaseNote,
        at: DateTime<Utc>,
    ) -> Result<Option<PhaseTransition>, PhaseError> {
        if note.phase() != target {
            return Err(PhaseError::AnnotationMismatch {
                target,
                note: note.phase(),
            });
        }

        if let PhaseNote::Consolidation { range } = &note {
            self.recorded_range = Some(*range);
        }

        if target == self.phase {
            debug!(phase = %target, "phase annotation updated");
            self.note = note;
            return Ok(None);
        }

        let transition = PhaseTransition {
            from: self.phase,
            to: target,
            at,
            note: note.clone(),
        };
        debug!(from = %self.phase, to = %target, at = %at, "phase transition");
        self.phase = target;
        self.note = note;
        self.started_at = Some(at);
        self.history.push(transition.clone());
        Ok(Some(transition))
    }

    /// Transition by phase name, as read from configuration or a replay log.
    pub fn transition_to_named(
        &mut self,
        name: &str,
        note: PhaseNote,
        at: DateTime<Utc>,
    ) -> Result<Option<PhaseTransition>, PhaseError> {
        let target: MarketPhase = name.parse()?;
        self.transition_to(target, note, at)
    }

    fn inputs(&self, window: &[Bar], policy: &TimeWindowPolicy) -> Option<PhaseInputs> {
        let bar = window.last()?.clone();
        let in_asian = policy.in_asian(bar.timestamp);
        let asian_range = if in_asian {
            let start = window
                .iter()
                .rposition(|b| !policy.in_asian(b.timestamp))
                .map_or(0, |i| i + 1);
            PriceRange::of(&window[start..])
        } else {
            None
        };

        let true_ranges: Vec<f64> = window
            .iter()
            .enumerate()
            .map(|(i, b)| b.true_range(i.checked_sub(1).map(|p| window[p].close)))
            .collect();
        let mean_tail = |n: usize| {
            (n > 0 && true_ranges.len() >= n)
                .then(|| true_ranges[true_ranges.len() - n..].iter().sum::<f64>() / n as f64)
        };

        let n = self.config.distribution_bars;
        let reference_close = (n > 0 && window.len() > n).then(|| window[window.len() - 1 - n].close);

        Some(PhaseInputs {
            in_early_london: policy.in_early_london(bar.timestamp),
            bar,
            in_asian,
            asian_range,
            recorded_range: self.recorded_range,
            recent_volatility: mean_tail(self.config.volatility_short),
            baseline_volatility: mean_tail(self.config.volatility_long),
            reference_close,
            pip_size: self.pip_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::phase::RangeSide;
    use chrono::TimeZone;

    fn ny(h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2025, 3, 5, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn classifier() -> PhaseClassifier {
        PhaseClassifier::new(ClassifierConfig::default(), 0.0001)
    }

    fn quiet_bar(ts: DateTime<Utc>, mid: f64) -> Bar {
        Bar::new(ts, mid, mid + 0.0005, mid - 0.0005, mid)
    }

    /// Asian bars from 00:00 to 01:55 NY around 1.1000.
    fn asian_session() -> Vec<Bar> {
        (0..24)
            .map(|i| quiet_bar(ny(0, 0) + Duration::minutes(5 * i), 1.1000))
            .collect()
    }

    #[test]
    fn starts_unknown() {
        let c = classifier();
        assert_eq!(c.current_phase(), MarketPhase::Unknown);
        assert_eq!(c.phase_duration(ny(3, 0)), Duration::zero());
    }

    #[test]
    fn asian_bars_consolidate_and_record_range() {
        let policy = TimeWindowPolicy::default();
        let mut c = classifier();
        let bars = asian_session();
        let first = c.update(&bars[..1], &policy).unwrap();
        assert_eq!(first.to, MarketPhase::Consolidation);
        assert_eq!(first.at, bars[0].timestamp);

        // Later Asian bars re-enter without resetting the clock.
        assert!(c.update(&bars, &policy).is_none());
        assert_eq!(c.phase_started_at(), Some(bars[0].timestamp));
        assert_eq!(c.history().len(), 1);
        let range = c.recorded_range().unwrap();
        assert!((range.high - 1.1005).abs() < 1e-12);
        assert!((range.low - 1.0995).abs() < 1e-12);
    }

    #[test]
    fn london_sweep_then_distribution() {
        let policy = TimeWindowPolicy::default();
        let mut c = classifier();
        let mut bars = asian_session();
        c.update(&bars, &policy);

        // 02:00 NY: early London, wick well above the Asian high.
        let sweep = Bar::new(ny(2, 0), 1.1000, 1.1020, 1.0998, 1.1001);
        bars.push(sweep);
        let t = c.update(&bars, &policy).unwrap();
        assert_eq!(t.to, MarketPhase::Manipulation);
        assert!(matches!(
            t.note,
            PhaseNote::Manipulation {
                swept: RangeSide::High,
                bias: Direction::Bearish,
                ..
            }
        ));

        // Steady sell-off after early London: close 30 pips below the close
        // ten bars back.
        for i in 1..=10 {
            let mid = 1.1000 - 0.0003 * i as f64;
            bars.push(quiet_bar(ny(4, 55) + Duration::minutes(5 * i), mid));
        }
        let phases: Vec<_> = c.history().iter().map(|t| t.to).collect();
        assert_eq!(phases, vec![MarketPhase::Consolidation, MarketPhase::Manipulation]);
        let t = c.update(&bars, &policy).unwrap();
        assert_eq!(t.to, MarketPhase::Distribution);
        assert_eq!(t.at, ny(5, 45));
        assert_eq!(c.phase_duration(ny(5, 55)), Duration::minutes(10));
    }

    #[test]
    fn second_london_sweep_merges_into_manipulation() {
        let policy = TimeWindowPolicy::default();
        let mut c = classifier();
        let mut bars = asian_session();
        c.update(&bars, &policy);

        bars.push(Bar::new(ny(2, 0), 1.1000, 1.1020, 1.0998, 1.1001));
        c.update(&bars, &policy).unwrap();
        let started = c.phase_started_at();

        // 02:05 NY: the low side goes too.
        bars.push(Bar::new(ny(2, 5), 1.1001, 1.1003, 1.0970, 1.0975));
        assert!(c.update(&bars, &policy).is_none());
        assert_eq!(c.current_phase(), MarketPhase::Manipulation);
        assert_eq!(c.phase_started_at(), started);
        assert_eq!(c.history().len(), 2);
        assert!(matches!(
            c.phase_note(),
            PhaseNote::Manipulation {
                swept: RangeSide::Low,
                bias: Direction::Bullish,
                ..
            }
        ));
    }

    #[test]
    fn london_sweep_interrupts_distribution() {
        let policy = TimeWindowPolicy::default();
        let mut c = classifier();
        let mut bars = asian_session();
        c.update(&bars, &policy);
        c.transition_to(
            MarketPhase::Distribution,
            PhaseNote::Distribution {
                displacement_pips: 25.0,
                direction: Direction::Bullish,
            },
            ny(1, 55),
        )
        .unwrap();

        bars.push(Bar::new(ny(2, 10), 1.1000, 1.1020, 1.0998, 1.1001));
        let t = c.update(&bars, &policy).unwrap();
        assert_eq!(t.from, MarketPhase::Distribution);
        assert_eq!(t.to, MarketPhase::Manipulation);
    }

    #[test]
    fn mismatched_annotation_is_rejected() {
        let mut c = classifier();
        let err = c
            .transition_to(MarketPhase::Manipulation, PhaseNote::Unknown, ny(3, 0))
            .unwrap_err();
        assert!(matches!(err, PhaseError::AnnotationMismatch { .. }));
        assert_eq!(c.current_phase(), MarketPhase::Unknown);
        assert!(c.history().is_empty());
    }

    #[test]
    fn unknown_phase_name_is_rejected() {
        let mut c = classifier();
        let err = c
            .transition_to_named("Accumulation", PhaseNote::Unknown, ny(3, 0))
            .unwrap_err();
        assert_eq!(err, PhaseError::UnknownPhase("Accumulation".into()));
        assert_eq!(c.current_phase(), MarketPhase::Unknown);
    }

    #[test]
    fn same_phase_merges_annotation() {
        let mut c = classifier();
        let note = |pips| PhaseNote::Distribution {
            displacement_pips: pips,
            direction: Direction::Bullish,
        };
        c.transition_to(MarketPhase::Distribution, note(25.0), ny(3, 0))
            .unwrap();
        let again = c
            .transition_to(MarketPhase::Distribution, note(40.0), ny(3, 30))
            .unwrap();
        assert!(again.is_none());
        assert_eq!(c.phase_note(), &note(40.0));
        assert_eq!(c.phase_started_at(), Some(ny(3, 0)));
    }
}
