//! Macro-news events and the feed interface used by the trade gate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar impact rating. Calendar colours map as red → High,
/// orange → Medium, yellow/white → Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "red" => Ok(Self::High),
            "medium" | "orange" => Ok(Self::Medium),
            "low" | "yellow" | "white" => Ok(Self::Low),
            other => Err(format!("unknown impact level '{other}'")),
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    pub time: DateTime<Utc>,
    pub currency: String,
    pub impact: Impact,
    pub name: String,
}

impl NewsEvent {
    /// Event in `(now, now + lookahead]`.
    pub fn is_due_within(&self, now: DateTime<Utc>, lookahead: Duration) -> bool {
        self.time > now && self.time <= now + lookahead
    }

    /// Empty `currencies` means every currency is relevant.
    pub fn concerns(&self, currencies: &[String]) -> bool {
        currencies.is_empty()
            || currencies
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&self.currency))
    }
}

/// Source of scheduled macro events.
pub trait NewsFeed: Send + Sync {
    /// The earliest high-impact event for `currencies` due within the
    /// lookahead, if any.
    fn next_high_impact_event(
        &self,
        currencies: &[String],
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Option<NewsEvent>;
}

/// Feed with no events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNews;

impl NewsFeed for NoNews {
    fn next_high_impact_event(
        &self,
        _currencies: &[String],
        _now: DateTime<Utc>,
        _lookahead: Duration,
    ) -> Option<NewsEvent> {
        None
    }
}

/// A pre-loaded calendar, kept sorted by event time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCalendar {
    events: Vec<NewsEvent>,
}

impl StaticCalendar {
    pub fn new(mut events: Vec<NewsEvent>) -> Self {
        events.sort_by_key(|e| e.time);
        Self { events }
    }

    pub fn events(&self) -> &[NewsEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl NewsFeed for StaticCalendar {
    fn next_high_impact_event(
        &self,
        currencies: &[String],
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Option<NewsEvent> {
        let start = self.events.partition_point(|e| e.time <= now);
        self.events[start..]
            .iter()
            .take_while(|e| e.time <= now + lookahead)
            .find(|e| e.impact == Impact::High && e.concerns(currencies))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, h, m, 0).unwrap()
    }

    fn event(h: u32, m: u32, currency: &str, impact: Impact) -> NewsEvent {
        NewsEvent {
            time: at(h, m),
            currency: currency.into(),
            impact,
            name: format!("{currency} event"),
        }
    }

    fn calendar() -> StaticCalendar {
        StaticCalendar::new(vec![
            event(13, 30, "USD", Impact::High),
            event(12, 45, "EUR", Impact::Medium),
            event(9, 0, "JPY", Impact::High),
            event(14, 0, "GBP", Impact::High),
        ])
    }

    fn usd_eur() -> Vec<String> {
        vec!["EUR".into(), "USD".into()]
    }

    #[test]
    fn impact_from_calendar_colours() {
        assert_eq!("Red".parse::<Impact>().unwrap(), Impact::High);
        assert_eq!("orange".parse::<Impact>().unwrap(), Impact::Medium);
        assert!("purple".parse::<Impact>().is_err());
    }

    #[test]
    fn finds_relevant_high_impact_event_in_lookahead() {
        let cal = calendar();
        let hit = cal.next_high_impact_event(&usd_eur(), at(13, 15), Duration::minutes(20));
        assert_eq!(hit.map(|e| e.currency), Some("USD".to_string()));
    }

    #[test]
    fn lookahead_boundary_is_inclusive_and_now_exclusive() {
        let cal = calendar();
        let lookahead = Duration::minutes(15);
        assert!(cal
            .next_high_impact_event(&usd_eur(), at(13, 15), lookahead)
            .is_some());
        assert!(cal
            .next_high_impact_event(&usd_eur(), at(13, 14), lookahead)
            .is_none());
        assert!(cal
            .next_high_impact_event(&usd_eur(), at(13, 30), lookahead)
            .is_none());
    }

    #[test]
    fn ignores_other_currencies_and_lower_impact() {
        let cal = calendar();
        // EUR medium at 12:45 and GBP high at 14:00 are both irrelevant.
        assert!(cal
            .next_high_impact_event(&usd_eur(), at(12, 30), Duration::minutes(30))
            .is_none());
        assert!(cal
            .next_high_impact_event(&usd_eur(), at(13, 45), Duration::minutes(30))
            .is_none());
    }

    #[test]
    fn empty_currency_list_matches_all() {
        let cal = calendar();
        let hit = cal.next_high_impact_event(&[], at(8, 50), Duration::minutes(20));
        assert_eq!(hit.map(|e| e.currency), Some("JPY".to_string()));
    }
}
