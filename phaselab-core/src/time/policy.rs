//! Session windows, killzones and the composed trade gate.

use super::news::{NewsEvent, NewsFeed};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open time-of-day interval `[start, end)`.
///
/// When `end <= start` the window wraps midnight and contains every time at
/// or after `start` plus every time before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whole-hour window, e.g. `TimeWindow::hours(19, 2)`.
    pub fn hours(start: u32, end: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start % 24, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(end % 24, 0, 0).unwrap_or_default(),
        }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.wraps_midnight() {
            t >= self.start || t < self.end
        } else {
            t >= self.start && t < self.end
        }
    }
}

/// A named trading window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Killzone {
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Killzone {
    pub fn new(name: &str, window: TimeWindow) -> Self {
        Self {
            name: name.to_string(),
            start: window.start,
            end: window.end,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

pub const LONDON_OPEN: &str = "London Open";
pub const NEW_YORK_AM: &str = "New York AM";
pub const SILVER_BULLET: &str = "Silver Bullet";

/// Session layout, all times in `trading_tz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Zone in which feed timestamps without an offset were recorded.
    pub feed_tz: Tz,
    /// Zone in which every session window is evaluated.
    pub trading_tz: Tz,
    pub asian: TimeWindow,
    pub early_london: TimeWindow,
    /// Checked in order; the first match names the session.
    pub killzones: Vec<Killzone>,
    pub avoid: TimeWindow,
    pub news_lookahead_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let asian = TimeWindow::hours(19, 2);
        Self {
            feed_tz: Tz::UTC,
            trading_tz: chrono_tz::America::New_York,
            asian,
            early_london: TimeWindow::hours(2, 5),
            killzones: vec![
                Killzone::new(SILVER_BULLET, TimeWindow::hours(10, 11)),
                Killzone::new(LONDON_OPEN, TimeWindow::hours(2, 5)),
                Killzone::new(NEW_YORK_AM, TimeWindow::hours(7, 10)),
            ],
            avoid: asian,
            news_lookahead_minutes: 30,
        }
    }
}

/// Human-readable name of the session a timestamp falls in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionLabel {
    Killzone(String),
    AsianRange,
    DeadZone,
}

impl fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Killzone(name) => write!(f, "{}", name.to_uppercase()),
            Self::AsianRange => write!(f, "ASIAN RANGE"),
            Self::DeadZone => write!(f, "DEAD ZONE"),
        }
    }
}

/// Outcome of the composed trade gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum TradeGate {
    Open { killzone: String },
    OutsideKillzone,
    AvoidSession,
    NewsPending(NewsEvent),
}

impl TradeGate {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Pure predicates over a timezone-normalized reference time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindowPolicy {
    config: SessionConfig,
}

impl TimeWindowPolicy {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn trading_tz(&self) -> Tz {
        self.config.trading_tz
    }

    pub fn news_lookahead(&self) -> Duration {
        Duration::minutes(self.config.news_lookahead_minutes)
    }

    /// Interpret a feed-local naive timestamp. Ambiguous local times (DST
    /// fall-back) resolve to the earlier instant; skipped ones return `None`.
    pub fn normalize_feed_time(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.config
            .feed_tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn local_time(&self, ts: DateTime<Utc>) -> NaiveTime {
        ts.with_timezone(&self.config.trading_tz).time()
    }

    /// Trading-day calendar date, used for daily risk resets.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.config.trading_tz).date_naive()
    }

    pub fn in_asian(&self, ts: DateTime<Utc>) -> bool {
        self.config.asian.contains(self.local_time(ts))
    }

    pub fn in_early_london(&self, ts: DateTime<Utc>) -> bool {
        self.config.early_london.contains(self.local_time(ts))
    }

    pub fn in_avoid_session(&self, ts: DateTime<Utc>) -> bool {
        self.config.avoid.contains(self.local_time(ts))
    }

    /// First configured killzone containing `ts`.
    pub fn active_killzone(&self, ts: DateTime<Utc>) -> Option<&Killzone> {
        let t = self.local_time(ts);
        self.config.killzones.iter().find(|k| k.window().contains(t))
    }

    /// Membership in the named killzone, regardless of ordering.
    pub fn in_killzone(&self, ts: DateTime<Utc>, name: &str) -> bool {
        let t = self.local_time(ts);
        self.config
            .killzones
            .iter()
            .any(|k| k.name == name && k.window().contains(t))
    }

    pub fn session_label(&self, ts: DateTime<Utc>) -> SessionLabel {
        if let Some(kz) = self.active_killzone(ts) {
            SessionLabel::Killzone(kz.name.clone())
        } else if self.in_asian(ts) {
            SessionLabel::AsianRange
        } else {
            SessionLabel::DeadZone
        }
    }

    /// Killzone AND not avoid-session AND no relevant high-impact news due.
    pub fn trade_gate(
        &self,
        now: DateTime<Utc>,
        news: &dyn NewsFeed,
        currencies: &[String],
    ) -> TradeGate {
        if self.in_avoid_session(now) {
            return TradeGate::AvoidSession;
        }
        let Some(kz) = self.active_killzone(now) else {
            return TradeGate::OutsideKillzone;
        };
        if let Some(event) = news.next_high_impact_event(currencies, now, self.news_lookahead()) {
            return TradeGate::NewsPending(event);
        }
        TradeGate::Open {
            killzone: kz.name.clone(),
        }
    }

    pub fn should_trade(
        &self,
        now: DateTime<Utc>,
        news: &dyn NewsFeed,
        currencies: &[String],
    ) -> bool {
        self.trade_gate(now, news, currencies).is_open()
    }
}

impl Default for TimeWindowPolicy {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::news::{Impact, NoNews, StaticCalendar};

    /// 2025-03-05 is before the US DST switch: New York is UTC-5.
    fn ny(h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2025, 3, 5, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn plain_window_is_half_open() {
        let w = TimeWindow::hours(2, 5);
        assert!(w.contains(t(2, 0)));
        assert!(w.contains(t(4, 59)));
        assert!(!w.contains(t(5, 0)));
        assert!(!w.contains(t(1, 59)));
    }

    #[test]
    fn overnight_window_wraps() {
        let w = TimeWindow::hours(19, 2);
        assert!(w.wraps_midnight());
        assert!(w.contains(t(19, 0)));
        assert!(w.contains(t(23, 30)));
        assert!(w.contains(t(0, 0)));
        assert!(w.contains(t(1, 59)));
        assert!(!w.contains(t(2, 0)));
        assert!(!w.contains(t(12, 0)));
    }

    #[test]
    fn evaluates_in_trading_timezone() {
        let policy = TimeWindowPolicy::default();
        // 08:00 UTC is 03:00 in New York.
        let ts = Utc.with_ymd_and_hms(2025, 3, 5, 8, 0, 0).unwrap();
        assert_eq!(policy.local_time(ts), t(3, 0));
        assert!(policy.in_early_london(ts));
        assert!(policy.in_killzone(ts, LONDON_OPEN));
    }

    #[test]
    fn session_labels() {
        let policy = TimeWindowPolicy::default();
        assert_eq!(policy.session_label(ny(10, 30)).to_string(), "SILVER BULLET");
        assert_eq!(policy.session_label(ny(3, 0)).to_string(), "LONDON OPEN");
        assert_eq!(policy.session_label(ny(8, 0)).to_string(), "NEW YORK AM");
        assert_eq!(policy.session_label(ny(21, 0)), SessionLabel::AsianRange);
        assert_eq!(policy.session_label(ny(14, 0)), SessionLabel::DeadZone);
    }

    #[test]
    fn avoid_session_blocks_even_inside_a_killzone() {
        let mut cfg = SessionConfig::default();
        cfg.killzones.push(Killzone::new("Tokyo", TimeWindow::hours(20, 23)));
        let policy = TimeWindowPolicy::new(cfg);
        assert!(policy.in_killzone(ny(21, 0), "Tokyo"));
        assert_eq!(policy.trade_gate(ny(21, 0), &NoNews, &[]), TradeGate::AvoidSession);
        assert!(!policy.should_trade(ny(21, 0), &NoNews, &[]));
    }

    #[test]
    fn open_inside_killzone_without_news() {
        let policy = TimeWindowPolicy::default();
        assert!(policy.should_trade(ny(3, 0), &NoNews, &[]));
        assert!(policy.should_trade(ny(7, 0), &NoNews, &[]));
        assert_eq!(
            policy.trade_gate(ny(14, 0), &NoNews, &[]),
            TradeGate::OutsideKillzone
        );
    }

    #[test]
    fn pending_news_closes_the_gate() {
        let policy = TimeWindowPolicy::default();
        let cal = StaticCalendar::new(vec![NewsEvent {
            time: ny(8, 30),
            currency: "USD".into(),
            impact: Impact::High,
            name: "CPI".into(),
        }]);
        let usd = vec!["USD".to_string()];
        assert!(matches!(
            policy.trade_gate(ny(8, 10), &cal, &usd),
            TradeGate::NewsPending(_)
        ));
        assert!(policy.should_trade(ny(7, 30), &cal, &usd));
        assert!(policy.should_trade(ny(8, 30), &cal, &usd));
    }

    #[test]
    fn feed_times_are_normalized() {
        let cfg = SessionConfig {
            feed_tz: chrono_tz::Europe::Helsinki,
            ..SessionConfig::default()
        };
        let policy = TimeWindowPolicy::new(cfg);
        let naive = NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let utc = policy.normalize_feed_time(naive).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2025, 3, 5, 8, 0, 0).unwrap());
    }
}
