//! End-to-end session tests over seeded synthetic history.

use chrono::{Duration, NaiveTime, TimeZone, Utc};
use phaselab_core::data::{random_walk, HistoricalFeed, SyntheticConfig, Timeframe};
use phaselab_core::domain::InstrumentSpec;
use phaselab_core::engine::{EngineConfig, Session, SessionEvent};
use phaselab_core::phase::MarketPhase;
use phaselab_core::time::{
    Impact, Killzone, NewsEvent, NoNews, SessionConfig, StaticCalendar, TimeWindow,
    TimeWindowPolicy,
};

const WINDOW: usize = 120;

struct Replay {
    session: Session,
    phases_at_signal: Vec<MarketPhase>,
    max_drift: f64,
}

fn replay(seed: u64) -> Replay {
    let series = random_walk(&SyntheticConfig {
        seed,
        bars: 1_500,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let mut feed = HistoricalFeed::new("EURUSD", Timeframe::M5, series);
    let mut session = Session::backtest(
        InstrumentSpec::default(),
        TimeWindowPolicy::default(),
        EngineConfig::default(),
        10_000.0,
    );
    let mut phases_at_signal = Vec::new();
    let mut max_drift: f64 = 0.0;

    while !feed.is_finished() {
        let window = feed.window(WINDOW);
        let outcome = session.on_bar(window);
        if outcome.signal.is_some() {
            phases_at_signal.push(session.phase());
        }
        // A position opened on this bar has not been marked yet.
        if let (Some(bar), None) = (feed.current(), outcome.opened) {
            max_drift = max_drift.max(session.venue().ledger().verify_equity(bar.close));
        }
        feed.advance();
    }
    Replay {
        session,
        phases_at_signal,
        max_drift,
    }
}

#[test]
fn replay_is_deterministic() {
    let a = replay(11);
    let b = replay(11);
    assert_eq!(
        a.session.venue().ledger().equity_curve(),
        b.session.venue().ledger().equity_curve()
    );
    assert_eq!(a.session.events().events(), b.session.events().events());
    assert_eq!(
        a.session.classifier().history(),
        b.session.classifier().history()
    );
}

#[test]
fn replay_keeps_ledger_invariants() {
    let r = replay(5);
    let ledger = r.session.venue().ledger();
    assert_eq!(ledger.equity_curve().len(), 1_500);
    assert_eq!(r.session.bars_processed(), 1_500);
    assert!(r.max_drift < 1e-6);

    let mut tickets: Vec<_> = ledger.history().iter().map(|t| t.ticket).collect();
    tickets.sort();
    tickets.dedup();
    assert_eq!(tickets.len(), ledger.history().len());

    let realized: f64 = ledger.history().iter().map(|t| t.pnl).sum();
    assert!((ledger.balance() - (10_000.0 + realized)).abs() < 1e-6);
}

#[test]
fn signals_only_in_manipulation_and_well_formed() {
    for seed in [1, 2, 3, 4] {
        let r = replay(seed);
        assert!(r
            .phases_at_signal
            .iter()
            .all(|p| *p == MarketPhase::Manipulation));
        for event in r.session.events().events() {
            if let SessionEvent::SignalEmitted { signal, .. } = event {
                assert!(signal.levels_are_consistent());
                assert!(signal.volume > 0.0);
            }
        }
    }
}

#[test]
fn every_open_follows_an_emitted_signal() {
    let r = replay(9);
    let events = r.session.events().events();
    for (i, event) in events.iter().enumerate() {
        if let SessionEvent::PositionOpened { signal, .. } = event {
            let preceding = events[..i].iter().rev().find_map(|e| match e {
                SessionEvent::SignalEmitted { signal, .. } => Some(signal),
                _ => None,
            });
            assert_eq!(preceding, Some(signal));
        }
    }
}

// ── Trade gate ───────────────────────────────────────────────────────

#[test]
fn avoid_session_overrides_overlapping_killzone() {
    // A killzone placed inside the Asian window never opens the gate.
    let config = SessionConfig {
        killzones: vec![Killzone::new("Late Asia", TimeWindow::hours(20, 23))],
        ..SessionConfig::default()
    };
    let policy = TimeWindowPolicy::new(config);
    let ny = chrono_tz::America::New_York;
    let start = ny.with_ymd_and_hms(2025, 3, 5, 19, 0, 0).unwrap().with_timezone(&Utc);
    for step in 0..(7 * 12) {
        let ts = start + Duration::minutes(5 * step);
        assert!(!policy.should_trade(ts, &NoNews, &[]), "open at {ts}");
    }
}

#[test]
fn killzone_opens_without_news_and_closes_before_release() {
    let policy = TimeWindowPolicy::default();
    let ny = chrono_tz::America::New_York;
    let at = ny.with_ymd_and_hms(2025, 3, 5, 8, 15, 0).unwrap().with_timezone(&Utc);
    let currencies = vec!["EUR".to_string(), "USD".to_string()];
    assert!(policy.should_trade(at, &NoNews, &currencies));

    let calendar = StaticCalendar::new(vec![NewsEvent {
        time: at + Duration::minutes(15),
        currency: "USD".into(),
        impact: Impact::High,
        name: "Retail Sales".into(),
    }]);
    assert!(!policy.should_trade(at, &calendar, &currencies));
    assert!(policy.should_trade(at, &calendar, &["JPY".to_string()]));
    assert_eq!(
        policy.local_time(at),
        NaiveTime::from_hms_opt(8, 15, 0).unwrap()
    );
}
