//! Time-of-day gating: sessions, killzones and the macro-news collaborator.
//!
//! All predicates take UTC timestamps and evaluate them in the configured
//! trading timezone, so a bar's session membership never depends on where
//! the feed was recorded.

pub mod news;
pub mod policy;

pub use news::{Impact, NewsEvent, NewsFeed, NoNews, StaticCalendar};
pub use policy::{
    Killzone, SessionConfig, SessionLabel, TimeWindow, TimeWindowPolicy, TradeGate, LONDON_OPEN,
    NEW_YORK_AM, SILVER_BULLET,
};
