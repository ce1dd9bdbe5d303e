//! PhaseLab Core: phase classification, pattern scanning and simulated execution.
//!
//! This crate contains the per-instrument trading pipeline:
//! - Domain types (bars, series, signals, positions, closed trades, instruments)
//! - Pattern scanner (fair value gaps, order blocks, swings, structure) with a
//!   stable-id arena for mitigation tracking across bars
//! - Phase state machine driven by session time and price action
//! - Session/killzone time policy and the macro-news collaborator
//! - Signal hunter combining scanner output, phase and time policy
//! - Position ledger, order venues and the risk warden
//! - Market data replay, CSV loading and synthetic series
//! - The per-bar `Session` pipeline and its typed event log

pub mod data;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod hunter;
pub mod phase;
pub mod scanner;
pub mod time;
