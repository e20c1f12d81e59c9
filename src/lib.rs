//! Match statistics and performance analytics for esports organizations.
//!
//! Matches and per-player stat lines are committed through [`store::MatchStore`],
//! which derives KDA, per-minute rates and a performance score on the way in
//! and keeps every player's champion pool current. Read-side reports live in
//! [`analysis`].

pub mod analysis;
pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod import;
pub mod models;
pub mod store;
