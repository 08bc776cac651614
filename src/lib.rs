//! Position lifecycle and valuation engine.
//!
//! Positions are opened from executed orders, valued on every read through an
//! injected `PriceSource` and `GreeksModel`, exited in full or in part, and rolled
//! up into exposure and grouped aggregates.

pub mod aggregation;
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod positions;
pub mod types;
pub mod valuation;
