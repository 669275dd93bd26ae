//! Retailflow Core: merged records, retail positioning signals, trailing-stop
//! state machine and equity simulation.
//!
//! This crate contains the computational heart of the backtest:
//! - Domain types (price bars, open-interest rows, merged daily records)
//! - Time-series merge with derived retail long/short/net ratios
//! - Entry/exit classifier over a record and its predecessor
//! - Canonical Flat/Long/Short state machine with a ratcheting trailing stop
//! - Marker walk (chart annotations) and equity walk (PnL, drawdown, Sharpe)
//!
//! Everything here is a pure function of its inputs: no I/O, no global state.

pub mod domain;
pub mod engine;
pub mod equity;
pub mod markers;
pub mod merge;
pub mod signal;

pub use domain::{MergedRecord, Ohlc, OpenInterestRow, PriceBar, RetailRatios};
pub use engine::{PositionState, Side, Transition};
pub use equity::{
    simulate_equity, EquityCurve, EquityParams, EquitySample, ExecutionRules, ExitPnlAttribution,
};
pub use markers::{
    simulate_markers, MarkerKind, MarkerParams, MarkerSeries, PositionSnapshot, StopPoint,
    TradeMarker,
};
pub use merge::{merge, MergeError, MergeReport, Merged};
pub use signal::{classify, SignalParams, Signals};
