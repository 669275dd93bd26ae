//! Canonical position state machine.
//!
//! Both the marker walk and the equity walk drive `step`; they differ only in
//! what they do with the emitted `Transition` and in whether the long-to-short
//! reversal is enabled.

pub mod ratchet;
pub mod state;

pub use ratchet::{ratchet, would_loosen};
pub use state::{step, ExitReason, PositionState, Side, Step, Transition};
