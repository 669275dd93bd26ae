//! Position state machine shared by both simulators.
//!
//! `step` is a pure function of (state, current bar, previous bar, signals).
//! The trailing extremum and stop live in the state payload rather than in
//! loop locals, so the marker walk and the equity walk cannot drift apart.

use serde::{Deserialize, Serialize};

use super::ratchet::ratchet;
use crate::domain::{MergedRecord, Ohlc};
use crate::signal::Signals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

/// Current position. At most one side is ever open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Flat,
    /// `extremum` is the highest high since entry.
    Long { extremum: f64, stop: f64 },
    /// `extremum` is the lowest low since entry.
    Short { extremum: f64, stop: f64 },
}

impl PositionState {
    /// Open a position off the signal bar: the stop starts at the bar's
    /// opposite extreme.
    pub fn open(side: Side, bar: &Ohlc) -> Self {
        match side {
            Side::Long => PositionState::Long {
                extremum: bar.high,
                stop: bar.low,
            },
            Side::Short => PositionState::Short {
                extremum: bar.low,
                stop: bar.high,
            },
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            PositionState::Flat => None,
            PositionState::Long { .. } => Some(Side::Long),
            PositionState::Short { .. } => Some(Side::Short),
        }
    }

    pub fn stop(&self) -> Option<f64> {
        match *self {
            PositionState::Flat => None,
            PositionState::Long { stop, .. } | PositionState::Short { stop, .. } => Some(stop),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Strategic exit from the signal classifier.
    Signal,
    /// Close crossed the trailing stop.
    Stop,
}

/// What happened on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Flat and no entry signal.
    Idle,
    Enter { side: Side, stop: f64 },
    /// Position held through the bar; `stop` is the (possibly ratcheted) level.
    Hold { side: Side, stop: f64 },
    Exit { side: Side, reason: ExitReason },
    /// Long closed by signal and a short opened on the same bar.
    Reverse { stop: f64 },
}

impl Transition {
    /// True when a position was closed on this bar (reversal included).
    pub fn closes_position(&self) -> bool {
        matches!(self, Transition::Exit { .. } | Transition::Reverse { .. })
    }
}

/// Result of one `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub state: PositionState,
    pub transition: Transition,
}

/// Advance the position by one bar.
///
/// `allow_reversal` enables the long-to-short flip: when a long exits by
/// signal and the short entry fires on the same bar, the short opens
/// immediately from the current bar. There is no short-to-long counterpart.
pub fn step(
    state: PositionState,
    curr: &MergedRecord,
    prev: &MergedRecord,
    signals: Signals,
    allow_reversal: bool,
) -> Step {
    let bar = &curr.bar;
    match state {
        PositionState::Flat => {
            if signals.entry_long {
                enter(Side::Long, bar)
            } else if signals.entry_short {
                enter(Side::Short, bar)
            } else {
                Step {
                    state,
                    transition: Transition::Idle,
                }
            }
        }
        PositionState::Long { extremum, stop } => {
            let reason = if signals.exit_long {
                Some(ExitReason::Signal)
            } else if bar.close < stop {
                Some(ExitReason::Stop)
            } else {
                None
            };

            match reason {
                Some(ExitReason::Signal) if allow_reversal && signals.entry_short => {
                    let state = PositionState::open(Side::Short, bar);
                    Step {
                        state,
                        transition: Transition::Reverse { stop: bar.high },
                    }
                }
                Some(reason) => Step {
                    state: PositionState::Flat,
                    transition: Transition::Exit {
                        side: Side::Long,
                        reason,
                    },
                },
                None => {
                    let mut stop = stop;
                    if bar.close > extremum {
                        stop = ratchet(Side::Long, stop, bar.low.min(prev.bar.low));
                    }
                    let extremum = if bar.high > extremum { bar.high } else { extremum };
                    Step {
                        state: PositionState::Long { extremum, stop },
                        transition: Transition::Hold {
                            side: Side::Long,
                            stop,
                        },
                    }
                }
            }
        }
        PositionState::Short { extremum, stop } => {
            if bar.close > stop {
                return Step {
                    state: PositionState::Flat,
                    transition: Transition::Exit {
                        side: Side::Short,
                        reason: ExitReason::Stop,
                    },
                };
            }
            let mut stop = stop;
            if bar.close < extremum {
                stop = ratchet(Side::Short, stop, bar.high.max(prev.bar.high));
            }
            let extremum = if bar.low < extremum { bar.low } else { extremum };
            Step {
                state: PositionState::Short { extremum, stop },
                transition: Transition::Hold {
                    side: Side::Short,
                    stop,
                },
            }
        }
    }
}

fn enter(side: Side, bar: &Ohlc) -> Step {
    let state = PositionState::open(side, bar);
    let stop = match side {
        Side::Long => bar.low,
        Side::Short => bar.high,
    };
    Step {
        state,
        transition: Transition::Enter { side, stop },
    }
}
