//! Trade markers and trailing-stop annotations for charting.
//!
//! Walks the merged sequence from the second record through the
//! second-to-last: every event is drawn one bar later, at the record after
//! the trigger bar, so the final record can never originate one. The
//! long-to-short reversal is not applied on this path.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::MergedRecord;
use crate::engine::{step, PositionState, Side, Transition};
use crate::signal::{classify, SignalParams};

/// Default distance of marker anchors from the bar extreme (1%).
pub const DEFAULT_ANCHOR_OFFSET: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerParams {
    /// Fraction below the low (or above the high) at which markers anchor.
    pub anchor_offset: f64,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            anchor_offset: DEFAULT_ANCHOR_OFFSET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    LongEntry,
    ShortEntry,
    LongExit,
    /// Short cover.
    ShortExit,
}

impl MarkerKind {
    /// Markers drawn under the bar point up; markers above point down.
    pub fn anchored_below(&self) -> bool {
        matches!(self, MarkerKind::LongEntry | MarkerKind::ShortExit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMarker {
    pub kind: MarkerKind,
    pub date: NaiveDate,
    pub price: f64,
}

/// Stop level drawn on a bar where the position was held through the trigger bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopPoint {
    pub date: NaiveDate,
    pub stop: f64,
}

/// Point-query answer: which side is on and where its stop sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub side: Side,
    pub stop: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub markers: Vec<TradeMarker>,
    pub stops: Vec<StopPoint>,
    pub positions: BTreeMap<NaiveDate, PositionSnapshot>,
}

impl MarkerSeries {
    /// Position and stop shown for `date`, if a position was on.
    pub fn position_on(&self, date: NaiveDate) -> Option<&PositionSnapshot> {
        self.positions.get(&date)
    }

    pub fn count(&self, kind: MarkerKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }
}

/// Run the marker walk over a merged sequence.
pub fn simulate_markers(
    records: &[MergedRecord],
    signal_params: &SignalParams,
    params: &MarkerParams,
) -> MarkerSeries {
    let mut out = MarkerSeries::default();
    let mut state = PositionState::Flat;
    let below = 1.0 - params.anchor_offset;
    let above = 1.0 + params.anchor_offset;

    for i in 1..records.len().saturating_sub(1) {
        let prev = &records[i - 1];
        let curr = &records[i];
        let next = &records[i + 1];

        let signals = classify(curr, prev, signal_params);
        let stepped = step(state, curr, prev, signals, false);
        state = stepped.state;

        let mut mark = |kind: MarkerKind| {
            let price = if kind.anchored_below() {
                next.bar.low * below
            } else {
                next.bar.high * above
            };
            out.markers.push(TradeMarker {
                kind,
                date: next.date,
                price,
            });
        };

        match stepped.transition {
            Transition::Idle => {}
            Transition::Enter { side, stop } => {
                mark(match side {
                    Side::Long => MarkerKind::LongEntry,
                    Side::Short => MarkerKind::ShortEntry,
                });
                out.positions
                    .insert(next.date, PositionSnapshot { side, stop });
            }
            Transition::Hold { side, stop } => {
                out.positions
                    .insert(next.date, PositionSnapshot { side, stop });
                out.stops.push(StopPoint {
                    date: next.date,
                    stop,
                });
            }
            Transition::Exit { side, .. } => {
                mark(match side {
                    Side::Long => MarkerKind::LongExit,
                    Side::Short => MarkerKind::ShortExit,
                });
            }
            // Not produced: this walk steps with reversal disabled.
            Transition::Reverse { .. } => mark(MarkerKind::LongExit),
        }
    }

    tracing::debug!(
        markers = out.markers.len(),
        stops = out.stops.len(),
        "marker walk complete"
    );
    out
}
