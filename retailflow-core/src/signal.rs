//! Entry/exit classification from retail positioning.
//!
//! Every predicate looks at the current record and its immediate predecessor
//! only. Long entries fade a retail crowd that is net short and getting
//! shorter on an up day; short entries fade a crowd that is heavily net long
//! and getting longer on a down day.

use serde::{Deserialize, Serialize};

use crate::domain::MergedRecord;

/// Default retail-net threshold (percent) above which the crowd counts as
/// crowded long.
pub const DEFAULT_RETAIL_NET_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Minimum retail net ratio (percent, exclusive) for a short entry or a
    /// strategic long exit.
    pub retail_net_threshold: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            retail_net_threshold: DEFAULT_RETAIL_NET_THRESHOLD,
        }
    }
}

/// Signals for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub entry_long: bool,
    pub entry_short: bool,
    pub exit_long: bool,
}

impl Signals {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Up bar, crowd net short, retail longs shrinking and retail shorts growing.
pub fn entry_long(curr: &MergedRecord, prev: &MergedRecord) -> bool {
    curr.bar.is_up()
        && curr.retail.net_pct < 0.0
        && curr.retail.long_pct < prev.retail.long_pct
        && curr.retail.short_pct > prev.retail.short_pct
}

/// Down bar, crowd net long beyond the threshold, retail longs growing and
/// retail shorts shrinking.
pub fn entry_short(curr: &MergedRecord, prev: &MergedRecord, params: &SignalParams) -> bool {
    curr.bar.is_down()
        && curr.retail.net_pct > params.retail_net_threshold
        && curr.retail.long_pct > prev.retail.long_pct
        && curr.retail.short_pct < prev.retail.short_pct
}

/// Strategic long exit: the short-entry predicate, evaluated as is.
pub fn exit_long(curr: &MergedRecord, prev: &MergedRecord, params: &SignalParams) -> bool {
    entry_short(curr, prev, params)
}

/// Evaluate all predicates for `curr`.
pub fn classify(curr: &MergedRecord, prev: &MergedRecord, params: &SignalParams) -> Signals {
    Signals {
        entry_long: entry_long(curr, prev),
        entry_short: entry_short(curr, prev, params),
        exit_long: exit_long(curr, prev, params),
    }
}
