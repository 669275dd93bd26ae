/// Ratchet invariant enforcement
///
/// **Core Rule:** Stops may tighten, never loosen.
///
/// The trailing rule proposes `min(low, prev_low)` for longs and
/// `max(high, prev_high)` for shorts once price makes a new extreme. Those
/// proposals can sit on the wrong side of the current stop (a new closing high
/// on a bar with a deep intraday low), so every proposal passes through here.
use super::state::Side;

/// Apply the ratchet to a proposed stop level.
///
/// # Rules
/// - Long positions: stop can only rise (max of current and proposed)
/// - Short positions: stop can only fall (min of current and proposed)
///
/// # Example
/// ```
/// use retailflow_core::engine::{ratchet, Side};
///
/// // Tightening: 95 → 100 (allowed)
/// assert_eq!(ratchet(Side::Long, 95.0, 100.0), 100.0);
///
/// // Loosening: 100 → 90 (blocked, stays at 100)
/// assert_eq!(ratchet(Side::Long, 100.0, 90.0), 100.0);
///
/// // Shorts tighten downwards
/// assert_eq!(ratchet(Side::Short, 100.0, 90.0), 90.0);
/// ```
pub fn ratchet(side: Side, current: f64, proposed: f64) -> f64 {
    match side {
        Side::Long => current.max(proposed),
        Side::Short => current.min(proposed),
    }
}

/// Whether moving from `from` to `to` loosens the stop for `side`.
pub fn would_loosen(side: Side, from: f64, to: f64) -> bool {
    match side {
        Side::Long => to < from,
        Side::Short => to > from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stop_never_falls() {
        let mut stop = 95.0;
        for proposed in [100.0, 90.0, 99.0, 105.0, 50.0] {
            let next = ratchet(Side::Long, stop, proposed);
            assert!(!would_loosen(Side::Long, stop, next));
            stop = next;
        }
        assert_eq!(stop, 105.0);
    }

    #[test]
    fn short_stop_never_rises() {
        let mut stop = 105.0;
        for proposed in [100.0, 110.0, 101.0, 95.0, 200.0] {
            let next = ratchet(Side::Short, stop, proposed);
            assert!(!would_loosen(Side::Short, stop, next));
            stop = next;
        }
        assert_eq!(stop, 95.0);
    }

    #[test]
    fn equal_proposal_is_a_noop() {
        assert_eq!(ratchet(Side::Long, 100.0, 100.0), 100.0);
        assert_eq!(ratchet(Side::Short, 100.0, 100.0), 100.0);
    }
}
