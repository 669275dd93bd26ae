//! Equity simulation: per-day PnL, long/short equity buckets, drawdown and
//! rolling Sharpe.
//!
//! Runs the same strategy as the marker walk but accrues PnL with a one-bar
//! execution lag: a position held at the start of bar `i` earns the move from
//! bar `i`'s open to bar `i + 1`'s open. The last record has no successor, so
//! its close stands in for the next open.

pub mod rolling;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{round_2dp, MergedRecord};
use crate::engine::{step, PositionState, Side};
use crate::signal::{classify, SignalParams};

pub use rolling::{RollingSharpe, MIN_STD_DEV};

/// Money parameters for the equity walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquityParams {
    pub starting_fund: f64,
    /// Fee charged per side; a round trip costs twice this.
    pub fee_per_side: f64,
    /// Currency value of one index point for one contract.
    pub contract_multiplier: f64,
    /// Number of daily returns in the rolling Sharpe window.
    pub sharpe_window: usize,
    pub periods_per_year: f64,
}

impl Default for EquityParams {
    fn default() -> Self {
        Self {
            starting_fund: 200_000.0,
            fee_per_side: 200.0,
            contract_multiplier: 50.0,
            sharpe_window: 60,
            periods_per_year: 252.0,
        }
    }
}

/// Which bucket receives the PnL of a bar that ends flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPnlAttribution {
    /// Credit the long bucket whenever the bar ends with a long position, or
    /// ends flat with non-zero PnL, whichever side closed.
    #[default]
    LongBucket,
    /// Credit the side that was held when the bar opened.
    ClosingSide,
}

/// Behavioural switches for the equity walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionRules {
    /// Open a short on the same bar a long exits by signal (no short-to-long
    /// counterpart).
    pub long_to_short_reversal: bool,
    pub exit_pnl_attribution: ExitPnlAttribution,
}

impl Default for ExecutionRules {
    fn default() -> Self {
        Self {
            long_to_short_reversal: true,
            exit_pnl_attribution: ExitPnlAttribution::LongBucket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub date: NaiveDate,
    pub equity: f64,
    pub equity_long: f64,
    pub equity_short: f64,
    /// Shortfall from the running peak, percent, two decimals, never positive.
    pub drawdown_pct: f64,
    pub rolling_sharpe: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    /// One sample per merged record; the first is the seed.
    pub samples: Vec<EquitySample>,
    /// PnL booked on each sample (0 for the seed).
    pub daily_pnl: Vec<f64>,
    /// Number of positions closed, reversals included.
    pub round_trips: usize,
}

impl EquityCurve {
    pub fn final_sample(&self) -> Option<&EquitySample> {
        self.samples.last()
    }

    /// Equity values only, for the summary metrics.
    pub fn equity_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.equity).collect()
    }

    /// Most negative drawdown percentage seen.
    pub fn max_drawdown_pct(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.drawdown_pct)
            .fold(0.0, f64::min)
    }
}

/// Run the equity walk over a merged sequence.
pub fn simulate_equity(
    records: &[MergedRecord],
    signal_params: &SignalParams,
    params: &EquityParams,
    rules: &ExecutionRules,
) -> EquityCurve {
    let Some(first) = records.first() else {
        return EquityCurve::default();
    };

    let fund = params.starting_fund;
    let mut equity = fund;
    let mut equity_long = fund;
    let mut equity_short = fund;
    let mut max_equity = fund;
    let mut state = PositionState::Flat;
    let mut sharpe = RollingSharpe::new(params.sharpe_window.max(1));

    let mut curve = EquityCurve {
        samples: Vec::with_capacity(records.len()),
        daily_pnl: Vec::with_capacity(records.len()),
        round_trips: 0,
    };
    curve.samples.push(EquitySample {
        date: first.date,
        equity,
        equity_long,
        equity_short,
        drawdown_pct: 0.0,
        rolling_sharpe: 0.0,
    });
    curve.daily_pnl.push(0.0);

    for i in 1..records.len() {
        let prev = &records[i - 1];
        let curr = &records[i];
        let next_open = records
            .get(i + 1)
            .map_or(curr.bar.close, |next| next.bar.open);

        let held = state.side();
        let mut pnl = match held {
            Some(Side::Long) => (next_open - curr.bar.open) * params.contract_multiplier,
            Some(Side::Short) => (curr.bar.open - next_open) * params.contract_multiplier,
            None => 0.0,
        };

        let signals = classify(curr, prev, signal_params);
        let stepped = step(state, curr, prev, signals, rules.long_to_short_reversal);
        if stepped.transition.closes_position() {
            pnl -= 2.0 * params.fee_per_side;
            curve.round_trips += 1;
        }
        state = stepped.state;

        equity += pnl;
        match bucket(rules.exit_pnl_attribution, held, &state, pnl) {
            Some(Side::Long) => equity_long += pnl,
            Some(Side::Short) => equity_short += pnl,
            None => {}
        }

        if equity > max_equity {
            max_equity = equity;
        }
        let drawdown_pct = if max_equity != 0.0 {
            round_2dp((equity - max_equity) / max_equity * 100.0)
        } else {
            0.0
        };

        let before = equity - pnl;
        sharpe.push(if before > 0.0 { pnl / before } else { 0.0 });

        curve.samples.push(EquitySample {
            date: curr.date,
            equity,
            equity_long,
            equity_short,
            drawdown_pct,
            rolling_sharpe: sharpe.sharpe(params.periods_per_year),
        });
        curve.daily_pnl.push(pnl);
    }

    tracing::debug!(
        samples = curve.samples.len(),
        round_trips = curve.round_trips,
        final_equity = equity,
        "equity walk complete"
    );
    curve
}

/// Bucket that receives a bar's PnL.
fn bucket(
    attribution: ExitPnlAttribution,
    held: Option<Side>,
    after: &PositionState,
    pnl: f64,
) -> Option<Side> {
    match attribution {
        ExitPnlAttribution::LongBucket => match after.side() {
            Some(side) => Some(side),
            None if pnl != 0.0 => Some(Side::Long),
            None => None,
        },
        ExitPnlAttribution::ClosingSide => held,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ohlc, RetailRatios};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    fn rec(n: u32, ohlc: (f64, f64, f64, f64), long: f64, short: f64) -> MergedRecord {
        MergedRecord::new(
            day(n),
            Ohlc::new(ohlc.0, ohlc.1, ohlc.2, ohlc.3),
            RetailRatios {
                long_pct: long,
                short_pct: short,
                net_pct: long - short,
            },
        )
    }

    fn run(records: &[MergedRecord], rules: ExecutionRules) -> EquityCurve {
        simulate_equity(
            records,
            &SignalParams::default(),
            &EquityParams::default(),
            &rules,
        )
    }

    /// Long entry on day 1, reversal-capable exit on day 2, short stopped on day 4.
    fn reversal_path() -> Vec<MergedRecord> {
        vec![
            rec(0, (100.0, 101.0, 99.0, 100.0), 45.0, 50.0),
            // entry long
            rec(1, (100.0, 103.0, 98.0, 102.0), 44.0, 51.0),
            // exit long by signal + entry short
            rec(2, (104.0, 105.0, 99.5, 100.0), 75.0, 30.0),
            rec(3, (101.0, 102.0, 99.0, 100.5), 75.0, 30.0),
            // close above the short's stop (105)
            rec(4, (103.0, 107.0, 102.0, 106.0), 75.0, 30.0),
            rec(5, (106.0, 107.0, 105.0, 106.5), 75.0, 30.0),
        ]
    }

    #[test]
    fn empty_input_yields_empty_curve() {
        let curve = run(&[], ExecutionRules::default());
        assert!(curve.samples.is_empty());
    }

    #[test]
    fn seed_sample_is_starting_fund() {
        let records = vec![rec(0, (100.0, 101.0, 99.0, 100.0), 45.0, 50.0)];
        let curve = run(&records, ExecutionRules::default());
        assert_eq!(curve.samples.len(), 1);
        let seed = &curve.samples[0];
        assert_eq!(seed.date, day(0));
        assert_eq!(seed.equity, 200_000.0);
        assert_eq!(seed.equity_long, 200_000.0);
        assert_eq!(seed.equity_short, 200_000.0);
        assert_eq!(seed.drawdown_pct, 0.0);
        assert_eq!(seed.rolling_sharpe, 0.0);
    }

    #[test]
    fn long_to_short_reversal_accrues_both_legs() {
        let curve = run(&reversal_path(), ExecutionRules::default());
        let pnl = &curve.daily_pnl;

        // day 1: entry, flat at bar open
        assert_eq!(pnl[1], 0.0);
        // day 2: long held, (next open 101 - open 104) * 50 - 400
        assert_eq!(pnl[2], -3.0 * 50.0 - 400.0);
        // day 3: short held, (101 - 103) * 50
        assert_eq!(pnl[3], -100.0);
        // day 4: short stopped, (103 - 106) * 50 - 400
        assert_eq!(pnl[4], -150.0 - 400.0);
        assert_eq!(pnl[5], 0.0);
        assert_eq!(curve.round_trips, 2);

        let last = curve.final_sample().unwrap();
        assert_eq!(last.equity, 200_000.0 - 550.0 - 100.0 - 550.0);
        // Reversal bar ends short, so the long leg's loss lands in the short
        // bucket; the stopped short's loss ends flat and lands in the long bucket.
        assert_eq!(last.equity_short, 200_000.0 - 550.0 - 100.0);
        assert_eq!(last.equity_long, 200_000.0 - 550.0);
    }

    #[test]
    fn reversal_can_be_disabled() {
        let rules = ExecutionRules {
            long_to_short_reversal: false,
            ..ExecutionRules::default()
        };
        let curve = run(&reversal_path(), rules);
        assert_eq!(curve.round_trips, 1);
        assert_eq!(curve.daily_pnl[3], 0.0);
        let last = curve.final_sample().unwrap();
        assert_eq!(last.equity, 200_000.0 - 550.0);
        assert_eq!(last.equity_long, 200_000.0 - 550.0);
        assert_eq!(last.equity_short, 200_000.0);
    }

    #[test]
    fn closing_side_attribution_credits_the_held_side() {
        let rules = ExecutionRules {
            exit_pnl_attribution: ExitPnlAttribution::ClosingSide,
            ..ExecutionRules::default()
        };
        let curve = run(&reversal_path(), rules);
        let last = curve.final_sample().unwrap();
        assert_eq!(last.equity_long, 200_000.0 - 550.0);
        assert_eq!(last.equity_short, 200_000.0 - 100.0 - 550.0);
        assert_eq!(last.equity, 200_000.0 - 1_200.0);
    }

    #[test]
    fn last_record_uses_close_as_next_open() {
        let records = vec![
            rec(0, (100.0, 101.0, 99.0, 100.0), 45.0, 50.0),
            rec(1, (100.0, 103.0, 98.0, 102.0), 44.0, 51.0),
            rec(2, (102.0, 106.0, 101.0, 105.0), 44.0, 51.0),
        ];
        let curve = run(&records, ExecutionRules::default());
        // held long on the last bar: (close 105 - open 102) * 50, no exit
        assert_eq!(curve.daily_pnl[2], 150.0);
        assert_eq!(curve.samples[2].equity, 200_150.0);
        assert_eq!(curve.samples[2].equity_long, 200_150.0);
    }

    #[test]
    fn drawdown_is_rounded_and_non_positive() {
        let curve = run(&reversal_path(), ExecutionRules::default());
        for s in &curve.samples {
            assert!(s.drawdown_pct <= 0.0);
            assert_eq!(s.drawdown_pct, round_2dp(s.drawdown_pct));
        }
        // 1 200 below a 200 000 peak
        assert_eq!(curve.final_sample().unwrap().drawdown_pct, -0.6);
        assert_eq!(curve.max_drawdown_pct(), -0.6);
    }

    #[test]
    fn sharpe_waits_for_full_window() {
        let params = EquityParams {
            sharpe_window: 3,
            ..EquityParams::default()
        };
        let curve = simulate_equity(
            &reversal_path(),
            &SignalParams::default(),
            &params,
            &ExecutionRules::default(),
        );
        // returns start on sample 1; the window fills on sample 3
        assert_eq!(curve.samples[1].rolling_sharpe, 0.0);
        assert_eq!(curve.samples[2].rolling_sharpe, 0.0);
        assert_ne!(curve.samples[3].rolling_sharpe, 0.0);
    }
}
