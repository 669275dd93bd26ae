//! Run summary metrics: pure functions over the equity curve.
//!
//! The per-bar series (drawdown percent, rolling Sharpe) come from the equity
//! simulator itself; this module reduces a finished run to a handful of
//! scalars for the manifest and the CLI.

use retailflow_core::{EquityCurve, MarkerKind, MarkerSeries};
use serde::{Deserialize, Serialize};

/// Aggregate statistics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub trading_days: usize,
    pub starting_equity: f64,
    pub final_equity: f64,
    /// PnL credited to the long bucket.
    pub long_pnl: f64,
    /// PnL credited to the short bucket.
    pub short_pnl: f64,
    pub total_return: f64,
    pub cagr: f64,
    /// Full-period annualized Sharpe (population std, zero risk-free rate).
    pub sharpe: f64,
    /// Rolling Sharpe on the last bar.
    pub final_rolling_sharpe: f64,
    /// Deepest drawdown as a negative fraction.
    pub max_drawdown: f64,
    /// Deepest per-bar drawdown percent as reported by the simulator.
    pub max_drawdown_pct: f64,
    pub round_trips: usize,
    pub winning_days: usize,
    pub losing_days: usize,
    pub markers: MarkerCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerCounts {
    pub long_entries: usize,
    pub short_entries: usize,
    pub long_exits: usize,
    pub short_exits: usize,
    pub stop_points: usize,
}

impl MarkerCounts {
    pub fn from_series(series: &MarkerSeries) -> Self {
        Self {
            long_entries: series.count(MarkerKind::LongEntry),
            short_entries: series.count(MarkerKind::ShortEntry),
            long_exits: series.count(MarkerKind::LongExit),
            short_exits: series.count(MarkerKind::ShortExit),
            stop_points: series.stops.len(),
        }
    }
}

impl RunSummary {
    pub fn compute(curve: &EquityCurve, markers: &MarkerSeries, periods_per_year: f64) -> Self {
        let equity = curve.equity_values();
        let first = curve.samples.first();
        let last = curve.final_sample();
        let starting_equity = first.map_or(0.0, |s| s.equity);
        Self {
            first_date: first.map(|s| s.date.to_string()),
            last_date: last.map(|s| s.date.to_string()),
            trading_days: curve.samples.len(),
            starting_equity,
            final_equity: last.map_or(0.0, |s| s.equity),
            long_pnl: last.map_or(0.0, |s| s.equity_long - starting_equity),
            short_pnl: last.map_or(0.0, |s| s.equity_short - starting_equity),
            total_return: total_return(&equity),
            cagr: cagr(&equity, periods_per_year),
            sharpe: sharpe_ratio(&equity, periods_per_year),
            final_rolling_sharpe: last.map_or(0.0, |s| s.rolling_sharpe),
            max_drawdown: max_drawdown(&equity),
            max_drawdown_pct: curve.max_drawdown_pct(),
            round_trips: curve.round_trips,
            winning_days: curve.daily_pnl.iter().filter(|p| **p > 0.0).count(),
            losing_days: curve.daily_pnl.iter().filter(|p| **p < 0.0).count(),
            markers: MarkerCounts::from_series(markers),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound annual growth rate, treating each sample after the seed as one
/// period. Returns 0.0 for short or non-positive curves.
pub fn cagr(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let (initial, last) = match (equity_curve.first(), equity_curve.last()) {
        (Some(&i), Some(&l)) if equity_curve.len() >= 2 => (i, l),
        _ => return 0.0,
    };
    if initial <= 0.0 || last <= 0.0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let years = (equity_curve.len() - 1) as f64 / periods_per_year;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe over every period return of the curve.
///
/// Sharpe = mean(returns) / std(returns) * sqrt(periods_per_year).
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * periods_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Simple returns between consecutive samples. A non-positive base yields 0.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
