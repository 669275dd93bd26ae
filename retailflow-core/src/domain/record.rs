//! MergedRecord: one trading day with price and derived retail positioning.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::bar::Ohlc;

/// Date layouts accepted for join keys, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parse a trimmed join key into a calendar day. No timezone is involved.
pub fn parse_day(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Round to two decimals, exact halves away from zero.
///
/// Ratios are stored already rounded and every predicate compares the rounded
/// values. Non-tie values take the nearest two-decimal value of their exact
/// binary expansion. A value sitting exactly on a `.xx5` boundary is a whole
/// number of odd eighths, and rounds away from zero (`12.125` -> `12.13`,
/// `-0.125` -> `-0.13`).
pub fn round_2dp(value: f64) -> f64 {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        return (value * 100.0).round() / 100.0;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Retail long/short/net positioning, in percent, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetailRatios {
    pub long_pct: f64,
    pub short_pct: f64,
    pub net_pct: f64,
}

impl RetailRatios {
    /// Derive ratios from an open-interest breakdown.
    ///
    /// Returns `None` when total open interest is zero (ratio undefined).
    /// The net ratio is taken from the unrounded long/short fractions and
    /// rounded independently.
    pub fn from_open_interest(total: f64, inst_long: f64, inst_short: f64) -> Option<Self> {
        if total == 0.0 {
            return None;
        }
        let long = (total - inst_long) / total;
        let short = (total - inst_short) / total;
        let net = long - short;
        Some(Self {
            long_pct: round_2dp(long * 100.0),
            short_pct: round_2dp(short * 100.0),
            net_pct: round_2dp(net * 100.0),
        })
    }
}

/// One joined trading day. Immutable once produced by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub bar: Ohlc,
    pub retail: RetailRatios,
}

impl MergedRecord {
    pub fn new(date: NaiveDate, bar: Ohlc, retail: RetailRatios) -> Self {
        Self {
            date,
            weekday: date.weekday(),
            bar,
            retail,
        }
    }

    /// Axis label, e.g. `2024-01-02 (Tue)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.date.format("%Y-%m-%d"), self.weekday)
    }
}
