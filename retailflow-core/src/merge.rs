//! Time-series merge.
//!
//! Joins daily price bars with open-interest rows on the trimmed date string
//! and derives the retail positioning ratios. The result is strictly
//! ascending by calendar date and only contains days present in both tables
//! with non-zero total open interest.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{parse_day, MergedRecord, OpenInterestRow, PriceBar, RetailRatios};

/// Errors from the merge step. All of them are fatal for a run.
#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("merge produced no records (no open-interest date matched a price date)")]
    EmptyResult,

    #[error("unparseable date '{0}'")]
    InvalidDate(String),

    #[error("malformed record on {date}: field '{field}' is not a finite number")]
    MalformedRecord { date: String, field: &'static str },
}

/// Bookkeeping about what the join kept and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub price_rows: usize,
    pub open_interest_rows: usize,
    /// Open-interest rows whose date had no price bar.
    pub unmatched: usize,
    /// Rows dropped because total open interest was zero.
    pub zero_open_interest: usize,
    /// Open-interest rows replaced by a later row with the same date.
    pub duplicate_dates: usize,
    pub merged: usize,
}

/// Merged sequence plus its report.
#[derive(Debug, Clone)]
pub struct Merged {
    pub records: Vec<MergedRecord>,
    pub report: MergeReport,
}

/// Join price bars with open-interest rows.
///
/// Open-interest rows drive the join; a later price row with the same date
/// replaces an earlier one, and likewise for open-interest rows.
pub fn merge(prices: &[PriceBar], open_interest: &[OpenInterestRow]) -> Result<Merged, MergeError> {
    let mut report = MergeReport {
        price_rows: prices.len(),
        open_interest_rows: open_interest.len(),
        ..MergeReport::default()
    };

    let mut price_map: HashMap<&str, &PriceBar> = HashMap::with_capacity(prices.len());
    for bar in prices {
        let key = bar.key();
        if !key.is_empty() {
            price_map.insert(key, bar);
        }
    }

    // Keyed by calendar date so iteration is already ascending.
    let mut by_date: BTreeMap<NaiveDate, MergedRecord> = BTreeMap::new();

    for row in open_interest {
        let key = row.key();
        let Some(bar) = price_map.get(key) else {
            report.unmatched += 1;
            continue;
        };

        if let Some(field) = row.first_non_finite() {
            return Err(MergeError::MalformedRecord {
                date: key.to_string(),
                field,
            });
        }
        let ohlc = bar.ohlc();
        if ohlc.is_void() {
            return Err(MergeError::MalformedRecord {
                date: key.to_string(),
                field: "price",
            });
        }

        let Some(retail) = RetailRatios::from_open_interest(
            row.total_open_interest,
            row.institutional_long_oi,
            row.institutional_short_oi,
        ) else {
            report.zero_open_interest += 1;
            continue;
        };

        let date = parse_day(key).ok_or_else(|| MergeError::InvalidDate(key.to_string()))?;

        if by_date
            .insert(date, MergedRecord::new(date, ohlc, retail))
            .is_some()
        {
            report.duplicate_dates += 1;
            tracing::warn!(%date, "duplicate open-interest date, keeping the later row");
        }
    }

    if by_date.is_empty() {
        return Err(MergeError::EmptyResult);
    }

    let records: Vec<MergedRecord> = by_date.into_values().collect();
    report.merged = records.len();

    tracing::debug!(
        merged = report.merged,
        unmatched = report.unmatched,
        zero_oi = report.zero_open_interest,
        "merged price and open-interest tables"
    );

    Ok(Merged { records, report })
}
