//! Input rows: the two tables the merger joins.

use serde::{Deserialize, Serialize};

/// OHLC prices for a single trading day, in exchange points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Close above open.
    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    /// Open above close.
    pub fn is_down(&self) -> bool {
        self.open > self.close
    }
}

/// Daily price bar as delivered by ingestion.
///
/// `date` is kept as the source text: the join with open-interest rows is an
/// exact match on the trimmed string, not on a parsed calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: impl Into<String>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date: date.into(),
            open,
            high,
            low,
            close,
        }
    }

    /// Join key: the date with surrounding whitespace removed.
    pub fn key(&self) -> &str {
        self.date.trim()
    }

    pub fn ohlc(&self) -> Ohlc {
        Ohlc::new(self.open, self.high, self.low, self.close)
    }
}

/// Daily open-interest breakdown for the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenInterestRow {
    pub date: String,
    pub total_open_interest: f64,
    pub institutional_long_oi: f64,
    pub institutional_short_oi: f64,
}

impl OpenInterestRow {
    pub fn new(
        date: impl Into<String>,
        total_open_interest: f64,
        institutional_long_oi: f64,
        institutional_short_oi: f64,
    ) -> Self {
        Self {
            date: date.into(),
            total_open_interest,
            institutional_long_oi,
            institutional_short_oi,
        }
    }

    pub fn key(&self) -> &str {
        self.date.trim()
    }

    /// Name of the first non-finite field, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        if !self.total_open_interest.is_finite() {
            Some("total_open_interest")
        } else if !self.institutional_long_oi.is_finite() {
            Some("institutional_long_oi")
        } else if !self.institutional_short_oi.is_finite() {
            Some("institutional_short_oi")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_bar_key_is_trimmed() {
        let bar = PriceBar::new("  2024/01/02 ", 100.0, 105.0, 98.0, 103.0);
        assert_eq!(bar.key(), "2024/01/02");
    }

    #[test]
    fn ohlc_direction() {
        let up = Ohlc::new(100.0, 105.0, 98.0, 103.0);
        assert!(up.is_up());
        assert!(!up.is_down());

        let doji = Ohlc::new(100.0, 101.0, 99.0, 100.0);
        assert!(!doji.is_up());
        assert!(!doji.is_down());
    }

    #[test]
    fn ohlc_detects_void() {
        let mut ohlc = Ohlc::new(100.0, 105.0, 98.0, 103.0);
        assert!(!ohlc.is_void());
        ohlc.low = f64::NAN;
        assert!(ohlc.is_void());
    }

    #[test]
    fn oi_row_reports_non_finite_field() {
        let row = OpenInterestRow::new("2024-01-02", 1000.0, f64::NAN, 300.0);
        assert_eq!(row.first_non_finite(), Some("institutional_long_oi"));

        let ok = OpenInterestRow::new("2024-01-02", 1000.0, 600.0, 300.0);
        assert_eq!(ok.first_non_finite(), None);
    }
}
