//! Domain types for retailflow

pub mod bar;
pub mod record;

pub use bar::{Ohlc, OpenInterestRow, PriceBar};
pub use record::{parse_day, round_2dp, MergedRecord, RetailRatios};
