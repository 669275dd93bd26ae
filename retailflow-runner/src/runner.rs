//! Run pipeline: wires ingestion, merge, both simulators and metrics.
//!
//! Two entry points:
//! - `run_from_config()`: loads both CSV tables named in the config, then runs. Used by CLI.
//! - `run_from_tables()`: takes pre-loaded rows, no I/O. Used by tests and embedders.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use retailflow_core::{
    merge, simulate_equity, simulate_markers, EquityCurve, MarkerSeries, MergeError, MergeReport,
    MergedRecord, OpenInterestRow, PriceBar,
};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{dataset_hash, load_tables, LoadError};
use crate::metrics::RunSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
    #[error("no {0} file configured (set data.{0} or pass it on the command line)")]
    MissingInput(&'static str),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: RunConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub merge_report: MergeReport,
    pub summary: RunSummary,
    pub records: Vec<MergedRecord>,
    pub markers: MarkerSeries,
    pub equity: EquityCurve,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the configured tables and run.
pub fn run_from_config(config: &RunConfig) -> Result<RunResult, RunError> {
    config.validate()?;
    let prices = config
        .data
        .prices
        .as_deref()
        .ok_or(RunError::MissingInput("prices"))?;
    let open_interest = config
        .data
        .open_interest
        .as_deref()
        .ok_or(RunError::MissingInput("open_interest"))?;

    let tables = load_tables(prices, open_interest, &config.data.columns)?;
    run_with_hash(
        &tables.prices,
        &tables.open_interest,
        config,
        tables.dataset_hash,
    )
}

/// Run over rows that are already in memory, with no I/O.
pub fn run_from_tables(
    prices: &[PriceBar],
    open_interest: &[OpenInterestRow],
    config: &RunConfig,
) -> Result<RunResult, RunError> {
    config.validate()?;
    let hash = dataset_hash(prices, open_interest);
    run_with_hash(prices, open_interest, config, hash)
}

fn run_with_hash(
    prices: &[PriceBar],
    open_interest: &[OpenInterestRow],
    config: &RunConfig,
    dataset_hash: String,
) -> Result<RunResult, RunError> {
    let merged = merge(prices, open_interest)?;
    let records = merged.records;

    // The two walks share only the merged records and signal parameters.
    let (markers, equity) = rayon::join(
        || simulate_markers(&records, &config.signal, &config.markers),
        || simulate_equity(&records, &config.signal, &config.equity, &config.rules),
    );

    let summary = RunSummary::compute(&equity, &markers, config.equity.periods_per_year);
    tracing::info!(
        records = records.len(),
        markers = markers.markers.len(),
        round_trips = summary.round_trips,
        final_equity = summary.final_equity,
        max_drawdown_pct = summary.max_drawdown_pct,
        "run complete"
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash: config.config_hash(),
        dataset_hash,
        merge_report: merged.report,
        summary,
        records,
        markers,
        equity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (Vec<PriceBar>, Vec<OpenInterestRow>) {
        // (open, high, low, close, retail long %, retail short %)
        let days = [
            (100.0, 101.0, 99.0, 100.0, 45.0, 50.0),
            (100.0, 103.0, 98.0, 102.0, 44.0, 51.0),
            (104.0, 105.0, 100.0, 101.0, 75.0, 30.0),
            (103.0, 104.0, 101.0, 102.0, 45.0, 50.0),
            (102.0, 103.0, 100.0, 101.0, 45.0, 50.0),
        ];
        let mut prices = Vec::new();
        let mut rows = Vec::new();
        for (i, (o, h, l, c, long, short)) in days.into_iter().enumerate() {
            let date = format!("2024-05-{:02}", 6 + i);
            prices.push(PriceBar::new(date.clone(), o, h, l, c));
            let total = 10_000.0;
            rows.push(OpenInterestRow::new(
                date,
                total,
                total * (1.0 - long / 100.0),
                total * (1.0 - short / 100.0),
            ));
        }
        (prices, rows)
    }

    #[test]
    fn runs_end_to_end_in_memory() {
        let (prices, rows) = tables();
        let result = run_from_tables(&prices, &rows, &RunConfig::default()).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.merge_report.merged, 5);
        assert_eq!(result.equity.samples.len(), 5);
        assert_eq!(result.summary.markers.long_entries, 1);
        assert_eq!(result.summary.markers.long_exits, 1);
        assert_eq!(result.summary.starting_equity, 200_000.0);
        assert_eq!(result.config_hash, RunConfig::default().config_hash());
        assert_eq!(result.dataset_hash.len(), 64);
    }

    #[test]
    fn empty_join_is_a_merge_error() {
        let (prices, _) = tables();
        let rows = vec![OpenInterestRow::new("1999-01-01", 1000.0, 600.0, 300.0)];
        let err = run_from_tables(&prices, &rows, &RunConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::Merge(MergeError::EmptyResult)));
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let (prices, rows) = tables();
        let mut config = RunConfig::default();
        config.equity.sharpe_window = 0;
        let err = run_from_tables(&prices, &rows, &config).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_paths_are_reported() {
        let err = run_from_config(&RunConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::MissingInput("prices")));
    }
}
