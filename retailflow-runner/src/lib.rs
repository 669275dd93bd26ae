//! Retailflow Runner: ingestion, configuration, run orchestration and export.
//!
//! This crate builds on `retailflow-core` to provide:
//! - Header-keyed CSV loading of the price and open-interest tables
//! - TOML run configuration with validation and a stable config hash
//! - A single-run pipeline that executes both simulators in parallel
//! - Summary metrics and JSON/CSV/Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{ColumnConfig, ConfigError, DataConfig, OpenInterestColumns, PriceColumns, RunConfig};
pub use data_loader::{load_tables, LoadError, LoadedTables};
pub use export::{load_artifacts, save_artifacts};
pub use metrics::{MarkerCounts, RunSummary};
pub use runner::{run_from_config, run_from_tables, RunError, RunResult, SCHEMA_VERSION};
