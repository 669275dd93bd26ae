//! CSV ingestion for the runner.
//!
//! Both tables are header-keyed: columns are looked up by name (see
//! [`ColumnConfig`]), so extra columns and any column order are accepted.
//! Rows with an empty date cell are skipped. Numeric cells are parsed
//! strictly and a bad cell fails the whole load with its file and line.
//!
//! An empty open-interest cell counts as zero, which lets the merge drop the
//! row through its zero-total filter. An empty price cell is an error.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use retailflow_core::{OpenInterestRow, PriceBar};
use thiserror::Error;

use crate::config::{ColumnConfig, OpenInterestColumns, PriceColumns};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: CSV error: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}:{line}: malformed '{column}' value {value:?}")]
    MalformedField {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
}

/// Both source tables plus their fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub prices: Vec<PriceBar>,
    pub open_interest: Vec<OpenInterestRow>,
    /// BLAKE3 over every parsed row of both tables.
    pub dataset_hash: String,
}

/// Load both tables in parallel and fingerprint them.
pub fn load_tables(
    prices_path: &Path,
    open_interest_path: &Path,
    columns: &ColumnConfig,
) -> Result<LoadedTables, LoadError> {
    let (prices, open_interest) = rayon::join(
        || load_prices(prices_path, &columns.prices),
        || load_open_interest(open_interest_path, &columns.open_interest),
    );
    let prices = prices?;
    let open_interest = open_interest?;
    let dataset_hash = dataset_hash(&prices, &open_interest);
    tracing::info!(
        prices = prices.len(),
        open_interest = open_interest.len(),
        %dataset_hash,
        "loaded input tables"
    );
    Ok(LoadedTables {
        prices,
        open_interest,
        dataset_hash,
    })
}

pub fn load_prices(path: &Path, columns: &PriceColumns) -> Result<Vec<PriceBar>, LoadError> {
    let file = open(path)?;
    read_prices(file, columns, path)
}

pub fn load_open_interest(
    path: &Path,
    columns: &OpenInterestColumns,
) -> Result<Vec<OpenInterestRow>, LoadError> {
    let file = open(path)?;
    read_open_interest(file, columns, path)
}

/// Parse a price table. `source` names the input in error messages.
pub fn read_prices<R: Read>(
    reader: R,
    columns: &PriceColumns,
    source: &Path,
) -> Result<Vec<PriceBar>, LoadError> {
    let mut table = Table::new(reader, source)?;
    let date = table.column(&columns.date)?;
    let open = table.column(&columns.open)?;
    let high = table.column(&columns.high)?;
    let low = table.column(&columns.low)?;
    let close = table.column(&columns.close)?;

    let mut bars = Vec::new();
    while let Some(row) = table.next_row()? {
        let day = row.text(date);
        if day.is_empty() {
            continue;
        }
        bars.push(PriceBar::new(
            day,
            row.number(open, &columns.open, None)?,
            row.number(high, &columns.high, None)?,
            row.number(low, &columns.low, None)?,
            row.number(close, &columns.close, None)?,
        ));
    }
    tracing::debug!(path = %source.display(), rows = bars.len(), "parsed price table");
    Ok(bars)
}

/// Parse an open-interest table. `source` names the input in error messages.
pub fn read_open_interest<R: Read>(
    reader: R,
    columns: &OpenInterestColumns,
    source: &Path,
) -> Result<Vec<OpenInterestRow>, LoadError> {
    let mut table = Table::new(reader, source)?;
    let date = table.column(&columns.date)?;
    let total = table.column(&columns.total)?;
    let inst_long = table.column(&columns.institutional_long)?;
    let inst_short = table.column(&columns.institutional_short)?;

    let mut rows = Vec::new();
    while let Some(row) = table.next_row()? {
        let day = row.text(date);
        if day.is_empty() {
            continue;
        }
        rows.push(OpenInterestRow::new(
            day,
            row.number(total, &columns.total, Some(0.0))?,
            row.number(inst_long, &columns.institutional_long, Some(0.0))?,
            row.number(inst_short, &columns.institutional_short, Some(0.0))?,
        ));
    }
    tracing::debug!(path = %source.display(), rows = rows.len(), "parsed open-interest table");
    Ok(rows)
}

/// Deterministic BLAKE3 fingerprint of both tables, in file order.
pub fn dataset_hash(prices: &[PriceBar], open_interest: &[OpenInterestRow]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"prices");
    for bar in prices {
        hasher.update(bar.date.as_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.update(b"open_interest");
    for row in open_interest {
        hasher.update(row.date.as_bytes());
        for v in [
            row.total_open_interest,
            row.institutional_long_oi,
            row.institutional_short_oi,
        ] {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ─── Internals ──────────────────────────────────────────────────────

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

struct Table<'a, R> {
    reader: csv::Reader<R>,
    headers: HashMap<String, usize>,
    record: csv::StringRecord,
    source: &'a Path,
}

impl<'a, R: Read> Table<'a, R> {
    fn new(reader: R, source: &'a Path) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| csv_error(source, e))?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Ok(Self {
            reader,
            headers,
            record: csv::StringRecord::new(),
            source,
        })
    }

    fn column(&self, name: &str) -> Result<usize, LoadError> {
        self.headers
            .get(name.trim())
            .copied()
            .ok_or_else(|| LoadError::MissingColumn {
                path: self.source.to_path_buf(),
                column: name.to_string(),
            })
    }

    /// Next non-blank record, or `None` at end of input.
    fn next_row(&mut self) -> Result<Option<Row<'_>>, LoadError> {
        loop {
            let more = self
                .reader
                .read_record(&mut self.record)
                .map_err(|e| csv_error(self.source, e))?;
            if !more {
                return Ok(None);
            }
            if self.record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let line = self.record.position().map_or(0, |p| p.line());
            return Ok(Some(Row {
                record: &self.record,
                line,
                source: self.source,
            }));
        }
    }
}

struct Row<'r> {
    record: &'r csv::StringRecord,
    line: u64,
    source: &'r Path,
}

impl Row<'_> {
    fn text(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("").trim()
    }

    /// Parse a numeric cell. Thousands separators are accepted. `empty` is
    /// the value for a blank cell; `None` makes a blank cell an error.
    fn number(&self, idx: usize, column: &str, empty: Option<f64>) -> Result<f64, LoadError> {
        let raw = self.text(idx);
        if raw.is_empty() {
            if let Some(v) = empty {
                return Ok(v);
            }
        }
        raw.replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| LoadError::MalformedField {
                path: self.source.to_path_buf(),
                line: self.line,
                column: column.to_string(),
                value: raw.to_string(),
            })
    }
}

fn csv_error(source: &Path, e: csv::Error) -> LoadError {
    LoadError::Csv {
        path: source.to_path_buf(),
        source: e,
    }
}
