//! Artifact export: JSON manifest, CSV tables and a Markdown report.
//!
//! The CSV files are the data feed for whatever draws the charts:
//! - `merged.csv`: the joined daily table with retail ratios
//! - `markers.csv` and `stops.csv`: chart annotations
//! - `equity.csv`: equity, bucket equity, drawdown and rolling Sharpe per day
//!
//! The manifest carries a `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use retailflow_core::domain::round_2dp;
use retailflow_core::{EquitySample, MarkerKind, MergedRecord, StopPoint, TradeMarker};

use crate::runner::{RunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: date, weekday, open, high, low, close, retail_long_pct,
/// retail_short_pct, retail_net_pct
pub fn export_merged_csv(records: &[MergedRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "weekday",
        "open",
        "high",
        "low",
        "close",
        "retail_long_pct",
        "retail_short_pct",
        "retail_net_pct",
    ])?;
    for r in records {
        wtr.write_record([
            &r.date.to_string(),
            &r.weekday.to_string(),
            &r.bar.open.to_string(),
            &r.bar.high.to_string(),
            &r.bar.low.to_string(),
            &r.bar.close.to_string(),
            &format!("{:.2}", r.retail.long_pct),
            &format!("{:.2}", r.retail.short_pct),
            &format!("{:.2}", r.retail.net_pct),
        ])?;
    }
    finish(wtr)
}

/// Columns: date, kind, price
pub fn export_markers_csv(markers: &[TradeMarker]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "kind", "price"])?;
    for m in markers {
        wtr.write_record([
            m.date.to_string().as_str(),
            marker_label(m.kind),
            format!("{:.2}", m.price).as_str(),
        ])?;
    }
    finish(wtr)
}

fn marker_label(kind: MarkerKind) -> &'static str {
    match kind {
        MarkerKind::LongEntry => "long_entry",
        MarkerKind::ShortEntry => "short_entry",
        MarkerKind::LongExit => "long_exit",
        MarkerKind::ShortExit => "short_exit",
    }
}

/// Columns: date, stop
pub fn export_stops_csv(stops: &[StopPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "stop"])?;
    for s in stops {
        wtr.write_record([&s.date.to_string(), &s.stop.to_string()])?;
    }
    finish(wtr)
}

/// Columns: date, equity, equity_long, equity_short, drawdown_pct,
/// rolling_sharpe. Equity is written in whole currency units.
pub fn export_equity_csv(samples: &[EquitySample]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "equity",
        "equity_long",
        "equity_short",
        "drawdown_pct",
        "rolling_sharpe",
    ])?;
    for s in samples {
        wtr.write_record([
            &s.date.to_string(),
            &format!("{:.0}", whole_units(s.equity)),
            &format!("{:.0}", whole_units(s.equity_long)),
            &format!("{:.0}", whole_units(s.equity_short)),
            &format!("{:.2}", s.drawdown_pct),
            &format!("{:.2}", round_2dp(s.rolling_sharpe)),
        ])?;
    }
    finish(wtr)
}

/// Half-way values round up.
fn whole_units(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates `run_{config hash prefix}_{timestamp}/` under `output_dir` with
/// `manifest.json`, `merged.csv`, `markers.csv`, `stops.csv`, `equity.csv`
/// and `report.md`. Returns the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let short_hash = result.config_hash.get(..8).unwrap_or(&result.config_hash);
    let dirname = format!(
        "run_{}_{}",
        short_hash,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("merged.csv", export_merged_csv(&result.records)?),
        ("markers.csv", export_markers_csv(&result.markers.markers)?),
        ("stops.csv", export_stops_csv(&result.markers.stops)?),
        ("equity.csv", export_equity_csv(&result.equity.samples)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Human-readable summary of a run.
pub fn generate_report(result: &RunResult) -> String {
    let s = &result.summary;
    let c = &result.config;
    let mut md = String::with_capacity(2048);

    md.push_str("# Retail Positioning Backtest\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        s.first_date.as_deref().unwrap_or("-"),
        s.last_date.as_deref().unwrap_or("-")
    ));
    md.push_str(&format!("| Trading Days | {} |\n", s.trading_days));
    md.push_str(&format!("| Starting Fund | {:.0} |\n", c.equity.starting_fund));
    md.push_str(&format!("| Fee Per Side | {:.0} |\n", c.equity.fee_per_side));
    md.push_str(&format!(
        "| Point Value | {:.0} |\n",
        c.equity.contract_multiplier
    ));
    md.push_str(&format!(
        "| Retail Net Threshold | {:.2}% |\n",
        c.signal.retail_net_threshold
    ));
    md.push_str(&format!(
        "| Long→Short Reversal | {} |\n",
        if c.rules.long_to_short_reversal { "on" } else { "off" }
    ));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push('\n');

    let r = &result.merge_report;
    md.push_str("## Data\n\n");
    md.push_str("| Rows | Count |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Price rows | {} |\n", r.price_rows));
    md.push_str(&format!("| Open-interest rows | {} |\n", r.open_interest_rows));
    md.push_str(&format!("| Unmatched dates | {} |\n", r.unmatched));
    md.push_str(&format!("| Zero open interest | {} |\n", r.zero_open_interest));
    md.push_str(&format!("| Duplicate dates | {} |\n", r.duplicate_dates));
    md.push_str(&format!("| Merged | {} |\n", r.merged));
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Equity | {:.0} |\n", whole_units(s.final_equity)));
    md.push_str(&format!("| Long Bucket PnL | {:.0} |\n", whole_units(s.long_pnl)));
    md.push_str(&format!("| Short Bucket PnL | {:.0} |\n", whole_units(s.short_pnl)));
    md.push_str(&format!("| Total Return | {:.2}% |\n", s.total_return * 100.0));
    md.push_str(&format!("| CAGR | {:.2}% |\n", s.cagr * 100.0));
    md.push_str(&format!("| Sharpe | {:.2} |\n", s.sharpe));
    md.push_str(&format!(
        "| Rolling Sharpe ({}d, last) | {:.2} |\n",
        c.equity.sharpe_window, s.final_rolling_sharpe
    ));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", s.max_drawdown_pct));
    md.push_str(&format!("| Round Trips | {} |\n", s.round_trips));
    md.push_str(&format!(
        "| Winning / Losing Days | {} / {} |\n",
        s.winning_days, s.losing_days
    ));
    md.push('\n');

    let m = &s.markers;
    md.push_str("## Markers\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Long entries | {} |\n", m.long_entries));
    md.push_str(&format!("| Long exits | {} |\n", m.long_exits));
    md.push_str(&format!("| Short entries | {} |\n", m.short_entries));
    md.push_str(&format!("| Short exits | {} |\n", m.short_exits));
    md.push_str(&format!("| Stop points | {} |\n", m.stop_points));

    md
}
