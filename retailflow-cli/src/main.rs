//! Retailflow CLI: run the backtest and inspect the merged table.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `inspect`: print the merged daily table, optionally the position on a date

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retailflow_core::domain::parse_day;
use retailflow_core::{merge, simulate_markers, MergedRecord};
use retailflow_runner::{load_tables, run_from_config, save_artifacts, RunConfig, RunResult};

#[derive(Parser)]
#[command(
    name = "retailflow",
    about = "Retailflow CLI: futures backtest driven by retail positioning"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Input selection shared by every command.
#[derive(Args)]
struct Inputs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Daily price CSV (overrides data.prices).
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Daily open-interest CSV (overrides data.open_interest).
    #[arg(long)]
    open_interest: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest and save the artifact set.
    Run {
        #[command(flatten)]
        inputs: Inputs,

        /// Retail net percentage above which the crowd counts as net long.
        #[arg(long)]
        threshold: Option<f64>,

        /// Do not open a short on the bar a long exits by signal.
        #[arg(long, default_value_t = false)]
        no_reversal: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Print the merged daily table.
    Inspect {
        #[command(flatten)]
        inputs: Inputs,

        /// Only show the last N records.
        #[arg(long)]
        tail: Option<usize>,

        /// Emit JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also report the position and stop shown on this date.
        #[arg(long)]
        date: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            inputs,
            threshold,
            no_reversal,
            output_dir,
            no_save,
        } => run_cmd(inputs, threshold, no_reversal, output_dir, no_save),
        Commands::Inspect {
            inputs,
            tail,
            json,
            date,
        } => inspect_cmd(inputs, tail, json, date),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(inputs: Inputs) -> Result<RunConfig> {
    let mut config = match &inputs.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(p) = inputs.prices {
        config.data.prices = Some(p);
    }
    if let Some(p) = inputs.open_interest {
        config.data.open_interest = Some(p);
    }
    Ok(config)
}

fn run_cmd(
    inputs: Inputs,
    threshold: Option<f64>,
    no_reversal: bool,
    output_dir: PathBuf,
    no_save: bool,
) -> Result<()> {
    let mut config = resolve_config(inputs)?;
    if let Some(t) = threshold {
        config.signal.retail_net_threshold = t;
    }
    if no_reversal {
        config.rules.long_to_short_reversal = false;
    }

    let result = run_from_config(&config)?;
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn inspect_cmd(inputs: Inputs, tail: Option<usize>, json: bool, date: Option<String>) -> Result<()> {
    let config = resolve_config(inputs)?;
    let prices = config
        .data
        .prices
        .as_deref()
        .context("no price file: pass --prices or set data.prices")?;
    let open_interest = config
        .data
        .open_interest
        .as_deref()
        .context("no open-interest file: pass --open-interest or set data.open_interest")?;

    let tables = load_tables(prices, open_interest, &config.data.columns)?;
    let merged = merge(&tables.prices, &tables.open_interest)?;
    let records = &merged.records;
    let start = tail.map_or(0, |n| records.len().saturating_sub(n));
    let shown = &records[start..];

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
    } else {
        let r = &merged.report;
        println!(
            "Merged {} of {} open-interest rows ({} unmatched, {} zero OI, {} duplicate)",
            r.merged, r.open_interest_rows, r.unmatched, r.zero_open_interest, r.duplicate_dates
        );
        println!();
        print_table(records, start);
    }

    if let Some(text) = date {
        let day = parse_day(&text).with_context(|| format!("unrecognized date '{text}'"))?;
        let series = simulate_markers(records, &config.signal, &config.markers);
        match series.position_on(day) {
            Some(snap) => println!("{day}: {:?} position, stop {:.2}", snap.side, snap.stop),
            None => println!("{day}: flat"),
        }
    }
    Ok(())
}

/// Print `records[start..]`. Each row carries the close-to-close change and
/// a day-over-day arrow per retail ratio, measured against the record before
/// it even when that record is not shown.
fn print_table(records: &[MergedRecord], start: usize) {
    println!(
        "{:<18} {:>10} {:>10} {:>10} {:>10} {:>9} {:>10} {:>10} {:>10}",
        "Date", "Open", "High", "Low", "Close", "Chg", "Long%", "Short%", "Net%"
    );
    println!("{}", "-".repeat(105));
    for (i, r) in records.iter().enumerate().skip(start) {
        let prev = i.checked_sub(1).map(|p| &records[p]);
        let change = prev.map_or_else(|| "-".to_string(), |p| format!("{:+.2}", r.bar.close - p.bar.close));
        let ratio = |curr: f64, before: Option<f64>| format!("{curr:.2} {}", trend_arrow(curr, before));
        println!(
            "{:<18} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>9} {:>10} {:>10} {:>10}",
            r.label(),
            r.bar.open,
            r.bar.high,
            r.bar.low,
            r.bar.close,
            change,
            ratio(r.retail.long_pct, prev.map(|p| p.retail.long_pct)),
            ratio(r.retail.short_pct, prev.map(|p| p.retail.short_pct)),
            ratio(r.retail.net_pct, prev.map(|p| p.retail.net_pct)),
        );
    }
}

/// `▲` up, `▼` down, `-` unchanged, blank on the first record.
fn trend_arrow(curr: f64, prev: Option<f64>) -> &'static str {
    match prev {
        None => " ",
        Some(p) if curr > p => "▲",
        Some(p) if curr < p => "▼",
        Some(_) => "-",
    }
}

fn print_summary(result: &RunResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!(
        "Period:         {} to {}",
        s.first_date.as_deref().unwrap_or("-"),
        s.last_date.as_deref().unwrap_or("-")
    );
    println!("Trading Days:   {}", s.trading_days);
    println!("Round Trips:    {}", s.round_trips);
    println!(
        "Markers:        {} long in / {} out, {} short in / {} out",
        s.markers.long_entries, s.markers.long_exits, s.markers.short_entries, s.markers.short_exits
    );
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.0}", s.final_equity);
    println!("Long Bucket:    {:+.0}", s.long_pnl);
    println!("Short Bucket:   {:+.0}", s.short_pnl);
    println!("Total Return:   {:.2}%", s.total_return * 100.0);
    println!("CAGR:           {:.2}%", s.cagr * 100.0);
    println!("Sharpe:         {:.3}", s.sharpe);
    println!("Rolling Sharpe: {:.2}", s.final_rolling_sharpe);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown_pct);
    println!();
    println!("Config Hash:    {}", result.config_hash);
    println!("Dataset Hash:   {}", result.dataset_hash);
}
