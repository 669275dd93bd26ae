//! End-to-end scenarios: raw tables → merge → markers + equity.

use chrono::NaiveDate;
use retailflow_core::{
    merge, simulate_equity, simulate_markers, EquityParams, ExecutionRules, MarkerKind,
    MarkerParams, MergedRecord, OpenInterestRow, PriceBar, SignalParams,
};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap() + chrono::Duration::days(n)
}

/// Build both tables for one day so that retail long/short land on the given
/// percentages (total OI 10 000).
fn tables_for(
    days: &[(f64, f64, f64, f64, f64, f64)],
) -> (Vec<PriceBar>, Vec<OpenInterestRow>) {
    let mut prices = Vec::new();
    let mut rows = Vec::new();
    for (i, &(open, high, low, close, long_pct, short_pct)) in days.iter().enumerate() {
        let date = day(i as i64).format("%Y/%m/%d").to_string();
        prices.push(PriceBar::new(date.clone(), open, high, low, close));
        let total = 10_000.0;
        rows.push(OpenInterestRow::new(
            date,
            total,
            total * (1.0 - long_pct / 100.0),
            total * (1.0 - short_pct / 100.0),
        ));
    }
    (prices, rows)
}

fn merged(days: &[(f64, f64, f64, f64, f64, f64)]) -> Vec<MergedRecord> {
    let (prices, rows) = tables_for(days);
    merge(&prices, &rows).unwrap().records
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn reference_ratios_survive_the_join() {
    let prices = vec![PriceBar::new("2024-05-06", 17000.0, 17100.0, 16950.0, 17050.0)];
    let rows = vec![OpenInterestRow::new("2024-05-06 ", 1000.0, 600.0, 300.0)];
    let out = merge(&prices, &rows).unwrap();
    let r = &out.records[0].retail;
    assert_eq!((r.long_pct, r.short_pct, r.net_pct), (40.0, 70.0, -30.0));
}

#[test]
fn quiet_market_never_trades() {
    let days: Vec<_> = (0..90)
        .map(|i| {
            let p = 17_000.0 + (i as f64 * 0.3).sin() * 50.0;
            (p, p + 20.0, p - 20.0, p + 5.0, 45.0, 50.0)
        })
        .collect();
    let records = merged(&days);

    let markers = simulate_markers(&records, &SignalParams::default(), &MarkerParams::default());
    assert!(markers.markers.is_empty());
    assert!(markers.stops.is_empty());
    assert!(markers.positions.is_empty());

    let params = EquityParams::default();
    let curve = simulate_equity(
        &records,
        &SignalParams::default(),
        &params,
        &ExecutionRules::default(),
    );
    assert_eq!(curve.samples.len(), records.len());
    for s in &curve.samples {
        assert_eq!(s.equity, params.starting_fund);
        assert_eq!(s.equity_long, params.starting_fund);
        assert_eq!(s.equity_short, params.starting_fund);
        assert_eq!(s.drawdown_pct, 0.0);
        assert_eq!(s.rolling_sharpe, 0.0);
    }
    assert_eq!(curve.round_trips, 0);
}

#[test]
fn entry_then_signal_exit() {
    let records = merged(&[
        (100.0, 101.0, 99.0, 100.0, 45.0, 50.0),
        // entry long
        (100.0, 103.0, 98.0, 102.0, 44.0, 51.0),
        // crowd flips heavily net long on a down bar: long exit
        (104.0, 105.0, 100.0, 101.0, 75.0, 30.0),
        (103.0, 104.0, 101.0, 102.0, 45.0, 50.0),
        (102.0, 103.0, 100.0, 101.0, 45.0, 50.0),
    ]);

    let markers = simulate_markers(&records, &SignalParams::default(), &MarkerParams::default());
    assert_eq!(markers.count(MarkerKind::LongEntry), 1);
    assert_eq!(markers.count(MarkerKind::LongExit), 1);
    assert_eq!(markers.markers.len(), 2);
    assert_eq!(markers.markers[0].date, records[2].date);
    assert_eq!(markers.markers[1].date, records[3].date);

    let params = EquityParams::default();
    let curve = simulate_equity(
        &records,
        &SignalParams::default(),
        &params,
        &ExecutionRules::default(),
    );
    let delta = curve.samples[2].equity - curve.samples[1].equity;
    let expected = (records[3].bar.open - records[2].bar.open) * params.contract_multiplier
        - 2.0 * params.fee_per_side;
    assert_eq!(delta, expected);
    assert_eq!(expected, -450.0);
}

#[test]
fn rolling_sharpe_appears_after_sixty_returns() {
    // Long entry on day 1, then a steady uptrend that never trips the stop.
    let mut days = vec![
        (100.0, 101.0, 99.0, 100.0, 45.0, 50.0),
        (100.0, 103.0, 98.0, 102.0, 44.0, 51.0),
    ];
    for i in 0..80 {
        let o = 102.0 + i as f64 + (i % 3) as f64 * 0.3;
        days.push((o, o + 3.0, o - 0.5, o + 2.0, 44.0, 51.0));
    }
    let records = merged(&days);
    let curve = simulate_equity(
        &records,
        &SignalParams::default(),
        &EquityParams::default(),
        &ExecutionRules::default(),
    );

    for s in &curve.samples[..60] {
        assert_eq!(s.rolling_sharpe, 0.0);
    }
    assert!(curve.samples[60].rolling_sharpe > 0.0);
    assert!(curve.final_sample().unwrap().equity > EquityParams::default().starting_fund);
}

#[test]
fn two_runs_are_identical() {
    let records = merged(&[
        (100.0, 101.0, 99.0, 100.0, 45.0, 50.0),
        (100.0, 103.0, 98.0, 102.0, 44.0, 51.0),
        (102.0, 106.0, 101.0, 105.0, 43.0, 52.0),
        (105.0, 106.0, 96.0, 97.0, 43.0, 52.0),
        (97.0, 98.0, 95.0, 96.0, 45.0, 50.0),
    ]);
    let run = || {
        (
            simulate_markers(&records, &SignalParams::default(), &MarkerParams::default()),
            simulate_equity(
                &records,
                &SignalParams::default(),
                &EquityParams::default(),
                &ExecutionRules::default(),
            ),
        )
    };
    assert_eq!(run(), run());
}
