//! End-to-end scan tests over crafted synthetic series.
//!
//! Each builder constructs a full OHLCV history whose indicator geometry
//! drives exactly the rule under test on the final bar. Window-dependent
//! tests shorten `fib_len` to its lower bound so 65-70 bar series carry
//! defined walls.

use chrono::NaiveDate;
use screenlab_core::domain::{Bar, SignalKind};
use screenlab_core::engine::{ScanEngine, ScanError, ScanRequest};
use screenlab_core::strategy::params::ParamMap;
use screenlab_core::strategy::StrategyRegistry;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn bar(symbol: &str, i: usize, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

fn overrides(pairs: &[(&str, f64)]) -> ParamMap {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

fn request_with_short_walls(strategy: &str) -> ScanRequest {
    let mut request = ScanRequest::new(strategy);
    request.overrides = overrides(&[("fib_len", 50.0)]);
    request
}

fn run(bars: &[Bar], request: &ScanRequest) -> Vec<screenlab_core::domain::Signal> {
    let registry = StrategyRegistry::with_builtins().unwrap();
    ScanEngine::new(&registry).run(request, bars).unwrap()
}

fn count(signals: &[screenlab_core::domain::Signal], kind: SignalKind) -> usize {
    signals.iter().filter(|s| s.kind == kind).count()
}

// ──────────────────────────────────────────────
// Series builders
// ──────────────────────────────────────────────

/// 70 bars of constant close and volume.
fn flat_series(symbol: &str) -> Vec<Bar> {
    (0..70)
        .map(|i| bar(symbol, i, 100.0, 100.5, 99.5, 100.0, 1000))
        .collect()
}

/// A gentle decline below the long average, a heavy-volume
/// bullish crossover bar, then a confirming bar that holds above it.
fn trend_start_series(symbol: &str) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(70);
    for i in 0..=67 {
        let close = 102.0 - 0.03 * i as f64;
        let open = if i == 0 { close } else { 102.0 - 0.03 * (i - 1) as f64 };
        bars.push(bar(symbol, i, open, open + 0.05, close - 0.05, close, 1000));
    }
    // Crossover bar: close jumps above the long average on 2.5x volume.
    bars.push(bar(symbol, 68, 100.0, 106.5, 99.9, 106.0, 2500));
    // Confirmation bar: bullish, still above the average.
    bars.push(bar(symbol, 69, 106.2, 107.5, 106.0, 107.0, 1200));
    bars
}

/// A long decline in a bear structure, then one stable-volume bullish bar
/// that reclaims the short average.
fn accumulation_series(symbol: &str) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(70);
    for i in 0..=68 {
        let close = 120.0 - 0.5 * i as f64;
        let open = if i == 0 { close } else { 120.0 - 0.5 * (i - 1) as f64 };
        bars.push(bar(symbol, i, open, open + 0.2, close - 0.5, close, 1000));
    }
    bars.push(bar(symbol, 69, 86.5, 92.5, 86.0, 92.0, 1200));
    bars
}

/// Mild alternation under a flat ceiling, then a final bar
/// whose high pokes above the ceiling while the close is rejected below
/// it — on a red candle with unremarkable volume.
fn rejection_series(symbol: &str) -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..70)
        .map(|i| {
            let close = if i % 2 == 0 { 99.8 } else { 100.2 };
            bar(symbol, i, 100.0, close + 0.3, close - 0.3, close, 1000)
        })
        .collect();
    bars[69] = bar(symbol, 69, 100.4, 101.5, 100.0, 100.3, 1000);
    bars
}

/// A peak-and-trough base fixes the retracement walls (top 120, low 80,
/// golden level 104.72); the close then breaks the golden level at bar 60
/// and again at bar 64, inside the default 10-bar cooldown.
///
/// `first_breakout_volume` decides whether the bar-60 breakout was fully
/// valid (2000) or crossed on weak volume (1000).
fn double_golden_series(symbol: &str, first_breakout_volume: u64) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(65);
    for i in 0..65 {
        let (open, high, low, close, volume) = match i {
            0..=14 => (95.0, 95.5, 94.5, 95.0, 1000),
            15..=19 => (114.0, 120.0, 110.0, 116.0, 1000),
            20..=24 => (83.0, 85.0, 80.0, 82.0, 1000),
            25..=59 => (100.0, 100.5, 99.5, 100.0, 1000),
            60 => (100.0, 106.5, 99.5, 106.0, first_breakout_volume),
            61 => (100.5, 106.4, 99.6, 100.0, 1000),
            62 => (100.5, 106.3, 99.7, 100.0, 1000),
            63 => (100.5, 106.2, 99.8, 100.0, 1000),
            _ => (100.0, 107.0, 99.9, 106.0, 2000), // bar 64
        };
        bars.push(bar(symbol, i, open, high, low, close, volume));
    }
    bars
}

// ──────────────────────────────────────────────
// End-to-end scenarios
// ──────────────────────────────────────────────

#[test]
fn flat_series_produces_nothing() {
    let signals = run(&flat_series("FLAT"), &request_with_short_walls("trend_pulse"));
    assert!(signals.is_empty(), "flat series must stay silent: {signals:?}");
}

#[test]
fn trend_start_fires_one_bar_after_crossover() {
    let bars = trend_start_series("TRND");
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));

    assert_eq!(signals.len(), 1, "expected exactly one signal: {signals:?}");
    assert_eq!(signals[0].kind, SignalKind::TrendStart);
    // Dated at the confirmation bar, not the crossover bar.
    assert_eq!(signals[0].date, bars[69].date);
    assert_eq!(signals[0].price, bars[69].close);
    assert_eq!(count(&signals, SignalKind::PullbackEntry), 0);
}

#[test]
fn rejection_fires_despite_weak_volume_and_direction() {
    let bars = rejection_series("RJCT");
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));

    assert_eq!(signals.len(), 1, "expected only the warning: {signals:?}");
    assert_eq!(signals[0].kind, SignalKind::ResistanceRejection);
    assert_eq!(signals[0].date, bars[69].date);
}

#[test]
fn accumulation_reclaim_fires_exactly_once() {
    let bars = accumulation_series("ACCM");
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));

    assert_eq!(signals.len(), 1, "expected one signal: {signals:?}");
    assert_eq!(signals[0].kind, SignalKind::SilentAccumulation);
    // The floor-bounce rule sees the same bar but fails the direction
    // check, so no fib_bottom rides along.
    assert_eq!(count(&signals, SignalKind::FibBottom), 0);
}

// ──────────────────────────────────────────────
// Cooldown asymmetry
// ──────────────────────────────────────────────

#[test]
fn valid_past_breakout_suppresses_the_next_one() {
    let bars = double_golden_series("GOLD", 2000);
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));
    assert_eq!(
        count(&signals, SignalKind::GoldenBreakout),
        0,
        "bar-60 breakout was fully valid, bar-64 repeat must stay quiet"
    );
}

#[test]
fn raw_past_crossover_does_not_suppress() {
    // Same geometry, but the bar-60 crossover happened on weak volume: it
    // would not have fired then, so it does not count toward the cooldown.
    let bars = double_golden_series("GOLD", 1000);
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));

    assert_eq!(count(&signals, SignalKind::GoldenBreakout), 1);
    let golden = signals
        .iter()
        .find(|s| s.kind == SignalKind::GoldenBreakout)
        .unwrap();
    assert_eq!(golden.date, bars[64].date);
    assert!(golden.metadata.contains_key("wall_gold"));
}

#[test]
fn golden_and_ceiling_breakouts_cool_down_independently() {
    // Push the final close through the ceiling as well: the golden repeat
    // is still suppressed by bar 60, but the ceiling was never broken
    // before, so the resistance breakout fires.
    let mut bars = double_golden_series("BRKT", 2000);
    bars[64] = bar("BRKT", 64, 100.0, 122.0, 99.9, 121.0, 2000);
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));

    assert_eq!(count(&signals, SignalKind::GoldenBreakout), 0);
    assert_eq!(count(&signals, SignalKind::ResistanceBreakout), 1);
}

// ──────────────────────────────────────────────
// Engine behavior
// ──────────────────────────────────────────────

#[test]
fn one_bad_instrument_does_not_abort_the_scan() {
    let mut bars = accumulation_series("GOOD");
    let mut bad = accumulation_series("BAD");
    bad[30].close = f64::NAN;
    bars.extend(bad);

    let signals = run(&bars, &request_with_short_walls("trend_pulse"));
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].symbol, "GOOD");
}

#[test]
fn kind_filter_keeps_only_requested_kinds() {
    let bars = accumulation_series("ACCM");

    let mut request = request_with_short_walls("trend_pulse");
    request.kinds = Some(vec![SignalKind::TrendStart]);
    assert!(run(&bars, &request).is_empty());

    request.kinds = Some(vec![SignalKind::SilentAccumulation]);
    assert_eq!(run(&bars, &request).len(), 1);
}

#[test]
fn universe_filter_restricts_symbols() {
    let mut bars = accumulation_series("AAA");
    bars.extend(accumulation_series("BBB"));

    let mut request = request_with_short_walls("trend_pulse");
    request.symbols = Some(vec!["BBB".to_string()]);
    let signals = run(&bars, &request);
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].symbol, "BBB");
}

#[test]
fn output_order_is_deterministic_across_runs() {
    // Interleave three instruments; symbol order in the output follows
    // first appearance in the input, and repeat runs are byte-identical.
    let a = accumulation_series("AAA");
    let b = trend_start_series("BBB");
    let c = rejection_series("CCC");
    let mut bars = Vec::new();
    for i in 0..70 {
        bars.push(c[i].clone());
        bars.push(a[i].clone());
        bars.push(b[i].clone());
    }

    let request = request_with_short_walls("trend_pulse");
    let first = run(&bars, &request);
    let second = run(&bars, &request);

    let symbols: Vec<_> = first.iter().map(|s| s.symbol.clone()).collect();
    assert_eq!(symbols, vec!["CCC", "AAA", "BBB"]);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn unknown_strategy_reports_available_names() {
    let registry = StrategyRegistry::with_builtins().unwrap();
    let err = ScanEngine::new(&registry)
        .run(&ScanRequest::new("mystery"), &[])
        .unwrap_err();
    match err {
        ScanError::UnknownStrategy { name, available } => {
            assert_eq!(name, "mystery");
            assert_eq!(available, vec!["trend_pulse".to_string()]);
        }
        other => panic!("expected UnknownStrategy, got {other:?}"),
    }
}

#[test]
fn parameter_violations_fail_the_whole_request() {
    let registry = StrategyRegistry::with_builtins().unwrap();
    let mut request = ScanRequest::new("trend_pulse");
    request.overrides = overrides(&[("fib_len", 20.0), ("unknown_knob", 1.0)]);

    let err = ScanEngine::new(&registry)
        .run(&request, &accumulation_series("ACCM"))
        .unwrap_err();
    match err {
        ScanError::InvalidParams(param_err) => {
            assert_eq!(param_err.violations.len(), 2);
        }
        other => panic!("expected InvalidParams, got {other:?}"),
    }
}

#[test]
fn sub_minimum_history_is_silent_not_an_error() {
    let bars: Vec<Bar> = accumulation_series("TINY").into_iter().take(59).collect();
    let signals = run(&bars, &request_with_short_walls("trend_pulse"));
    assert!(signals.is_empty());
}
