//! The seven signal rules, in evaluation order.
//!
//! Every rule reads the current bar (index `i`, always the last bar of the
//! series) and at most the two bars before it, plus the precomputed frame.
//! NaN indicator values fail their comparisons and the rule skips silently.

use std::collections::BTreeMap;

use serde_json::json;

use crate::domain::{Bar, Signal, SignalKind};
use crate::indicators::IndicatorFrame;

use super::TrendPulseParams;

pub(super) struct RuleCtx<'a> {
    pub bars: &'a [Bar],
    pub frame: &'a IndicatorFrame,
    pub params: &'a TrendPulseParams,
    /// Index of the bar under evaluation — the last bar of the series.
    pub i: usize,
}

impl RuleCtx<'_> {
    fn bar(&self) -> &Bar {
        &self.bars[self.i]
    }

    fn prev(&self) -> &Bar {
        &self.bars[self.i - 1]
    }

    fn volume(&self, index: usize) -> f64 {
        self.bars[index].volume as f64
    }

    fn emit(&self, kind: SignalKind, metadata: BTreeMap<String, serde_json::Value>) -> Signal {
        let bar = self.bar();
        Signal {
            symbol: bar.symbol.clone(),
            kind,
            date: bar.date,
            price: bar.close,
            rsi: self.frame.rsi[self.i],
            adx: self.frame.adx[self.i],
            metadata,
        }
    }
}

fn note(text: &str) -> BTreeMap<String, serde_json::Value> {
    BTreeMap::from([("note".to_string(), json!(text))])
}

fn level(key: &str, value: f64) -> BTreeMap<String, serde_json::Value> {
    BTreeMap::from([(key.to_string(), json!(value))])
}

fn already_fired(signals: &[Signal], kind: SignalKind) -> bool {
    signals.iter().any(|s| s.kind == kind)
}

/// Rule 1 — quiet buying inside a bear structure.
///
/// Short average below long average, close reclaims the short average this
/// bar, RSI above its moving average and rising, volume inside the stable
/// 0.3x–1.5x band, bullish bar.
pub(super) fn silent_accumulation(ctx: &RuleCtx) -> Option<Signal> {
    let f = ctx.frame;
    let i = ctx.i;
    let bar = ctx.bar();
    let prev = ctx.prev();

    let bear_structure = f.ema_short[i] < f.ema_long[i];
    let crossed_short = prev.close <= f.ema_short[i - 1] && bar.close > f.ema_short[i];
    let rsi_strong = f.rsi[i] > f.rsi_ma[i] && f.rsi[i] > f.rsi[i - 1];
    let vol = ctx.volume(i);
    let vol_stable = vol > f.avg_volume[i] * 0.3 && vol < f.avg_volume[i] * 1.5;

    if bear_structure && crossed_short && rsi_strong && vol_stable && bar.is_bullish() {
        Some(ctx.emit(
            SignalKind::SilentAccumulation,
            note("short average reclaimed inside a bear structure"),
        ))
    } else {
        None
    }
}

/// Rule 2 — trend start with a one-bar confirmation delay.
///
/// The close crossed above the long average exactly one bar ago, on strong
/// bullish volume; the current bar holds above it, is bullish itself, and
/// directional movement points up.
pub(super) fn trend_start(ctx: &RuleCtx) -> Option<Signal> {
    let f = ctx.frame;
    let i = ctx.i;
    let bar = ctx.bar();
    let prev = ctx.prev();
    let prev2 = &ctx.bars[i - 2];

    let crossed_one_bar_ago =
        prev2.close <= f.ema_long[i - 2] && prev.close > f.ema_long[i - 1];
    let breakout_bar_strong = ctx.volume(i - 1) > f.avg_volume[i - 1] && prev.is_bullish();
    let held_above = bar.close >= f.ema_long[i];
    let direction_up = f.di_plus[i] > f.di_minus[i];

    if crossed_one_bar_ago
        && breakout_bar_strong
        && held_above
        && bar.is_bullish()
        && direction_up
    {
        Some(ctx.emit(
            SignalKind::TrendStart,
            note("long average crossed one bar ago and held"),
        ))
    } else {
        None
    }
}

/// Bars since the most recent upward and downward crossovers of close vs
/// the long average, scanning backward from `i`.
///
/// Bounded by the available history; returns `None` for a side that never
/// crossed instead of erroring.
pub(super) fn last_crossovers(
    bars: &[Bar],
    ema_long: &[f64],
    i: usize,
) -> (Option<usize>, Option<usize>) {
    let mut up = None;
    let mut down = None;

    for j in (1..=i).rev() {
        if up.is_none()
            && bars[j - 1].close <= ema_long[j - 1]
            && bars[j].close > ema_long[j]
        {
            up = Some(i - j);
        }
        if down.is_none()
            && bars[j - 1].close >= ema_long[j - 1]
            && bars[j].close < ema_long[j]
        {
            down = Some(i - j);
        }
        if up.is_some() && down.is_some() {
            break;
        }
    }

    (up, down)
}

/// Rule 3 — pullback re-entry on a mature uptrend.
///
/// Suppressed when a trend start already fired this pass: a fresh breakout
/// and a retest of the same average cannot both be true.
pub(super) fn pullback_entry(ctx: &RuleCtx, fired: &[Signal]) -> Option<Signal> {
    let f = ctx.frame;
    let p = ctx.params;
    let i = ctx.i;
    let bar = ctx.bar();
    let prev = ctx.prev();

    let (up, down) = last_crossovers(ctx.bars, &f.ema_long, i);
    let mature = match (up, down) {
        (Some(u), Some(d)) if u < d => u >= p.pb_wait_bars,
        (Some(u), None) => u >= p.pb_wait_bars,
        _ => false,
    };
    if !mature {
        return None;
    }

    // Contact: today's low inside the tolerance band, or yesterday's low
    // was while yesterday closed down.
    let tolerance = 1.0 + p.pull_pct / 100.0;
    let touched_today = bar.low <= f.ema_long[i] * tolerance;
    let touched_yesterday = prev.low <= f.ema_long[i - 1] * tolerance;
    let yesterday_closed_down = prev.close < ctx.bars[i - 2].close;
    let contact = touched_today || (touched_yesterday && yesterday_closed_down);

    let vol_ok = ctx.volume(i) > f.avg_volume[i] * p.vol_mult;
    let slope_positive = f.ema_slope[i] > 0.0;
    let trend_strong = f.adx[i] > p.adx_thresh;
    let direction_up = f.di_plus[i] > f.di_minus[i];

    let pullback = contact
        && bar.close > f.ema_long[i]
        && bar.is_bullish()
        && slope_positive
        && trend_strong
        && f.rsi[i] > p.rsi_min
        && vol_ok
        && bar.close > prev.low
        && direction_up;

    if pullback && !already_fired(fired, SignalKind::TrendStart) {
        Some(ctx.emit(SignalKind::PullbackEntry, note("long average retest")))
    } else {
        None
    }
}

/// Rule 4 — bounce off the rolling-minimum floor.
///
/// Suppressed when a pullback entry already fired this pass.
pub(super) fn fib_bottom(ctx: &RuleCtx, fired: &[Signal]) -> Option<Signal> {
    let f = ctx.frame;
    let i = ctx.i;
    let bar = ctx.bar();

    if f.wall_low[i].is_nan() {
        return None;
    }

    let dip = bar.low <= f.wall_low[i] * 1.02
        && bar.is_bullish()
        && f.rsi[i] > f.rsi[i - 1]
        && f.di_plus[i] > f.di_minus[i];

    if dip && !already_fired(fired, SignalKind::PullbackEntry) {
        Some(ctx.emit(SignalKind::FibBottom, level("wall_low", f.wall_low[i])))
    } else {
        None
    }
}

/// True when no *fully valid* breakout of `wall` happened within the
/// cooldown window.
///
/// Asymmetry is deliberate: the current bar only needs the raw crossover to
/// be considered, but a past crossover suppresses only if it also met the
/// volume/bullish/direction conditions at the time.
fn cooldown_clear(ctx: &RuleCtx, wall: &[f64]) -> bool {
    let f = ctx.frame;
    let p = ctx.params;

    for offset in 1..=p.cooldown {
        let Some(past) = ctx.i.checked_sub(offset) else {
            break;
        };
        if past == 0 {
            break;
        }
        let past_prev = past - 1;
        if wall[past].is_nan() || wall[past_prev].is_nan() {
            continue;
        }

        let crossed = ctx.bars[past_prev].close <= wall[past_prev]
            && ctx.bars[past].close > wall[past];
        if !crossed {
            continue;
        }

        let was_valid = ctx.volume(past) > f.avg_volume[past] * p.vol_mult
            && ctx.bars[past].is_bullish()
            && f.di_plus[past] > f.di_minus[past];
        if was_valid {
            return false;
        }
    }

    true
}

fn wall_breakout(
    ctx: &RuleCtx,
    wall: &[f64],
    wall_key: &str,
    kind: SignalKind,
) -> Option<Signal> {
    let f = ctx.frame;
    let i = ctx.i;
    let bar = ctx.bar();
    let prev = ctx.prev();

    if wall[i].is_nan() {
        return None;
    }

    let crossed = prev.close <= wall[i - 1] && bar.close > wall[i];
    let strong = ctx.volume(i) > f.avg_volume[i] * ctx.params.vol_mult
        && bar.is_bullish()
        && f.di_plus[i] > f.di_minus[i];

    if crossed && strong && cooldown_clear(ctx, wall) {
        Some(ctx.emit(kind, level(wall_key, wall[i])))
    } else {
        None
    }
}

/// Rule 5 — close breaks the 0.618 retracement level.
pub(super) fn golden_breakout(ctx: &RuleCtx) -> Option<Signal> {
    wall_breakout(
        ctx,
        &ctx.frame.wall_gold,
        "wall_gold",
        SignalKind::GoldenBreakout,
    )
}

/// Rule 6 — close breaks the rolling-maximum ceiling.
pub(super) fn resistance_breakout(ctx: &RuleCtx) -> Option<Signal> {
    wall_breakout(
        ctx,
        &ctx.frame.wall_top,
        "wall_top",
        SignalKind::ResistanceBreakout,
    )
}

/// Rule 7 — intrabar rejection at the ceiling.
///
/// Fires on the raw rejection alone: the high reaches the ceiling but the
/// close finishes below it. No volume, direction, or cooldown gating — this
/// mirrors the external alerting convention for the warning.
pub(super) fn resistance_rejection(ctx: &RuleCtx) -> Option<Signal> {
    let f = ctx.frame;
    let i = ctx.i;
    let bar = ctx.bar();

    if f.wall_top[i].is_nan() {
        return None;
    }

    if bar.high >= f.wall_top[i] && bar.close < f.wall_top[i] {
        Some(ctx.emit(
            SignalKind::ResistanceRejection,
            level("wall_top", f.wall_top[i]),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{FrameSpec, IndicatorFrame};
    use chrono::NaiveDate;

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Bar {
        Bar {
            symbol: "TEST".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn default_spec() -> FrameSpec {
        let p = TrendPulseParams::defaults();
        FrameSpec {
            ema_short_len: p.ema_short_len,
            ema_long_len: p.ema_long_len,
            rsi_period: p.rsi_period,
            adx_period: p.adx_period,
            fib_len: 50,
        }
    }

    /// Steady 1%-per-bar uptrend with wide-range bars whose lows reach into
    /// the tolerance band above the lagging long average. Rising lows keep
    /// downward directional movement at zero; the heavy-volume last bar is
    /// the canonical pullback shape.
    fn pullback_series() -> Vec<Bar> {
        let n = 70;
        let mut bars: Vec<Bar> = Vec::with_capacity(n);
        for i in 0..n {
            let close = 100.0 * 1.01_f64.powi(i as i32);
            let open = if i == 0 { close } else { bars[i - 1].close };
            let high = close * 1.005;
            let low = close * 0.80;
            let volume = if i == n - 1 { 2000 } else { 1000 };
            bars.push(bar(i, open, high, low, close, volume));
        }
        bars
    }

    fn ctx_for<'a>(
        bars: &'a [Bar],
        frame: &'a IndicatorFrame,
        params: &'a TrendPulseParams,
    ) -> RuleCtx<'a> {
        RuleCtx {
            bars,
            frame,
            params,
            i: bars.len() - 1,
        }
    }

    fn dummy_signal(kind: SignalKind) -> Signal {
        Signal {
            symbol: "TEST".into(),
            kind,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            price: 1.0,
            rsi: 50.0,
            adx: 25.0,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn last_crossovers_finds_most_recent_up() {
        // Closes relative to a flat average at 100: below, below, above,
        // above — the up-cross is at index 2, so two bars before index 4.
        let closes = [98.0, 99.0, 101.0, 102.0, 103.0];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c + 1.0, c - 1.0, c, 1000))
            .collect();
        let ema = vec![100.0; 5];
        let (up, down) = last_crossovers(&bars, &ema, 4);
        assert_eq!(up, Some(2));
        assert_eq!(down, None);
    }

    #[test]
    fn last_crossovers_tracks_both_sides() {
        // up at index 1, down at index 3.
        let closes = [98.0, 101.0, 102.0, 99.0, 98.0];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c + 1.0, c - 1.0, c, 1000))
            .collect();
        let ema = vec![100.0; 5];
        let (up, down) = last_crossovers(&bars, &ema, 4);
        assert_eq!(up, Some(3));
        assert_eq!(down, Some(1));
    }

    #[test]
    fn last_crossovers_none_when_always_above() {
        let closes = [101.0, 102.0, 103.0];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c + 1.0, c - 1.0, c, 1000))
            .collect();
        let ema = vec![100.0; 3];
        assert_eq!(last_crossovers(&bars, &ema, 2), (None, None));
    }

    #[test]
    fn pullback_fires_on_mature_uptrend_retest() {
        let bars = pullback_series();
        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        let signal = pullback_entry(&ctx, &[]);
        assert!(signal.is_some(), "expected a pullback on the deep retest");
        assert_eq!(signal.unwrap().kind, SignalKind::PullbackEntry);
    }

    #[test]
    fn pullback_suppressed_by_trend_start() {
        let bars = pullback_series();
        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        let fired = [dummy_signal(SignalKind::TrendStart)];
        assert!(pullback_entry(&ctx, &fired).is_none());
    }

    #[test]
    fn pullback_requires_volume_expansion() {
        let mut bars = pullback_series();
        let last = bars.len() - 1;
        bars[last].volume = 1000; // same as the average: below vol_mult
        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        assert!(pullback_entry(&ctx, &[]).is_none());
    }

    #[test]
    fn pullback_requires_bullish_bar() {
        let mut bars = pullback_series();
        let last = bars.len() - 1;
        bars[last].open = bars[last].close + 0.5;
        bars[last].high = bars[last].open + 0.5;
        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        assert!(pullback_entry(&ctx, &[]).is_none());
    }

    #[test]
    fn fib_bottom_suppressed_by_pullback() {
        // The suppression check runs before anything else matters: even a
        // qualifying dip stays quiet when a pullback already fired.
        let bars = pullback_series();
        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        let fired = [dummy_signal(SignalKind::PullbackEntry)];
        assert!(fib_bottom(&ctx, &fired).is_none());
    }

    #[test]
    fn rejection_ignores_direction_and_volume() {
        // Mild alternation keeps RSI defined; the last bar pokes above the
        // prior ceiling on a red candle with unremarkable volume.
        let n = 70;
        let mut bars: Vec<Bar> = (0..n)
            .map(|i| {
                let close = if i % 2 == 0 { 99.8 } else { 100.2 };
                bar(i, 100.0, close + 0.3, close - 0.3, close, 1000)
            })
            .collect();
        let last = n - 1;
        bars[last] = bar(last, 100.4, 101.5, 100.0, 100.3, 1000);

        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        let signal = resistance_rejection(&ctx);
        assert!(signal.is_some());
        let signal = signal.unwrap();
        assert_eq!(signal.kind, SignalKind::ResistanceRejection);
        assert!(signal.metadata.contains_key("wall_top"));
    }

    #[test]
    fn rejection_needs_close_below_the_wall() {
        // Same shape, but the close finishes above the ceiling: that is a
        // breakout situation, not a rejection.
        let n = 70;
        let mut bars: Vec<Bar> = (0..n)
            .map(|i| {
                let close = if i % 2 == 0 { 99.8 } else { 100.2 };
                bar(i, 100.0, close + 0.3, close - 0.3, close, 1000)
            })
            .collect();
        let last = n - 1;
        bars[last] = bar(last, 100.0, 101.5, 99.9, 101.2, 1000);

        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);

        assert!(resistance_rejection(&ctx).is_none());
    }

    #[test]
    fn signals_snapshot_price_and_oscillators() {
        let bars = pullback_series();
        let params = TrendPulseParams::defaults();
        let frame = IndicatorFrame::compute(&bars, &default_spec());
        let ctx = ctx_for(&bars, &frame, &params);
        let last = bars.len() - 1;

        let signal = pullback_entry(&ctx, &[]).unwrap();
        assert_eq!(signal.price, bars[last].close);
        assert_eq!(signal.date, bars[last].date);
        assert_eq!(signal.rsi, frame.rsi[last]);
    }
}
