//! IndicatorFrame — the bar series extended with every derived column.
//!
//! Computed once per instrument per scan so rule code can index any bar by
//! position. All columns are causal; the rolling walls are shifted one bar
//! so the current bar never sees its own high/low.

use crate::domain::Bar;
use crate::indicators::dmi::dmi;
use crate::indicators::rolling::{rolling_max, rolling_mean, rolling_min, shift};
use crate::indicators::rsi::rsi;
use crate::indicators::smoothing::ewm_span;

/// Volume is averaged over a fixed 20-bar window, independent of strategy
/// parameters.
pub const AVG_VOLUME_WINDOW: usize = 20;

/// Retracement fraction between the rolling extrema.
pub const GOLDEN_FRACTION: f64 = 0.618;

/// Window lengths the frame computation needs.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    pub ema_short_len: usize,
    pub ema_long_len: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
    pub fib_len: usize,
}

/// Derived columns for one instrument's series, index-aligned with the bars.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub ema_short: Vec<f64>,
    pub ema_long: Vec<f64>,
    pub rsi: Vec<f64>,
    /// Rolling mean of RSI over the RSI period.
    pub rsi_ma: Vec<f64>,
    pub avg_volume: Vec<f64>,
    pub di_plus: Vec<f64>,
    pub di_minus: Vec<f64>,
    pub adx: Vec<f64>,
    /// Percent change of `ema_long` vs the previous bar.
    pub ema_slope: Vec<f64>,
    /// Rolling max of high over `fib_len` bars, excluding the current bar.
    pub wall_top: Vec<f64>,
    /// Rolling min of low over `fib_len` bars, excluding the current bar.
    pub wall_low: Vec<f64>,
    pub wall_diff: Vec<f64>,
    /// `wall_low + GOLDEN_FRACTION * wall_diff`.
    pub wall_gold: Vec<f64>,
}

impl IndicatorFrame {
    pub fn compute(bars: &[Bar], spec: &FrameSpec) -> Self {
        let n = bars.len();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let ema_short = ewm_span(&closes, spec.ema_short_len);
        let ema_long = ewm_span(&closes, spec.ema_long_len);

        let rsi = rsi(&closes, spec.rsi_period);
        let rsi_ma = rolling_mean(&rsi, spec.rsi_period);

        let avg_volume = rolling_mean(&volumes, AVG_VOLUME_WINDOW);

        let directional = dmi(bars, spec.adx_period);

        let mut ema_slope = vec![f64::NAN; n];
        for i in 1..n {
            let prev = ema_long[i - 1];
            if prev.is_nan() || prev == 0.0 || ema_long[i].is_nan() {
                continue;
            }
            ema_slope[i] = (ema_long[i] - prev) / prev * 100.0;
        }

        let wall_top = shift(&rolling_max(&highs, spec.fib_len), 1);
        let wall_low = shift(&rolling_min(&lows, spec.fib_len), 1);
        let wall_diff: Vec<f64> = wall_top
            .iter()
            .zip(wall_low.iter())
            .map(|(&top, &low)| top - low)
            .collect();
        let wall_gold: Vec<f64> = wall_low
            .iter()
            .zip(wall_diff.iter())
            .map(|(&low, &diff)| low + diff * GOLDEN_FRACTION)
            .collect();

        Self {
            ema_short,
            ema_long,
            rsi,
            rsi_ma,
            avg_volume,
            di_plus: directional.di_plus,
            di_minus: directional.di_minus,
            adx: directional.adx,
            ema_slope,
            wall_top,
            wall_low,
            wall_diff,
            wall_gold,
        }
    }

    pub fn len(&self) -> usize {
        self.ema_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ema_long.is_empty()
    }
}
