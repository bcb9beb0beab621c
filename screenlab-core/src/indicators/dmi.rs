//! Directional movement — +DI, −DI, and ADX (Wilder).
//!
//! Pipeline:
//! 1. True range: max(high-low, |high-prev_close|, |low-prev_close|)
//! 2. +DM / −DM from consecutive bars (the larger of up-move/down-move,
//!    only when positive and exceeding the other; otherwise zero)
//! 3. Wilder-smooth +DM, −DM, TR; DI = 100 * smoothed(DM) / smoothed(TR)
//! 4. DX = 100 * |+DI − −DI| / (+DI + −DI); ADX = Wilder-smoothed DX

use crate::domain::Bar;
use crate::indicators::smoothing::wilder_ewm;

/// The three directional series, aligned with the input bars.
#[derive(Debug, Clone)]
pub struct DmiSeries {
    pub di_plus: Vec<f64>,
    pub di_minus: Vec<f64>,
    pub adx: Vec<f64>,
}

/// Compute the True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let h = bars[0].high;
    let l = bars[0].low;
    tr[0] = if h.is_nan() || l.is_nan() {
        f64::NAN
    } else {
        h - l
    };

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Compute +DI, −DI, and ADX over a bar series.
///
/// Division guards yield NaN (never a panic): a zero smoothed true range
/// leaves the DI pair undefined, and a zero DI sum leaves DX undefined.
pub fn dmi(bars: &[Bar], period: usize) -> DmiSeries {
    assert!(period >= 1, "DMI period must be >= 1");

    let n = bars.len();
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];

    for i in 1..n {
        let up_move = bars[i].high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bars[i].low;
        if up_move.is_nan() || down_move.is_nan() {
            plus_dm[i] = f64::NAN;
            minus_dm[i] = f64::NAN;
            continue;
        }
        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    let atr = wilder_ewm(&true_range(bars), period);
    let smooth_plus = wilder_ewm(&plus_dm, period);
    let smooth_minus = wilder_ewm(&minus_dm, period);

    let mut di_plus = vec![f64::NAN; n];
    let mut di_minus = vec![f64::NAN; n];
    let mut dx = vec![f64::NAN; n];

    for i in 0..n {
        if atr[i].is_nan() || atr[i] == 0.0 || smooth_plus[i].is_nan() || smooth_minus[i].is_nan()
        {
            continue;
        }
        di_plus[i] = 100.0 * smooth_plus[i] / atr[i];
        di_minus[i] = 100.0 * smooth_minus[i] / atr[i];

        let di_sum = di_plus[i] + di_minus[i];
        if di_sum > 0.0 {
            dx[i] = 100.0 * (di_plus[i] - di_minus[i]).abs() / di_sum;
        }
    }

    DmiSeries {
        di_plus,
        di_minus,
        adx: wilder_ewm(&dx, period),
    }
}
