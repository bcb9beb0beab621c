//! Relative Strength Index — Wilder smoothing of gains and losses.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), both averages smoothed with
//! alpha = 1/period. The first delta does not exist, so gains[0] and
//! losses[0] are zero; a perfectly flat window leaves 0/0 and the value is
//! undefined (NaN) rather than pinned to a midpoint.

use crate::indicators::smoothing::wilder_ewm;

/// Compute RSI over a close series. Output range is [0, 100] wherever the
/// value is defined.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");

    let n = closes.len();
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];

    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta.is_nan() {
            gains[i] = f64::NAN;
            losses[i] = f64::NAN;
        } else if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }

    let avg_gain = wilder_ewm(&gains, period);
    let avg_loss = wilder_ewm(&losses, period);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&gain, &loss)| rsi_value(gain, loss))
        .collect()
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            f64::NAN // no movement at all: momentum undefined
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
