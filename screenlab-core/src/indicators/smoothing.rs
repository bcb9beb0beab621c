//! Exponential smoothing primitives.
//!
//! Recursive: out[t] = alpha * x[t] + (1 - alpha) * out[t-1].
//! Seed: the first finite input value (reference `adjust=False` semantics —
//! no SMA warm-up). Leading NaNs stay NaN; a NaN after the seed produces a
//! NaN output at that position without disturbing the running state.

/// Smooth a series with an explicit alpha in (0, 1].
pub fn ewm_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    assert!(
        alpha > 0.0 && alpha <= 1.0,
        "smoothing factor must be in (0, 1]"
    );

    let mut result = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        let next = match state {
            None => v,
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
        };
        result[i] = next;
        state = Some(next);
    }

    result
}

/// Span-parameterized smoothing: alpha = 2 / (span + 1).
///
/// This is the classic EMA used for the short/long moving averages.
pub fn ewm_span(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "EMA span must be >= 1");
    ewm_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// Wilder smoothing: alpha = 1 / period.
///
/// The single smoothing formula shared by RSI, the directional values, and
/// ADX — they must all use it to match the reference bit-for-bit.
pub fn wilder_ewm(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "Wilder period must be >= 1");
    ewm_alpha(values, 1.0 / period as f64)
}
