//! Signal — the engine's sole output unit.
//!
//! Signals are produced fresh on every scan and have no identity of their
//! own; the caller deduplicates against its own store using
//! (symbol, date, kind) plus whatever scoping it adds (user, strategy).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of signal types the evaluator can emit.
///
/// Wire names are stable snake_case strings used by the kind filter, the
/// CLI, and downstream persistence keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Quiet buying inside a bear structure: close reclaims the short
    /// average on stable volume.
    SilentAccumulation,
    /// Close crossed the long average one bar ago and held.
    TrendStart,
    /// Retest of the long average inside an established uptrend.
    PullbackEntry,
    /// Low touches the rolling-minimum floor and the bar recovers.
    FibBottom,
    /// Close breaks the 0.618 retracement level.
    GoldenBreakout,
    /// Close breaks the rolling-maximum ceiling.
    ResistanceBreakout,
    /// High reaches the ceiling but close is rejected below it.
    ResistanceRejection,
}

impl SignalKind {
    /// All kinds, in evaluation order.
    pub const ALL: [SignalKind; 7] = [
        SignalKind::SilentAccumulation,
        SignalKind::TrendStart,
        SignalKind::PullbackEntry,
        SignalKind::FibBottom,
        SignalKind::GoldenBreakout,
        SignalKind::ResistanceBreakout,
        SignalKind::ResistanceRejection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::SilentAccumulation => "silent_accumulation",
            SignalKind::TrendStart => "trend_start",
            SignalKind::PullbackEntry => "pullback_entry",
            SignalKind::FibBottom => "fib_bottom",
            SignalKind::GoldenBreakout => "golden_breakout",
            SignalKind::ResistanceBreakout => "resistance_breakout",
            SignalKind::ResistanceRejection => "resistance_rejection",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown signal kind '{0}'")]
pub struct SignalKindParseError(pub String);

impl FromStr for SignalKind {
    type Err = SignalKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| SignalKindParseError(s.to_string()))
    }
}

/// One detected signal on one instrument's most recent bar.
///
/// `rsi` and `adx` snapshot the oscillators at the signal bar; ADX warms up
/// slower than RSI and may still be undefined when a signal fires, so it
/// serializes as `null` in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    pub date: NaiveDate,
    /// Close price on the signal bar.
    pub price: f64,
    #[serde(with = "nullable_f64")]
    pub rsi: f64,
    #[serde(with = "nullable_f64")]
    pub adx: f64,
    /// Rule-specific context (broken level, trend note, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// NaN-aware (de)serialization: JSON has no NaN, so undefined values travel
/// as `null`.
mod nullable_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, ser: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            ser.serialize_f64(*value)
        } else {
            ser.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(de)?.unwrap_or(f64::NAN))
    }
}
