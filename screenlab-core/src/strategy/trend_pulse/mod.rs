//! trend_pulse — the built-in multi-signal screen.
//!
//! Classifies the latest daily bar of an instrument into up to seven signal
//! types using moving-average structure, RSI momentum, volume behavior,
//! directional movement, and rolling retracement walls. Rules run in a
//! fixed order; later rules consult what already fired this pass, so
//! overlapping conditions resolve first-writer-wins.

mod rules;

use crate::domain::{validate_series, Bar, SeriesError, Signal};
use crate::indicators::{FrameSpec, IndicatorFrame};
use crate::strategy::params::{ParamError, ParamField, ParamKind, ParamMap, ParamSchema};
use crate::strategy::{SignalEvaluator, Strategy, MIN_HISTORY_BARS};

use rules::RuleCtx;

const FIELDS: &[ParamField] = &[
    ParamField {
        name: "pb_wait_bars",
        description: "bars an uptrend must age before a pullback counts",
        default: 3.0,
        min: 1.0,
        max: 10.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "pull_pct",
        description: "contact tolerance above the long average (%)",
        default: 2.0,
        min: 0.1,
        max: 10.0,
        kind: ParamKind::Float,
    },
    ParamField {
        name: "vol_mult",
        description: "volume multiple of the 20-bar average",
        default: 1.2,
        min: 0.5,
        max: 3.0,
        kind: ParamKind::Float,
    },
    ParamField {
        name: "rsi_min",
        description: "RSI floor for pullback entries",
        default: 45.0,
        min: 30.0,
        max: 70.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "fib_len",
        description: "retracement wall lookback (bars)",
        default: 144.0,
        min: 50.0,
        max: 250.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "cooldown",
        description: "bars a valid breakout suppresses repeats",
        default: 10.0,
        min: 5.0,
        max: 30.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "slope_th",
        description: "strong-slope threshold (% per bar)",
        default: 0.05,
        min: 0.01,
        max: 0.2,
        kind: ParamKind::Float,
    },
    ParamField {
        name: "adx_thresh",
        description: "ADX level that counts as a strong trend",
        default: 20.0,
        min: 15.0,
        max: 30.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "ema_short_len",
        description: "short EMA span",
        default: 20.0,
        min: 10.0,
        max: 50.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "ema_long_len",
        description: "long EMA span",
        default: 50.0,
        min: 30.0,
        max: 100.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "rsi_period",
        description: "RSI period",
        default: 14.0,
        min: 7.0,
        max: 21.0,
        kind: ParamKind::Integer,
    },
    ParamField {
        name: "adx_period",
        description: "DMI/ADX period",
        default: 14.0,
        min: 7.0,
        max: 21.0,
        kind: ParamKind::Integer,
    },
];

const SCHEMA: ParamSchema = ParamSchema::new(FIELDS);

/// Resolved, immutable knob set for one evaluator instance.
///
/// `slope_th` is carried from the reference parameter set for schema
/// compatibility; the pullback rule gates on slope sign only.
#[derive(Debug, Clone)]
pub struct TrendPulseParams {
    pub pb_wait_bars: usize,
    pub pull_pct: f64,
    pub vol_mult: f64,
    pub rsi_min: f64,
    pub fib_len: usize,
    pub cooldown: usize,
    pub slope_th: f64,
    pub adx_thresh: f64,
    pub ema_short_len: usize,
    pub ema_long_len: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
}

impl TrendPulseParams {
    fn from_resolved(map: &ParamMap) -> Self {
        let at = |name: &str| {
            map.get(name)
                .copied()
                .expect("field present in schema-resolved map")
        };
        Self {
            pb_wait_bars: at("pb_wait_bars") as usize,
            pull_pct: at("pull_pct"),
            vol_mult: at("vol_mult"),
            rsi_min: at("rsi_min"),
            fib_len: at("fib_len") as usize,
            cooldown: at("cooldown") as usize,
            slope_th: at("slope_th"),
            adx_thresh: at("adx_thresh"),
            ema_short_len: at("ema_short_len") as usize,
            ema_long_len: at("ema_long_len") as usize,
            rsi_period: at("rsi_period") as usize,
            adx_period: at("adx_period") as usize,
        }
    }

    pub fn defaults() -> Self {
        Self::from_resolved(&SCHEMA.defaults())
    }

    fn frame_spec(&self) -> FrameSpec {
        FrameSpec {
            ema_short_len: self.ema_short_len,
            ema_long_len: self.ema_long_len,
            rsi_period: self.rsi_period,
            adx_period: self.adx_period,
            fib_len: self.fib_len,
        }
    }
}

/// Catalog entry for the built-in screen.
pub struct TrendPulse;

impl Strategy for TrendPulse {
    fn name(&self) -> &'static str {
        "trend_pulse"
    }

    fn display_name(&self) -> &'static str {
        "Trend Pulse"
    }

    fn description(&self) -> &'static str {
        "Multi-signal daily screen: accumulation reclaims, trend starts, \
         pullback retests, floor bounces, golden-ratio and ceiling breakouts, \
         and ceiling rejections."
    }

    fn schema(&self) -> ParamSchema {
        SCHEMA
    }

    fn build(&self, overrides: &ParamMap) -> Result<Box<dyn SignalEvaluator>, ParamError> {
        let resolved = SCHEMA.resolve(overrides)?;
        Ok(Box::new(TrendPulseEvaluator {
            params: TrendPulseParams::from_resolved(&resolved),
        }))
    }
}

/// One instantiated screen with its own copy of the parameters.
pub struct TrendPulseEvaluator {
    params: TrendPulseParams,
}

impl TrendPulseEvaluator {
    pub fn new(params: TrendPulseParams) -> Self {
        Self { params }
    }
}

impl SignalEvaluator for TrendPulseEvaluator {
    fn evaluate(&self, bars: &[Bar]) -> Result<Vec<Signal>, SeriesError> {
        validate_series(bars)?;

        if bars.len() < MIN_HISTORY_BARS {
            return Ok(Vec::new());
        }

        let frame = IndicatorFrame::compute(bars, &self.params.frame_spec());
        let i = bars.len() - 1;

        // Core indicators must be defined on the bar under evaluation;
        // anything else is a defined zero-signal outcome, not an error.
        if frame.ema_long[i].is_nan()
            || frame.ema_short[i].is_nan()
            || frame.rsi[i].is_nan()
            || frame.rsi_ma[i].is_nan()
        {
            return Ok(Vec::new());
        }

        let ctx = RuleCtx {
            bars,
            frame: &frame,
            params: &self.params,
            i,
        };

        let mut signals = Vec::new();
        if let Some(s) = rules::silent_accumulation(&ctx) {
            signals.push(s);
        }
        if let Some(s) = rules::trend_start(&ctx) {
            signals.push(s);
        }
        if let Some(s) = rules::pullback_entry(&ctx, &signals) {
            signals.push(s);
        }
        if let Some(s) = rules::fib_bottom(&ctx, &signals) {
            signals.push(s);
        }
        if let Some(s) = rules::golden_breakout(&ctx) {
            signals.push(s);
        }
        if let Some(s) = rules::resistance_breakout(&ctx) {
            signals.push(s);
        }
        if let Some(s) = rules::resistance_rejection(&ctx) {
            signals.push(s);
        }

        Ok(signals)
    }
}
