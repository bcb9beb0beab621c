//! Strategy abstraction — catalog entries, instantiated evaluators, and the
//! registry that maps names to implementations.
//!
//! A `Strategy` is the stateless catalog entry: metadata, a parameter
//! schema, and a constructor. `build` validates overrides against the
//! schema and returns a `SignalEvaluator` holding its own immutable copy of
//! the resolved parameters. Evaluators are `Send + Sync` so a single
//! instance can serve every scan worker.

pub mod params;
pub mod registry;
pub mod trend_pulse;

use crate::domain::{Bar, SeriesError, Signal};
use params::{ParamError, ParamMap, ParamSchema};

pub use registry::{RegistryError, StrategyInfo, StrategyRegistry};

/// Bars of history required before any signal evaluation.
///
/// The exponential computations are numerically unstable until enough
/// history accumulates; below this length the evaluator returns an empty
/// list rather than guessing.
pub const MIN_HISTORY_BARS: usize = 60;

/// An instantiated strategy, ready to classify series.
pub trait SignalEvaluator: Send + Sync {
    /// Classify the most recent bar of one instrument's series.
    ///
    /// The series must be sorted ascending by date. Insufficient history is
    /// a defined zero-signal outcome (`Ok(vec![])`); only genuine schema
    /// violations are errors.
    fn evaluate(&self, bars: &[Bar]) -> Result<Vec<Signal>, SeriesError>;
}

/// A registered strategy type.
pub trait Strategy: Send + Sync {
    /// Unique registry key (snake_case).
    fn name(&self) -> &'static str;

    /// Human-readable name for UI/CLI presentation.
    fn display_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// The declared parameter fields with bounds and defaults.
    fn schema(&self) -> ParamSchema;

    /// Validate `overrides` and construct an evaluator.
    ///
    /// Fails fast: any unknown field or out-of-range value rejects the
    /// whole override set before any scanning begins.
    fn build(&self, overrides: &ParamMap) -> Result<Box<dyn SignalEvaluator>, ParamError>;
}
