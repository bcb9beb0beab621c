//! Scan engine — one strategy, many instruments, one ordered signal list.
//!
//! The engine owns nothing but a reference to the registry. Instrument
//! passes are independent and stateless, so they run on the rayon pool;
//! results are joined in group order, which keeps output deterministic for
//! identical input regardless of scheduling.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{Bar, Signal, SignalKind};
use crate::strategy::params::{ParamError, ParamMap};
use crate::strategy::StrategyRegistry;

/// What to scan and how.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Registry key of the strategy to run.
    pub strategy: String,
    /// Flat overrides merged onto the strategy's defaults. Validation is
    /// atomic: one bad field rejects the whole request.
    pub overrides: ParamMap,
    /// Restrict the scan to these symbols (None = every symbol present).
    pub symbols: Option<Vec<String>>,
    /// Keep only these signal kinds (None = all kinds).
    pub kinds: Option<Vec<SignalKind>>,
}

impl ScanRequest {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("strategy '{name}' not found (available: {})", available.join(", "))]
    UnknownStrategy {
        name: String,
        available: Vec<String>,
    },
    #[error(transparent)]
    InvalidParams(#[from] ParamError),
}

/// Runs scans against a read-only registry.
pub struct ScanEngine<'a> {
    registry: &'a StrategyRegistry,
}

impl<'a> ScanEngine<'a> {
    pub fn new(registry: &'a StrategyRegistry) -> Self {
        Self { registry }
    }

    /// Run one scan over the supplied bars.
    ///
    /// Bars may arrive in any interleaving; they are grouped by symbol
    /// (first-appearance order preserved) and each group is sorted by date.
    /// A failing instrument is logged and skipped — one bad series never
    /// aborts the rest of the scan. Strategy resolution and parameter
    /// validation fail before any instrument is touched.
    pub fn run(&self, request: &ScanRequest, bars: &[Bar]) -> Result<Vec<Signal>, ScanError> {
        let strategy =
            self.registry
                .get(&request.strategy)
                .ok_or_else(|| ScanError::UnknownStrategy {
                    name: request.strategy.clone(),
                    available: self
                        .registry
                        .names()
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                })?;

        let evaluator = strategy.build(&request.overrides)?;

        let groups = group_by_symbol(bars, request.symbols.as_deref());
        debug!(
            strategy = request.strategy.as_str(),
            instruments = groups.len(),
            "scan started"
        );

        let per_instrument: Vec<Vec<Signal>> = groups
            .par_iter()
            .map(|(symbol, series)| match evaluator.evaluate(series) {
                Ok(signals) => signals,
                Err(error) => {
                    warn!(symbol = symbol.as_str(), %error, "instrument skipped");
                    Vec::new()
                }
            })
            .collect();

        let mut signals: Vec<Signal> = per_instrument.into_iter().flatten().collect();

        if let Some(kinds) = &request.kinds {
            signals.retain(|s| kinds.contains(&s.kind));
        }

        debug!(signals = signals.len(), "scan finished");
        Ok(signals)
    }
}

/// Group bars by symbol, preserving the order in which symbols first
/// appear, then sort each group by date (stable).
fn group_by_symbol(bars: &[Bar], universe: Option<&[String]>) -> Vec<(String, Vec<Bar>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Bar>> = HashMap::new();

    for bar in bars {
        if let Some(universe) = universe {
            if !universe.iter().any(|s| s == &bar.symbol) {
                continue;
            }
        }
        groups
            .entry(bar.symbol.clone())
            .or_insert_with(|| {
                order.push(bar.symbol.clone());
                Vec::new()
            })
            .push(bar.clone());
    }

    let mut result = Vec::with_capacity(order.len());
    for symbol in order {
        if let Some(mut group) = groups.remove(&symbol) {
            group.sort_by_key(|b| b.date);
            result.push((symbol, group));
        }
    }
    result
}
