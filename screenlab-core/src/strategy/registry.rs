//! Name-keyed strategy catalog.
//!
//! Owned by the composition root and passed by reference into the scan
//! engine — never ambient global state. Registration happens once at
//! process start; duplicate names are a construction-time error, and the
//! registry is read-only for the duration of scans.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::trend_pulse::TrendPulse;
use super::Strategy;

/// Discovery tuple for UI/CLI presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("strategy '{0}' is already registered")]
    Duplicate(String),
}

/// Read-only after construction; shared across scan workers without locks.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<&'static str, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in strategies.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Arc::new(TrendPulse))?;
        Ok(registry)
    }

    /// Insert a strategy under its own name.
    ///
    /// A name collision is a hard error — never a silent overwrite.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Result<(), RegistryError> {
        let name = strategy.name();
        if self.entries.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.entries.insert(name, strategy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Strategy>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Discovery tuples for every registered strategy, sorted by name.
    pub fn list(&self) -> Vec<StrategyInfo> {
        self.entries
            .values()
            .map(|s| StrategyInfo {
                name: s.name(),
                display_name: s.display_name(),
                description: s.description(),
            })
            .collect()
    }
}
