//! Strategy registry
//!
//! Name to strategy bookkeeping with a settable default. Mutated only while
//! the service is being assembled; shared read-only behind an `Arc` while
//! serving requests.

use crate::error::{ForecastError, Result};
use crate::strategy::Strategy;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of warming up one strategy
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub name: String,
    pub result: Result<()>,
    pub elapsed_ms: u128,
}

/// Registry of named prediction strategies
#[derive(Default)]
pub struct StrategyRegistry {
    entries: Vec<(String, Arc<dyn Strategy>)>,
    default_name: Option<String>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy; an existing name is replaced in place
    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn Strategy>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = strategy,
            None => self.entries.push((name, strategy)),
        }
    }

    /// Resolve a strategy by name, or the default when no name is given.
    /// Does not load the strategy.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn Strategy>> {
        let name = match name.or(self.default_name.as_deref()) {
            Some(n) => n,
            None => return Err(ForecastError::NotConfigured),
        };

        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
            .ok_or_else(|| self.unknown(name))
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(self.unknown(name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Registered names in registration order
    pub fn list_all(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Strategy>)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Load every registered strategy. A failing strategy is reported and
    /// does not stop the others.
    pub fn load_all(&self) -> Vec<LoadReport> {
        self.entries
            .iter()
            .map(|(name, strategy)| {
                let start = Instant::now();
                let result = strategy.load();
                let elapsed_ms = start.elapsed().as_millis();
                match &result {
                    Ok(()) => info!(strategy = %name, elapsed_ms, "Strategy loaded"),
                    Err(e) => warn!(strategy = %name, error = %e, "Strategy failed to load"),
                }
                LoadReport {
                    name: name.clone(),
                    result,
                    elapsed_ms,
                }
            })
            .collect()
    }

    fn unknown(&self, name: &str) -> ForecastError {
        ForecastError::not_found_among(format!("Strategy '{}'", name), self.list_all())
    }
}
