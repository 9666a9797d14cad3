//! Named clustering strategies.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::traits::ClusteringStrategy;

/// Strategies available to a sweep, looked up by the name in
/// [`SweepParams::strategy`](super::SweepParams::strategy).
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn ClusteringStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, replacing any previous one with the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        strategy: Arc<dyn ClusteringStrategy>,
    ) -> &mut Self {
        let name = name.into();
        if self.strategies.insert(name.clone(), strategy).is_some() {
            tracing::debug!(strategy = %name, "replaced registered strategy");
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, strategy: Arc<dyn ClusteringStrategy>) -> Self {
        self.register(name, strategy);
        self
    }

    /// Strategy registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ClusteringStrategy>> {
        self.strategies.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}
