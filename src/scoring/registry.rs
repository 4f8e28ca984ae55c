//! Name-based scorer construction.
//!
//! The registry is an explicit value built at startup and passed to whoever
//! constructs queries; there is no process-wide table.

use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;

use crate::error::{AlignRankError, Result};
use crate::scoring::bm25::BM25Scorer;
use crate::scoring::tfidf::TfIdfScorer;
use crate::scoring::Scorer;

/// Builds a scorer from its JSON arguments.
pub type ScorerFactory = fn(&Value) -> Result<Arc<dyn Scorer>>;

/// Factory table keyed by lowercase scorer name.
#[derive(Debug, Clone)]
pub struct ScorerRegistry {
    factories: AHashMap<String, ScorerFactory>,
}

impl ScorerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ScorerRegistry {
            factories: AHashMap::new(),
        }
    }

    /// Create a registry holding the built-in scorers (`bm25`, `tfidf`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BM25Scorer::NAME, |args| {
            Ok(Arc::new(BM25Scorer::from_json(args)?) as Arc<dyn Scorer>)
        });
        registry.register(TfIdfScorer::NAME, |args| {
            Ok(Arc::new(TfIdfScorer::from_json(args)?) as Arc<dyn Scorer>)
        });
        registry
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, factory: ScorerFactory) -> Option<ScorerFactory> {
        self.factories.insert(name.to_lowercase(), factory)
    }

    /// Construct a scorer by name.
    pub fn create(&self, name: &str, args: &Value) -> Result<Arc<dyn Scorer>> {
        let factory = self.factories.get(&name.to_lowercase()).ok_or_else(|| {
            AlignRankError::invalid_config(format!("unknown scorer '{name}'"))
        })?;

        let scorer = factory(args)?;
        log::debug!("created scorer '{}' from {}", scorer.name(), args);
        Ok(scorer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ScorerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
