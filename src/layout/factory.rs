//! Name-keyed engine registry. A process-wide instance is constructed once,
//! pre-seeded with the built-in engines; custom algorithms slot in through
//! `register`.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use super::bento::BentoEngine;
use super::hierarchical::HierarchicalEngine;
use super::location::LocationEngine;
use super::subgraph::SubgraphEngine;
use super::{LayoutEngine, LayoutError};

pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn LayoutEngine>>,
}

impl EngineRegistry {
    pub fn empty() -> Self {
        Self {
            engines: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("hierarchical", Arc::new(HierarchicalEngine));
        registry.register("bento", Arc::new(BentoEngine));
        registry.register("location-based", Arc::new(LocationEngine));
        registry.register("hierarchical-v2", Arc::new(SubgraphEngine));
        registry
    }

    /// Engines are stateless across calls, so the shared instance is handed
    /// out directly rather than constructed per request.
    pub fn create(&self, name: &str) -> Result<Arc<dyn LayoutEngine>, LayoutError> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| LayoutError::UnknownEngine {
                name: name.to_string(),
                available: self.list(),
            })
    }

    pub fn register(&mut self, name: impl Into<String>, engine: Arc<dyn LayoutEngine>) {
        self.engines.insert(name.into(), engine);
    }

    pub fn list(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static REGISTRY: Lazy<RwLock<EngineRegistry>> =
    Lazy::new(|| RwLock::new(EngineRegistry::with_defaults()));

/// Look up an engine in the process-wide registry.
pub fn create_engine(name: &str) -> Result<Arc<dyn LayoutEngine>, LayoutError> {
    REGISTRY
        .read()
        .expect("engine registry lock poisoned")
        .create(name)
}

/// Register a custom engine in the process-wide registry. Re-registering a
/// name replaces the previous engine.
pub fn register_engine(name: impl Into<String>, engine: Arc<dyn LayoutEngine>) {
    REGISTRY
        .write()
        .expect("engine registry lock poisoned")
        .register(name, engine);
}

/// Names currently registered, in sorted order.
pub fn available_engines() -> Vec<String> {
    REGISTRY
        .read()
        .expect("engine registry lock poisoned")
        .list()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_engine_family() {
        let registry = EngineRegistry::with_defaults();
        assert_eq!(
            registry.list(),
            vec!["bento", "hierarchical", "hierarchical-v2", "location-based"]
        );
    }

    #[test]
    fn unknown_name_is_a_reported_error() {
        let registry = EngineRegistry::with_defaults();
        let err = registry.create("force-directed").err().unwrap();
        let message = err.to_string();
        assert!(message.contains("force-directed"));
        assert!(message.contains("hierarchical"));
    }

    #[test]
    fn registration_replaces_and_extends() {
        let mut registry = EngineRegistry::empty();
        assert!(registry.create("bento").is_err());
        registry.register("bento", Arc::new(BentoEngine));
        let engine = registry.create("bento").unwrap();
        assert_eq!(engine.name(), "bento");
    }
}
