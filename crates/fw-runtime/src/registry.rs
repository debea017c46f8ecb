use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::backend::Backend;
use crate::cpu::{CpuKernels, GraphBackend, WideKernels};
use crate::error::{Result, RuntimeError};

/// Constructs a fresh backend instance.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

/// Maps backend ids to factories.
///
/// Populated once at startup and then only read.
#[derive(Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the reference engines: `cpu` (f32 accumulation)
    /// and `cpu-f64` (f64 accumulation).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("cpu", || Box::new(GraphBackend::new(CpuKernels::new())));
        registry.register("cpu-f64", || Box::new(GraphBackend::new(WideKernels::new())));
        registry
    }

    /// Register `factory` under `id`, replacing any previous entry.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        let id = id.into();
        debug!(backend = %id, "registered backend");
        self.factories.insert(id, Box::new(factory));
    }

    /// Instantiate the backend registered under `id`.
    ///
    /// # Errors
    /// `UnknownBackend` listing the registered ids.
    pub fn create(&self, id: &str) -> Result<Box<dyn Backend>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| RuntimeError::UnknownBackend {
                id: id.to_string(),
                registered: self.ids().map(str::to_string).collect(),
            })?;
        Ok(factory())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = BackendRegistry::with_defaults();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["cpu", "cpu-f64"]);
        assert_eq!(registry.create("cpu").unwrap().name(), "cpu");
        assert_eq!(registry.create("cpu-f64").unwrap().name(), "cpu-f64");
    }

    #[test]
    fn test_unknown_backend() {
        let registry = BackendRegistry::with_defaults();
        match registry.create("Tensorflow") {
            Err(RuntimeError::UnknownBackend { id, registered }) => {
                assert_eq!(id, "Tensorflow");
                assert_eq!(registered, vec!["cpu".to_string(), "cpu-f64".to_string()]);
            }
            other => panic!("expected UnknownBackend, got {other:?}"),
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = BackendRegistry::new();
        assert!(!registry.contains("fast"));
        registry.register("fast", || Box::new(GraphBackend::new(WideKernels::new())));
        assert!(registry.contains("fast"));
        assert_eq!(registry.create("fast").unwrap().name(), "cpu-f64");
    }
}
