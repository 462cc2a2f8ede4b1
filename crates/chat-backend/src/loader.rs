use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::backend::ModelBackend;
use crate::config::ChatConfig;
use crate::error::{BackendError, Result};
use crate::tokenizer::Tokenizer;

/// A backend and the tokenizer that goes with it.
pub struct LoadedModel {
    pub backend: Box<dyn ModelBackend>,
    pub tokenizer: Box<dyn Tokenizer>,
}

/// Creates [`LoadedModel`]s from a model directory.
///
/// Any `Fn(&Path, &ChatConfig) -> Result<LoadedModel>` closure is a loader.
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_path: &Path, config: &ChatConfig) -> Result<LoadedModel>;
}

impl<F> ModelLoader for F
where
    F: Fn(&Path, &ChatConfig) -> Result<LoadedModel> + Send + Sync,
{
    fn load(&self, model_path: &Path, config: &ChatConfig) -> Result<LoadedModel> {
        self(model_path, config)
    }
}

/// Canonical registry key for a model identifier: `-` becomes `_`, so
/// `phiva-3.9b` and `phiva_3.9b` name the same backend.
pub fn normalize_model_id(model_id: &str) -> String {
    model_id.replace('-', "_")
}

/// Named model loaders, handed to a session at construction.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    loaders: HashMap<String, Arc<dyn ModelLoader>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `loader` under `model_id`, returning any loader it replaces.
    pub fn register(
        &mut self,
        model_id: &str,
        loader: impl ModelLoader + 'static,
    ) -> Option<Arc<dyn ModelLoader>> {
        self.loaders
            .insert(normalize_model_id(model_id), Arc::new(loader))
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, model_id: &str, loader: impl ModelLoader + 'static) -> Self {
        self.register(model_id, loader);
        self
    }

    /// Look up the loader for `model_id`.
    pub fn resolve(&self, model_id: &str) -> Result<Arc<dyn ModelLoader>> {
        self.loaders
            .get(&normalize_model_id(model_id))
            .cloned()
            .ok_or_else(|| BackendError::UnknownModel {
                name: model_id.to_string(),
                known: self.names(),
            })
    }

    /// Registered keys, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaders.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("models", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_loader(_: &Path, _: &ChatConfig) -> Result<LoadedModel> {
        Err(BackendError::Incompatible("test".to_string()))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_model_id("phiva-3.9b-q4f16"), "phiva_3.9b_q4f16");
    }

    #[test]
    fn test_resolve_normalizes() {
        let registry = BackendRegistry::new().with("imp-v1-3b", failing_loader);
        assert!(registry.resolve("imp_v1_3b").is_ok());
        assert!(registry.resolve("imp-v1-3b").is_ok());
        assert_eq!(registry.names(), vec!["imp_v1_3b".to_string()]);
    }

    #[test]
    fn test_unknown_model() {
        let registry = BackendRegistry::new().with("a", failing_loader);
        match registry.resolve("b") {
            Err(BackendError::UnknownModel { name, known }) => {
                assert_eq!(name, "b");
                assert_eq!(known, vec!["a".to_string()]);
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = BackendRegistry::new();
        assert!(registry.register("m", failing_loader).is_none());
        assert!(registry.register("m", failing_loader).is_some());
    }
}
