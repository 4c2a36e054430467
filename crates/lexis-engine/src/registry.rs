use crate::engine_trait::Recognizer;
use crate::null_engine::NullRecognizer;
use lexis_core::EngineError;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps recognizer identifiers to backend implementations. Populated at
/// process startup; sessions and the host resolve identifiers through it.
pub struct RecognizerRegistry {
    backends: HashMap<String, Arc<dyn Recognizer>>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            backends: HashMap::new(),
        };
        registry.register(Arc::new(NullRecognizer::new()));
        registry
    }

    /// Register under the backend's own id. A later registration under the
    /// same id replaces the earlier one.
    pub fn register(&mut self, recognizer: Arc<dyn Recognizer>) {
        self.backends
            .insert(recognizer.id().to_string(), recognizer);
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Recognizer>, EngineError> {
        self.backends
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| EngineError::RecognizerNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.backends.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
