use crate::engine_trait::{EngineModel, Recognizer};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

struct CacheEntry {
    model: Arc<dyn EngineModel>,
    refs: usize,
}

type LoadedListener = Box<dyn Fn(&str) + Send>;

/// Reference-counted cache of loaded models, keyed by locale id and shared
/// by every session via `Arc`.
///
/// One mutex guards the whole map, and the first load for a locale runs with
/// that mutex held. That is what makes concurrent `reference` calls for the
/// same locale serialize into exactly one backend load; callers that lose
/// the race get the already-inserted handle.
pub struct ModelCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    loaded_listeners: Mutex<Vec<LoadedListener>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            loaded_listeners: Mutex::new(Vec::new()),
        }
    }

    /// Return the model for `locale`, loading it through `recognizer` on
    /// first reference. Returns `None` when the load fails, leaving no
    /// entry behind.
    pub fn reference(
        &self,
        recognizer: &dyn Recognizer,
        locale: &str,
        path: &Path,
    ) -> Option<Arc<dyn EngineModel>> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(locale) {
            entry.refs += 1;
            return Some(Arc::clone(&entry.model));
        }

        tracing::info!(locale, path = %path.display(), "loading model");
        match recognizer.load_model(path) {
            Ok(model) => {
                entries.insert(
                    locale.to_string(),
                    CacheEntry {
                        model: Arc::clone(&model),
                        refs: 1,
                    },
                );
                drop(entries);
                self.notify_loaded(locale);
                Some(model)
            }
            Err(error) => {
                tracing::warn!(locale, %error, "model load failed");
                None
            }
        }
    }

    /// Drop one reference. At zero the entry is removed; the backend
    /// resource itself is freed once the last outstanding handle drops, so
    /// a session still holding one keeps it alive.
    pub fn dereference(&self, locale: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(locale) {
            entry.refs -= 1;
            if entry.refs == 0 {
                entries.remove(locale);
                tracing::debug!(locale, "released model");
            }
        }
    }

    /// Listeners run on whichever thread performed the load, after the
    /// cache lock is released.
    pub fn subscribe_model_loaded(&self, listener: impl Fn(&str) + Send + 'static) {
        self.loaded_listeners.lock().unwrap().push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn refcount(&self, locale: &str) -> Option<usize> {
        self.entries.lock().unwrap().get(locale).map(|e| e.refs)
    }

    fn notify_loaded(&self, locale: &str) {
        for listener in self.loaded_listeners.lock().unwrap().iter() {
            listener(locale);
        }
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_trait::{AcceptOutcome, EngineStream};
    use lexis_core::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Backend that counts loads and frees so the cache contract is provable
    struct CountingRecognizer {
        loads: AtomicUsize,
        frees: Arc<AtomicUsize>,
    }

    struct CountingModel {
        frees: Arc<AtomicUsize>,
    }

    impl EngineModel for CountingModel {}

    impl Drop for CountingModel {
        fn drop(&mut self) {
            self.frees.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingRecognizer {
        fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
                frees: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Recognizer for CountingRecognizer {
        fn id(&self) -> &str {
            "counting"
        }

        fn load_model(&self, path: &Path) -> Result<Arc<dyn EngineModel>, EngineError> {
            if path.ends_with("missing") {
                return Err(EngineError::ModelLoadFailed("missing".into()));
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingModel {
                frees: Arc::clone(&self.frees),
            }))
        }

        fn create_stream(
            &self,
            _model: &Arc<dyn EngineModel>,
            _sample_rate: u32,
        ) -> Result<Box<dyn EngineStream>, EngineError> {
            struct Silent;
            impl EngineStream for Silent {
                fn accept_waveform(
                    &mut self,
                    _samples: &[f32],
                ) -> Result<AcceptOutcome, EngineError> {
                    Ok(AcceptOutcome::Accumulating)
                }
                fn partial_result(&mut self) -> String {
                    r#"{"partial": ""}"#.to_string()
                }
                fn final_result(&mut self) -> String {
                    r#"{"text": ""}"#.to_string()
                }
            }
            Ok(Box::new(Silent))
        }
    }

    #[test]
    fn test_reference_loads_once_and_counts() {
        let cache = ModelCache::new();
        let recognizer = CountingRecognizer::new();

        let first = cache.reference(&recognizer, "en-us", Path::new("model"));
        let second = cache.reference(&recognizer, "en-us", Path::new("model"));
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(recognizer.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.refcount("en-us"), Some(2));
    }

    #[test]
    fn test_dereference_to_zero_frees_once() {
        let cache = ModelCache::new();
        let recognizer = CountingRecognizer::new();

        let a = cache.reference(&recognizer, "en-us", Path::new("model"));
        let b = cache.reference(&recognizer, "en-us", Path::new("model"));
        cache.dereference("en-us");
        assert_eq!(cache.refcount("en-us"), Some(1));
        cache.dereference("en-us");
        assert!(cache.is_empty());

        // Cache entry is gone but the handles keep the model alive
        assert_eq!(recognizer.frees.load(Ordering::SeqCst), 0);
        drop(a);
        drop(b);
        assert_eq!(recognizer.frees.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_leaves_no_entry() {
        let cache = ModelCache::new();
        let recognizer = CountingRecognizer::new();
        assert!(cache
            .reference(&recognizer, "xx-xx", Path::new("missing"))
            .is_none());
        assert!(cache.is_empty());
        assert_eq!(recognizer.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dereference_unknown_locale_is_noop() {
        let cache = ModelCache::new();
        cache.dereference("never-loaded");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_references_load_exactly_once() {
        let cache = Arc::new(ModelCache::new());
        let recognizer = Arc::new(CountingRecognizer::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let recognizer = Arc::clone(&recognizer);
            handles.push(std::thread::spawn(move || {
                cache
                    .reference(recognizer.as_ref(), "ja-jp", Path::new("model"))
                    .is_some()
            }));
        }
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(recognizer.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.refcount("ja-jp"), Some(8));

        for _ in 0..8 {
            cache.dereference("ja-jp");
        }
        assert!(cache.is_empty());
        assert_eq!(recognizer.frees.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loaded_notification_fires_on_first_load_only() {
        let cache = ModelCache::new();
        let recognizer = CountingRecognizer::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        cache.subscribe_model_loaded(move |locale| {
            sink.lock().unwrap().push(locale.to_string());
        });

        cache.reference(&recognizer, "de-de", Path::new("model"));
        cache.reference(&recognizer, "de-de", Path::new("model"));
        assert_eq!(*seen.lock().unwrap(), vec!["de-de".to_string()]);
    }
}
