use crate::readiness::ModelReadiness;
use lexis_core::{HostConfig, LocaleDefinition};
use lexis_engine::{ModelCache, RecognizerRegistry};
use lexis_session::RecognitionSession;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Notifications about the active locale. Delivery thread is
/// adapter-defined: the calling thread for already-ready locales, the
/// staging thread otherwise; observers must not assume either.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    LocaleChanging {
        locale: String,
        recognizer: String,
        model_path: PathBuf,
    },
    LocaleChanged {
        locale: String,
        recognizer: String,
        model_path: PathBuf,
    },
    LocaleChangeFailed {
        locale: String,
        recognizer: String,
        reason: String,
    },
}

/// Callback for `make_locale_ready`: `(locale, recognizer, success)`.
pub type LocaleReadyFn = Box<dyn FnOnce(&str, &str, bool) + Send>;

type HostObserver = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// A locale entry as seen by callers.
#[derive(Debug, Clone)]
pub struct LocaleStatus {
    pub definition: LocaleDefinition,
    pub model_path: Option<PathBuf>,
    pub model_ready: bool,
}

struct LocaleSlot {
    definition: LocaleDefinition,
    model_path: Option<PathBuf>,
    model_ready: bool,
    ready_callbacks: Vec<LocaleReadyFn>,
}

impl LocaleSlot {
    fn status(&self) -> LocaleStatus {
        LocaleStatus {
            definition: self.definition.clone(),
            model_path: self.model_path.clone(),
            model_ready: self.model_ready,
        }
    }
}

struct PendingChange {
    locale: String,
    recognizer: Option<String>,
}

struct HostState {
    locales: Vec<LocaleSlot>,
    /// Indices into `locales` that resolved at startup and can be used
    available: Vec<usize>,
    selected: Option<usize>,
    changing: bool,
    /// Deferred change request, latest-wins while a change is in flight
    next_request: Option<PendingChange>,
}

/// Owns the set of known locales, drives model readiness, serializes locale
/// changes, and creates recognition sessions bound to the active locale.
///
/// Shared via `Arc`; staging completions re-enter through the same handle.
pub struct SpeechHost {
    registry: Arc<RecognizerRegistry>,
    cache: Arc<ModelCache>,
    readiness: Arc<dyn ModelReadiness>,
    state: Mutex<HostState>,
    observers: Mutex<Vec<HostObserver>>,
}

impl SpeechHost {
    /// Resolve every configured locale against the registry and the model
    /// layout, then apply the default locale if one is configured. Entries
    /// that fail to resolve stay in the table, flagged unavailable.
    pub fn new(
        config: &HostConfig,
        registry: Arc<RecognizerRegistry>,
        cache: Arc<ModelCache>,
        readiness: Arc<dyn ModelReadiness>,
    ) -> Arc<Self> {
        let mut locales = Vec::with_capacity(config.locales.len());
        let mut available = Vec::new();

        for (index, definition) in config.locales.iter().enumerate() {
            let mut slot = LocaleSlot {
                definition: definition.clone(),
                model_path: None,
                model_ready: false,
                ready_callbacks: Vec::new(),
            };

            if !registry.contains(&definition.recognizer) {
                tracing::warn!(
                    locale = %definition.locale,
                    recognizer = %definition.recognizer,
                    "skipping locale, recognizer is not registered"
                );
            } else if let Some(path) =
                readiness.model_path(&definition.recognizer, &definition.model_folder)
            {
                tracing::info!(
                    locale = %definition.locale,
                    path = %path.display(),
                    "caching locale model path"
                );
                slot.model_ready =
                    readiness.is_staged(&definition.recognizer, &definition.model_folder);
                if !slot.model_ready {
                    tracing::info!(
                        locale = %definition.locale,
                        "locale is not ready and will be staged when needed"
                    );
                }
                slot.model_path = Some(path);
                available.push(index);
            } else {
                tracing::warn!(
                    locale = %definition.locale,
                    recognizer = %definition.recognizer,
                    folder = %definition.model_folder,
                    "unable to resolve locale model folder, is the model installed under <model_root>/<recognizer>/models?"
                );
            }

            locales.push(slot);
        }

        let host = Arc::new(Self {
            registry,
            cache,
            readiness,
            state: Mutex::new(HostState {
                locales,
                available,
                selected: None,
                changing: false,
                next_request: None,
            }),
            observers: Mutex::new(Vec::new()),
        });

        if let Some(default_locale) = &config.default_locale {
            host.set_locale(default_locale, true, None);
        }

        host
    }

    pub fn subscribe(&self, observer: impl Fn(&HostEvent) + Send + Sync + 'static) {
        self.observers.lock().unwrap().push(Arc::new(observer));
    }

    pub fn available_locales(&self) -> Vec<LocaleStatus> {
        let state = self.state.lock().unwrap();
        state
            .available
            .iter()
            .map(|&index| state.locales[index].status())
            .collect()
    }

    pub fn current_locale(&self) -> Option<LocaleStatus> {
        let state = self.state.lock().unwrap();
        state.selected.map(|index| state.locales[index].status())
    }

    pub fn is_changing_locale(&self) -> bool {
        self.state.lock().unwrap().changing
    }

    pub fn has_locale_set(&self) -> bool {
        self.state.lock().unwrap().selected.is_some()
    }

    /// Find the entry for `locale`. An explicit recognizer match wins
    /// outright; otherwise the highest-priority available entry is chosen.
    pub fn locale_index(&self, locale: &str, recognizer: Option<&str>) -> Option<usize> {
        let state = self.state.lock().unwrap();
        Self::find_locale(&state, locale, recognizer)
    }

    fn find_locale(state: &HostState, locale: &str, recognizer: Option<&str>) -> Option<usize> {
        let mut selected = None;
        let mut best_priority = i32::MIN;
        for &index in &state.available {
            let definition = &state.locales[index].definition;
            if definition.locale != locale {
                continue;
            }
            if let Some(wanted) = recognizer {
                if definition.recognizer == wanted {
                    return Some(index);
                }
            }
            if selected.is_none() || definition.priority > best_priority {
                selected = Some(index);
                best_priority = definition.priority;
            }
        }
        selected
    }

    /// Switch the active locale. Returns false only for unknown/unavailable
    /// locales; a request received while another change is in flight is
    /// deferred (latest-wins) and reported as accepted.
    ///
    /// Exactly one change is in flight at a time. A request superseded
    /// before taking effect emits no `LocaleChanged` for its target.
    pub fn set_locale(self: &Arc<Self>, locale: &str, block: bool, recognizer: Option<&str>) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(index) = Self::find_locale(&state, locale, recognizer) else {
            tracing::warn!(
                locale,
                "set_locale: locale is unknown or was not set up, check earlier locale warnings"
            );
            return false;
        };

        if state.selected == Some(index) {
            tracing::info!(locale, "set_locale ignored, locale is already active");
            return true;
        }

        if state.changing {
            if state.next_request.is_some() {
                tracing::warn!(locale, "set_locale: replacing a previously queued request");
            }
            state.next_request = Some(PendingChange {
                locale: locale.to_string(),
                recognizer: recognizer.map(str::to_string),
            });
            tracing::warn!(locale, "set_locale deferred, waiting for previous change");
            return true;
        }

        state.selected = Some(index);
        state.changing = true;
        let slot = &state.locales[index];
        let locale_id = slot.definition.locale.clone();
        let recognizer_id = slot.definition.recognizer.clone();
        let model_folder = slot.definition.model_folder.clone();
        let model_path = slot.model_path.clone().unwrap_or_default();
        let ready = slot.model_ready;
        drop(state);

        tracing::info!(locale = %locale_id, "locale change requested");
        self.emit(&HostEvent::LocaleChanging {
            locale: locale_id.clone(),
            recognizer: recognizer_id.clone(),
            model_path: model_path.clone(),
        });

        if ready {
            self.emit(&HostEvent::LocaleChanged {
                locale: locale_id,
                recognizer: recognizer_id,
                model_path,
            });
            self.finish_change();
        } else {
            let host = Arc::clone(self);
            self.readiness.stage(
                &recognizer_id,
                &model_folder,
                block,
                Box::new(move |success, message| {
                    host.on_stage_complete(index, success, message)
                }),
            );
        }

        true
    }

    /// Materialize a locale's model without switching to it. The callback
    /// fires exactly once: synchronously when already ready, otherwise when
    /// the staging step completes.
    pub fn make_locale_ready(
        self: &Arc<Self>,
        locale: &str,
        callback: LocaleReadyFn,
        block: bool,
        recognizer: Option<&str>,
    ) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(index) = Self::find_locale(&state, locale, recognizer) else {
            tracing::warn!(
                locale,
                "make_locale_ready: locale is unknown or was not set up"
            );
            return false;
        };

        let slot = &mut state.locales[index];
        if slot.model_ready {
            let locale_id = slot.definition.locale.clone();
            let recognizer_id = slot.definition.recognizer.clone();
            drop(state);
            callback(&locale_id, &recognizer_id, true);
            return true;
        }

        let recognizer_id = slot.definition.recognizer.clone();
        let model_folder = slot.definition.model_folder.clone();
        slot.ready_callbacks.push(callback);
        drop(state);

        let host = Arc::clone(self);
        self.readiness.stage(
            &recognizer_id,
            &model_folder,
            block,
            Box::new(move |success, message| host.on_stage_complete(index, success, message)),
        );

        if block {
            self.state.lock().unwrap().locales[index].model_ready
        } else {
            true
        }
    }

    /// Create a started session bound to the requested locale, or to the
    /// active one when no locale is given.
    pub fn create_session(
        &self,
        locale: Option<&str>,
        recognizer: Option<&str>,
    ) -> Option<RecognitionSession> {
        let state = self.state.lock().unwrap();
        let index = match locale {
            Some(locale) => match Self::find_locale(&state, locale, recognizer) {
                Some(index) => {
                    if !state.locales[index].model_ready {
                        tracing::warn!(
                            locale,
                            "create_session: locale is not ready, call make_locale_ready first"
                        );
                        return None;
                    }
                    index
                }
                None => {
                    tracing::warn!(
                        locale,
                        "create_session: locale is unknown or was not set up"
                    );
                    return None;
                }
            },
            None => match state.selected {
                Some(index) => index,
                None => {
                    tracing::info!(
                        "create_session: no locale given and no active locale is set"
                    );
                    return None;
                }
            },
        };

        let slot = &state.locales[index];
        let locale_id = slot.definition.locale.clone();
        let recognizer_id = slot.definition.recognizer.clone();
        let Some(model_path) = slot.model_path.clone() else {
            tracing::warn!(locale = %locale_id, "create_session: locale has no resolved model path");
            return None;
        };
        drop(state);

        let recognizer = match self.registry.resolve(&recognizer_id) {
            Ok(recognizer) => recognizer,
            Err(error) => {
                tracing::warn!(%error, "create_session: recognizer unavailable");
                return None;
            }
        };

        let session = RecognitionSession::new(recognizer, Arc::clone(&self.cache));
        session.set_model(&locale_id, &model_path);
        session.start_session();
        Some(session)
    }

    fn on_stage_complete(self: &Arc<Self>, index: usize, success: bool, message: String) {
        let (callbacks, change_outcome, locale_id, recognizer_id, model_path) = {
            let mut state = self.state.lock().unwrap();
            let is_current_change = state.changing && state.selected == Some(index);
            let superseded = state.next_request.is_some();
            let slot = &mut state.locales[index];
            slot.model_ready = success;
            let callbacks = std::mem::take(&mut slot.ready_callbacks);
            let locale_id = slot.definition.locale.clone();
            let recognizer_id = slot.definition.recognizer.clone();
            let model_path = slot.model_path.clone().unwrap_or_default();
            let change_outcome = is_current_change.then_some(superseded);
            (callbacks, change_outcome, locale_id, recognizer_id, model_path)
        };

        if success {
            tracing::info!(locale = %locale_id, "model staged");
        } else {
            tracing::error!(locale = %locale_id, reason = %message, "model staging failed");
        }

        for callback in callbacks {
            callback(&locale_id, &recognizer_id, success);
        }

        if let Some(superseded) = change_outcome {
            if superseded {
                tracing::debug!(
                    locale = %locale_id,
                    "locale change superseded before taking effect, suppressing notification"
                );
            } else if success {
                self.emit(&HostEvent::LocaleChanged {
                    locale: locale_id,
                    recognizer: recognizer_id,
                    model_path,
                });
            } else {
                self.emit(&HostEvent::LocaleChangeFailed {
                    locale: locale_id,
                    recognizer: recognizer_id,
                    reason: message,
                });
            }
            self.finish_change();
        }
    }

    /// Close out the in-flight change and start any deferred request.
    fn finish_change(self: &Arc<Self>) {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.changing = false;
            state.next_request.take()
        };
        if let Some(request) = next {
            self.set_locale(&request.locale, false, request.recognizer.as_deref());
        }
    }

    fn emit(&self, event: &HostEvent) {
        let observers: Vec<HostObserver> = self.observers.lock().unwrap().to_vec();
        for observer in observers {
            observer(event);
        }
    }
}
