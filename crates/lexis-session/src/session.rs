use lexis_audio::SampleConverter;
use lexis_core::{AudioChunk, ResultBatch, SpeechResult};
use lexis_engine::{AcceptOutcome, EngineModel, EngineStream, ModelCache, Recognizer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// How long the worker waits between iterations while no model is bound.
/// Keeps it from hammering the model cache while a locale change settles.
const MODEL_WAIT: Duration = Duration::from_millis(500);

/// Pause after an iteration that had no audio to chew on.
const IDLE_WAIT: Duration = Duration::from_millis(10);

static SESSION_SEQ: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Default)]
struct PendingModel {
    locale: Option<String>,
    path: Option<PathBuf>,
}

struct SessionShared {
    running: AtomicBool,
    listening: AtomicBool,
    params_changed: AtomicBool,
    params: Mutex<PendingModel>,
}

/// A streaming recognition session: push audio in, periodically fetch
/// results out.
///
/// The session owns a dedicated worker thread that drains the input queue,
/// drives the recognizer backend, and fills the output queue. All public
/// methods are callable from any thread; none of them block on recognition.
/// Model binding is asynchronous: `set_model` records the request and the
/// worker applies it at the top of its next iteration.
pub struct RecognitionSession {
    recognizer: Arc<dyn Recognizer>,
    cache: Arc<ModelCache>,
    shared: Arc<SessionShared>,
    input_tx: Mutex<Option<Sender<AudioChunk>>>,
    output_rx: Mutex<Option<Receiver<ResultBatch>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RecognitionSession {
    /// The recognizer identity is fixed for the session's lifetime; the
    /// bound locale/model may change any number of times while running.
    pub fn new(recognizer: Arc<dyn Recognizer>, cache: Arc<ModelCache>) -> Self {
        Self {
            recognizer,
            cache,
            shared: Arc::new(SessionShared {
                running: AtomicBool::new(false),
                listening: AtomicBool::new(false),
                params_changed: AtomicBool::new(false),
                params: Mutex::new(PendingModel::default()),
            }),
            input_tx: Mutex::new(None),
            output_rx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn recognizer_id(&self) -> &str {
        self.recognizer.id()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn should_be_listening(&self) -> bool {
        self.shared.listening.load(Ordering::SeqCst)
    }

    /// Spawn the worker thread. No-op if already running. Audio is still
    /// discarded until `start_listening` opens the gate.
    pub fn start_session(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (input_tx, input_rx) = mpsc::channel();
        let (output_tx, output_rx) = mpsc::channel();
        *self.input_tx.lock().unwrap() = Some(input_tx);
        *self.output_rx.lock().unwrap() = Some(output_rx);

        let shared = Arc::clone(&self.shared);
        let recognizer = Arc::clone(&self.recognizer);
        let cache = Arc::clone(&self.cache);
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);

        let handle = std::thread::Builder::new()
            .name(format!("lexis-session-{seq}"))
            .spawn(move || run_worker(shared, recognizer, cache, input_rx, output_tx))
            .expect("failed to spawn session worker thread");
        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Stop the worker, join it, and drain both queues, leaving the session
    /// ready to be started again. Idempotent; the only cancellation path.
    pub fn terminate_session(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().unwrap().take() {
            handle.join().expect("session worker thread panicked");
        }

        *self.input_tx.lock().unwrap() = None;
        if let Some(output_rx) = self.output_rx.lock().unwrap().take() {
            let discarded = output_rx.try_iter().count();
            if discarded > 0 {
                tracing::debug!(discarded, "dropped queued result batches on terminate");
            }
        }

        self.shared.listening.store(false, Ordering::SeqCst);
        self.shared.params_changed.store(false, Ordering::SeqCst);
    }

    /// Open the listening gate.
    ///
    /// Panics if the session is not running; that is a programming error,
    /// call `start_session` first. With `reset` the output queue is cleared
    /// and the worker rebinds its recognizer stream so recognition starts
    /// from a clean slate.
    pub fn start_listening(&self, reset: bool) {
        assert!(
            self.is_running(),
            "start_session must be called before start_listening"
        );

        if reset {
            if let Some(output_rx) = self.output_rx.lock().unwrap().as_ref() {
                let discarded = output_rx.try_iter().count();
                if discarded > 0 {
                    tracing::debug!(discarded, "cleared stale result batches on reset");
                }
            }
            self.shared.params_changed.store(true, Ordering::SeqCst);
        }
        self.shared.listening.store(true, Ordering::SeqCst);
    }

    /// Close the listening gate. The worker stays alive and flushes the
    /// in-progress utterance exactly once before going idle.
    pub fn stop_listening(&self) {
        self.shared.listening.store(false, Ordering::SeqCst);
    }

    /// Request a rebind to `locale`'s model. Callable in any state; the
    /// worker applies it on its next iteration, never synchronously.
    pub fn set_model(&self, locale: &str, path: &Path) {
        let mut params = self.shared.params.lock().unwrap();
        params.locale = Some(locale.to_string());
        params.path = Some(path.to_path_buf());
        self.shared.params_changed.store(true, Ordering::SeqCst);
    }

    /// Unbind the current model, returning the session to its waiting state.
    pub fn clear_model(&self) {
        let mut params = self.shared.params.lock().unwrap();
        params.locale = None;
        params.path = None;
        self.shared.params_changed.store(true, Ordering::SeqCst);
    }

    /// Hand a chunk to the worker. No-op unless the session is listening.
    /// Never blocks; safe to call from an audio callback thread.
    pub fn push_audio(&self, chunk: AudioChunk) {
        if !self.shared.listening.load(Ordering::SeqCst) {
            return;
        }
        if let Some(input_tx) = self.input_tx.lock().unwrap().as_ref() {
            let _ = input_tx.send(chunk);
        }
    }

    /// Drain everything currently queued, flattened in batch order. Never
    /// blocks. Intended to be polled from the consuming thread.
    pub fn fetch_results(&self) -> Vec<SpeechResult> {
        match self.output_rx.lock().unwrap().as_ref() {
            Some(output_rx) => output_rx
                .try_iter()
                .flat_map(|batch| batch.results)
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.terminate_session();
    }
}

struct BoundModel {
    locale: String,
    model: Arc<dyn EngineModel>,
}

fn run_worker(
    shared: Arc<SessionShared>,
    recognizer: Arc<dyn Recognizer>,
    cache: Arc<ModelCache>,
    input_rx: Receiver<AudioChunk>,
    output_tx: Sender<ResultBatch>,
) {
    let target_rate = recognizer.required_sample_rate();
    let mut converter = SampleConverter::new();
    let mut stream: Option<Box<dyn EngineStream>> = None;
    let mut bound: Option<BoundModel> = None;
    let mut fed_audio = false;

    while shared.running.load(Ordering::SeqCst) {
        if shared.params_changed.swap(false, Ordering::SeqCst) {
            stream = None;
            if let Some(current) = &bound {
                let pending_locale = shared.params.lock().unwrap().locale.clone();
                if pending_locale.as_deref() != Some(current.locale.as_str()) {
                    cache.dereference(&current.locale);
                    bound = None;
                }
            }
        }

        if bound.is_none() {
            let pending = shared.params.lock().unwrap().clone();
            if let (Some(locale), Some(path)) = (pending.locale, pending.path) {
                match cache.reference(recognizer.as_ref(), &locale, &path) {
                    Some(model) => bound = Some(BoundModel { locale, model }),
                    None => {
                        tracing::warn!(
                            locale = %locale,
                            path = %path.display(),
                            "unable to load model, recognition will not run until a model is set"
                        );
                        // Clear the request so the load is not retried every
                        // iteration, unless a newer set_model already landed
                        let mut params = shared.params.lock().unwrap();
                        if !shared.params_changed.load(Ordering::SeqCst) {
                            params.locale = None;
                            params.path = None;
                        }
                    }
                }
            }
        }

        if stream.is_none() {
            if let Some(current) = &bound {
                match recognizer.create_stream(&current.model, target_rate) {
                    Ok(new_stream) => stream = Some(new_stream),
                    Err(error) => {
                        tracing::error!(%error, "failed to create recognizer stream")
                    }
                }
            }
        }

        let Some(active) = stream.as_mut() else {
            // Waiting for a model to be assigned
            std::thread::sleep(MODEL_WAIT);
            continue;
        };

        let mut drained_any = false;
        while let Ok(chunk) = input_rx.try_recv() {
            drained_any = true;
            fed_audio = true;
            let samples = converter.convert(&chunk, target_rate);
            match active.accept_waveform(samples) {
                Ok(AcceptOutcome::UtteranceEnd) => {
                    enqueue_parsed(&active.final_result(), &output_tx);
                }
                Ok(AcceptOutcome::Accumulating) => {
                    enqueue_parsed(&active.partial_result(), &output_tx);
                }
                Err(error) => tracing::error!(%error, "recognizer rejected audio buffer"),
            }
        }

        if fed_audio && !shared.listening.load(Ordering::SeqCst) {
            // Listening stopped mid-utterance: flush what the recognizer has
            // accumulated so the tail of the phrase is not lost
            enqueue_parsed(&active.final_result(), &output_tx);
            fed_audio = false;
        }

        if !drained_any {
            std::thread::sleep(IDLE_WAIT);
        }
    }

    drop(stream);
    if let Some(current) = bound {
        cache.dereference(&current.locale);
    }
}

fn enqueue_parsed(payload: &str, output_tx: &Sender<ResultBatch>) {
    match ResultBatch::from_json(payload) {
        Ok(batch) if !batch.is_empty() => {
            let _ = output_tx.send(batch);
        }
        Ok(_) => {}
        Err(error) => {
            tracing::error!(%error, "dropping unparseable recognizer result");
        }
    }
}
