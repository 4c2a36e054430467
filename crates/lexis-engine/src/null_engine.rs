use crate::engine_trait::{AcceptOutcome, EngineModel, EngineStream, Recognizer};
use lexis_core::EngineError;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Built-in backend that recognizes nothing. It validates that a model
/// directory exists, counts the audio it is fed, and fabricates a final
/// result every `utterance_chunks` buffers. Serves the demo binary and the
/// session/cache test scenarios without a real engine.
pub struct NullRecognizer {
    utterance_chunks: usize,
}

impl NullRecognizer {
    pub fn new() -> Self {
        Self::with_utterance_chunks(3)
    }

    /// Emit a final result after every `chunks` accepted buffers.
    pub fn with_utterance_chunks(chunks: usize) -> Self {
        Self {
            utterance_chunks: chunks.max(1),
        }
    }
}

impl Default for NullRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

struct NullModel;

impl EngineModel for NullModel {}

impl Recognizer for NullRecognizer {
    fn id(&self) -> &str {
        "null"
    }

    fn load_model(&self, path: &Path) -> Result<Arc<dyn EngineModel>, EngineError> {
        if !path.is_dir() {
            return Err(EngineError::ModelLoadFailed(format!(
                "model folder does not exist: {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "null recognizer loaded model");
        Ok(Arc::new(NullModel))
    }

    fn create_stream(
        &self,
        _model: &Arc<dyn EngineModel>,
        sample_rate: u32,
    ) -> Result<Box<dyn EngineStream>, EngineError> {
        tracing::debug!(sample_rate, "opening null recognizer stream");
        Ok(Box::new(NullStream {
            utterance_chunks: self.utterance_chunks,
            fed_buffers: 0,
            fed_samples: 0,
        }))
    }
}

struct NullStream {
    utterance_chunks: usize,
    fed_buffers: usize,
    fed_samples: usize,
}

impl EngineStream for NullStream {
    fn accept_waveform(&mut self, samples: &[f32]) -> Result<AcceptOutcome, EngineError> {
        self.fed_buffers += 1;
        self.fed_samples += samples.len();
        if self.fed_buffers % self.utterance_chunks == 0 {
            Ok(AcceptOutcome::UtteranceEnd)
        } else {
            Ok(AcceptOutcome::Accumulating)
        }
    }

    fn partial_result(&mut self) -> String {
        // Nothing meaningful mid-utterance; callers drop empty sentences
        json!({ "partial": "" }).to_string()
    }

    fn final_result(&mut self) -> String {
        let payload = if self.fed_samples == 0 {
            json!({ "text": "" })
        } else {
            json!({
                "text": format!("{} samples", self.fed_samples),
                "confidence": 1.0,
            })
        };
        self.fed_buffers = 0;
        self.fed_samples = 0;
        payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_core::{ResultBatch, ResultKind};

    fn model_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_null_recognizer_id_and_rate() {
        let recognizer = NullRecognizer::new();
        assert_eq!(recognizer.id(), "null");
        assert_eq!(recognizer.required_sample_rate(), 16_000);
    }

    #[test]
    fn test_load_model_requires_directory() {
        let recognizer = NullRecognizer::new();
        let err = recognizer.load_model(Path::new("/no/such/model"));
        assert!(matches!(err, Err(EngineError::ModelLoadFailed(_))));

        let dir = model_dir();
        assert!(recognizer.load_model(dir.path()).is_ok());
    }

    #[test]
    fn test_stream_emits_final_every_n_chunks() {
        let recognizer = NullRecognizer::with_utterance_chunks(3);
        let dir = model_dir();
        let model = recognizer.load_model(dir.path()).unwrap();
        let mut stream = recognizer.create_stream(&model, 16_000).unwrap();

        assert_eq!(
            stream.accept_waveform(&[0.0; 100]).unwrap(),
            AcceptOutcome::Accumulating
        );
        assert_eq!(
            stream.accept_waveform(&[0.0; 100]).unwrap(),
            AcceptOutcome::Accumulating
        );
        assert_eq!(
            stream.accept_waveform(&[0.0; 100]).unwrap(),
            AcceptOutcome::UtteranceEnd
        );
    }

    #[test]
    fn test_final_result_reports_fed_samples_and_resets() {
        let recognizer = NullRecognizer::with_utterance_chunks(1);
        let dir = model_dir();
        let model = recognizer.load_model(dir.path()).unwrap();
        let mut stream = recognizer.create_stream(&model, 16_000).unwrap();

        stream.accept_waveform(&[0.0; 160]).unwrap();
        let batch = ResultBatch::from_json(&stream.final_result()).unwrap();
        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].kind, ResultKind::Final);
        assert_eq!(batch.results[0].sentence, "160 samples");

        // Reset: a flush with no new audio yields an empty batch
        let batch = ResultBatch::from_json(&stream.final_result()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_partial_result_parses_to_empty_batch() {
        let recognizer = NullRecognizer::new();
        let dir = model_dir();
        let model = recognizer.load_model(dir.path()).unwrap();
        let mut stream = recognizer.create_stream(&model, 16_000).unwrap();
        let batch = ResultBatch::from_json(&stream.partial_result()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_null_recognizer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullRecognizer>();
    }
}
