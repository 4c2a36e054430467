use lexis_core::EngineError;
use std::path::Path;
use std::sync::Arc;

/// Opaque loaded-model handle. The backend decides what lives behind it;
/// the resource is released when the last handle drops.
pub trait EngineModel: Send + Sync {}

/// What one feed call did to the recognizer's utterance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Still mid-utterance; a partial result is available.
    Accumulating,
    /// The recognizer judged the utterance complete; fetch the final result.
    UtteranceEnd,
}

/// One streaming recognition pass over a single audio stream. Streams are
/// owned by exactly one session worker and are not shared across threads.
pub trait EngineStream: Send {
    /// Feed mono, 16-bit-range samples at the stream's fixed sample rate.
    fn accept_waveform(&mut self, samples: &[f32]) -> Result<AcceptOutcome, EngineError>;

    /// JSON payload for the in-progress utterance.
    fn partial_result(&mut self) -> String;

    /// JSON payload for the completed utterance. Resets utterance state so
    /// the stream can begin accumulating the next one.
    fn final_result(&mut self) -> String;
}

/// A pluggable speech-recognition backend: loads models and opens streams
/// bound to them.
pub trait Recognizer: Send + Sync {
    fn id(&self) -> &str;

    /// The sample rate this backend's streams consume.
    fn required_sample_rate(&self) -> u32 {
        16_000
    }

    fn load_model(&self, path: &Path) -> Result<Arc<dyn EngineModel>, EngineError>;

    fn create_stream(
        &self,
        model: &Arc<dyn EngineModel>,
        sample_rate: u32,
    ) -> Result<Box<dyn EngineStream>, EngineError>;
}
