pub mod engine_trait;
pub mod model_cache;
pub mod null_engine;
pub mod registry;

pub use engine_trait::{AcceptOutcome, EngineModel, EngineStream, Recognizer};
pub use model_cache::ModelCache;
pub use null_engine::NullRecognizer;
pub use registry::RecognizerRegistry;
