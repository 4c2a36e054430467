pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use config::{HostConfig, LocaleDefinition};
pub use error::{ConfigError, EngineError};
pub use result::{ResultBatch, ResultKind, ResultWord, SpeechResult, UNKNOWN_METADATA};
pub use types::AudioChunk;
