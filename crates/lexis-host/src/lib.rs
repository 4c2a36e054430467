pub mod host;
pub mod readiness;

pub use host::{HostEvent, LocaleReadyFn, LocaleStatus, SpeechHost};
pub use readiness::{CopyStagedReadiness, ImmediateReadiness, ModelReadiness, ReadyFn};
