pub mod convert;
pub mod resample;

pub use convert::{SampleConverter, PCM16_SCALE};
pub use resample::{LinearResampler, Resampler};
