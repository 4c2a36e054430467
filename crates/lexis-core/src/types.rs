/// A buffer of float PCM handed to a recognition session.
///
/// Produced by whatever capture source feeds the session, at arbitrary
/// cadence and frame count. Ownership moves into the session's input queue
/// on push.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Channel layout: `[L R L R ...]` when true, `[L.. R..]` when false.
    pub interleaved: bool,
}

impl AudioChunk {
    /// Single-channel chunk, the common case for capture taps.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
            interleaved: true,
        }
    }
}
