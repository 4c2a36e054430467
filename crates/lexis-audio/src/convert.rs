use crate::resample::{LinearResampler, Resampler};
use lexis_core::AudioChunk;

/// Scale applied after clamping so samples land in the signed 16-bit range
/// recognizer backends expect.
pub const PCM16_SCALE: f32 = 32767.0;

/// Converts arbitrary-channel, arbitrary-rate float PCM into the mono,
/// fixed-rate, 16-bit-range stream a recognizer consumes.
///
/// Stateless per call; the scratch buffers are kept around so a session
/// converting thousands of chunks does not reallocate on every one.
pub struct SampleConverter {
    mono: Vec<f32>,
    resampled: Vec<f32>,
    resampler: Box<dyn Resampler>,
}

impl SampleConverter {
    pub fn new() -> Self {
        Self::with_resampler(Box::new(LinearResampler))
    }

    pub fn with_resampler(resampler: Box<dyn Resampler>) -> Self {
        Self {
            mono: Vec::new(),
            resampled: Vec::new(),
            resampler,
        }
    }

    /// Reduce to mono, resample to `target_rate` if needed, clamp to [-1, 1]
    /// and scale to the 16-bit range. Each step runs only when the input
    /// actually needs it.
    ///
    /// Index arithmetic is derived from `samples.len()`, never from an
    /// assumed frame alignment, so a truncated chunk cannot read past the
    /// buffer.
    pub fn convert(&mut self, chunk: &AudioChunk, target_rate: u32) -> &[f32] {
        self.mono.clear();
        if chunk.samples.is_empty() {
            return &[];
        }

        let channels = chunk.channels.max(1) as usize;
        if channels > 1 {
            if chunk.interleaved {
                self.mono
                    .extend(chunk.samples.iter().step_by(channels).copied());
            } else {
                let first_channel = chunk.samples.len() / channels;
                self.mono.extend_from_slice(&chunk.samples[..first_channel]);
            }
        } else {
            self.mono.extend_from_slice(&chunk.samples);
        }

        let needs_resample = chunk.sample_rate != target_rate;
        if needs_resample {
            let ratio = chunk.sample_rate as f32 / target_rate as f32;
            self.resampler.process(&self.mono, ratio, &mut self.resampled);
        }

        let output = if needs_resample {
            &mut self.resampled
        } else {
            &mut self.mono
        };
        for sample in output.iter_mut() {
            *sample = PCM16_SCALE * sample.clamp(-1.0, 1.0);
        }
        output
    }
}

impl Default for SampleConverter {
    fn default() -> Self {
        Self::new()
    }
}
