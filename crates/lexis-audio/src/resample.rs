/// Sample-rate conversion seam. `ratio` is input rate over output rate, so
/// downsampling 48 kHz to 16 kHz runs at ratio 3.0.
pub trait Resampler: Send {
    fn process(&mut self, input: &[f32], ratio: f32, output: &mut Vec<f32>);
}

/// Linear-interpolation resampler. Good enough for speech models, which
/// band-limit aggressively anyway; swap in something sharper via the trait
/// if a backend needs it.
#[derive(Debug, Default)]
pub struct LinearResampler;

impl Resampler for LinearResampler {
    fn process(&mut self, input: &[f32], ratio: f32, output: &mut Vec<f32>) {
        output.clear();
        if input.is_empty() || ratio <= 0.0 {
            return;
        }
        if ratio == 1.0 {
            output.extend_from_slice(input);
            return;
        }

        let output_len = (input.len() as f32 / ratio) as usize;
        output.reserve(output_len);
        for index in 0..output_len {
            let source = index as f32 * ratio;
            let base = source as usize;
            let frac = source - base as f32;
            if base + 1 < input.len() {
                output.push(input[base] * (1.0 - frac) + input[base + 1] * frac);
            } else if base < input.len() {
                output.push(input[base]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_ratio_is_copy() {
        let mut resampler = LinearResampler;
        let input = vec![0.1, 0.2, 0.3, 0.4];
        let mut output = Vec::new();
        resampler.process(&input, 1.0, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn test_downsample_halves_length() {
        let mut resampler = LinearResampler;
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut output = Vec::new();
        resampler.process(&input, 2.0, &mut output);
        assert_eq!(output.len(), 50);
        // A ramp stays a ramp under linear interpolation
        assert_eq!(output[0], 0.0);
        assert_eq!(output[10], 20.0);
    }

    #[test]
    fn test_upsample_interpolates() {
        let mut resampler = LinearResampler;
        let input = vec![0.0, 1.0];
        let mut output = Vec::new();
        resampler.process(&input, 0.5, &mut output);
        assert_eq!(output.len(), 4);
        assert!((output[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input_empty_output() {
        let mut resampler = LinearResampler;
        let mut output = vec![9.0];
        resampler.process(&[], 2.0, &mut output);
        assert!(output.is_empty());
    }

    #[test]
    fn test_nonpositive_ratio_yields_nothing() {
        let mut resampler = LinearResampler;
        let mut output = Vec::new();
        resampler.process(&[1.0, 2.0], 0.0, &mut output);
        assert!(output.is_empty());
    }
}
