//! One-shot sample rate conversion
//!
//! Converts a mono buffer captured at the device's native rate to the fixed
//! slice rate (16kHz). Linear interpolation is the default; a band-limited sinc
//! mode backed by rubato is available when aliasing matters more than latency.

use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

/// Interpolation used by [`Resampler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    /// Two-point linear interpolation, clamped at the buffer edges
    #[default]
    Linear,
    /// Windowed sinc interpolation (rubato)
    Sinc,
}

/// Fixed-ratio mono resampler
///
/// Carries no streaming state: every call to [`Resampler::process`] treats its
/// input as a complete signal.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    source_rate: u32,
    target_rate: u32,
    quality: ResampleQuality,
}

impl Resampler {
    /// Create new resampler
    ///
    /// # Arguments
    ///
    /// * `source_rate` - Source sample rate (e.g., 48000)
    /// * `target_rate` - Target sample rate (typically 16000)
    /// * `quality` - Interpolation mode
    pub fn new(source_rate: u32, target_rate: u32, quality: ResampleQuality) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 {
            return Err(AudioError::converter(format!(
                "Unsupported conversion {} Hz -> {} Hz: sample rate cannot be zero",
                source_rate, target_rate
            )));
        }

        Ok(Self {
            source_rate,
            target_rate,
            quality,
        })
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    pub fn quality(&self) -> ResampleQuality {
        self.quality
    }

    /// Resample audio data
    ///
    /// Returns exactly [`Resampler::expected_output_len`] samples.
    pub fn process(&self, input: &[f32]) -> Result<Vec<f32>> {
        if self.source_rate == self.target_rate {
            return Ok(input.to_vec());
        }

        if input.is_empty() {
            return Ok(Vec::new());
        }

        let expected = self.expected_output_len(input.len());
        match self.quality {
            ResampleQuality::Linear => Ok(resample_linear(
                input,
                self.source_rate,
                self.target_rate,
                expected,
            )),
            ResampleQuality::Sinc => {
                resample_sinc(input, self.source_rate, self.target_rate, expected)
            }
        }
    }

    /// Get output length for given input length
    ///
    /// `round(input_len * target_rate / source_rate)`
    pub fn expected_output_len(&self, input_len: usize) -> usize {
        if self.source_rate == self.target_rate {
            return input_len;
        }

        (input_len as f64 * self.target_rate as f64 / self.source_rate as f64).round() as usize
    }
}

fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32, output_len: usize) -> Vec<f32> {
    let last = input.len() - 1;
    let step = source_rate as f64 / target_rate as f64;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * step;
            let idx = (src_pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (src_pos - idx as f64).clamp(0.0, 1.0) as f32;
            let a = input[idx];
            let b = input[next];
            a + (b - a) * frac
        })
        .collect()
}

fn resample_sinc(input: &[f32], source_rate: u32, target_rate: u32, output_len: usize) -> Result<Vec<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // One chunk covering the whole input keeps the conversion one-shot.
    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        2.0, // max_resample_ratio_relative
        params,
        input.len(),
        1,
    )
    .map_err(|e| AudioError::converter(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&[input], None)
        .map_err(|e| AudioError::ResampleError(format!("Resampling failed: {}", e)))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail so the delayed samples come out.
    for _ in 0..2 {
        if output.len() >= delay + output_len {
            break;
        }
        let tail = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| AudioError::ResampleError(format!("Resampler flush failed: {}", e)))?;
        if let Some(channel) = tail.into_iter().next() {
            output.extend_from_slice(&channel);
        }
    }

    output.drain(..delay.min(output.len()));
    output.resize(output_len, 0.0);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_no_resampling_needed() {
        let resampler = Resampler::new(16000, 16000, ResampleQuality::Linear).unwrap();
        let input = vec![0.5, 0.3, 0.1, -0.2];
        let output = resampler.process(&input).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_output_length_is_rounded() {
        let resampler = Resampler::new(44100, 16000, ResampleQuality::Linear).unwrap();
        // 88200 * 16000 / 44100 = 32000 exactly
        assert_eq!(resampler.expected_output_len(88200), 32000);
        // 1000 * 16000 / 44100 = 362.81 -> 363
        assert_eq!(resampler.expected_output_len(1000), 363);
        assert_eq!(resampler.process(&vec![0.1; 1000]).unwrap().len(), 363);
    }

    #[test]
    fn test_linear_interpolates_between_neighbours() {
        // 8kHz -> 16kHz: every other output sample sits halfway between inputs
        let resampler = Resampler::new(8000, 16000, ResampleQuality::Linear).unwrap();
        let output = resampler.process(&[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(output.len(), 6);
        assert_abs_diff_eq!(output[0], 0.0);
        assert_abs_diff_eq!(output[1], 0.5);
        assert_abs_diff_eq!(output[2], 1.0);
        assert_abs_diff_eq!(output[3], 0.5);
        assert_abs_diff_eq!(output[4], 0.0);
        // Past the last input sample the edge value is held
        assert_abs_diff_eq!(output[5], 0.0);
    }

    #[test]
    fn test_linear_downsample_picks_source_positions() {
        // 48kHz -> 16kHz maps output i to input 3*i
        let resampler = Resampler::new(48000, 16000, ResampleQuality::Linear).unwrap();
        let input: Vec<f32> = (0..48).map(|i| i as f32).collect();
        let output = resampler.process(&input).unwrap();
        assert_eq!(output.len(), 16);
        for (i, sample) in output.iter().enumerate() {
            assert_abs_diff_eq!(*sample, (3 * i) as f32);
        }
    }

    #[test]
    fn test_zero_input_stays_zero() {
        let resampler = Resampler::new(44100, 16000, ResampleQuality::Linear).unwrap();
        let output = resampler.process(&vec![0.0; 88200]).unwrap();
        assert_eq!(output.len(), 32000);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_sinc_resampling_48k_to_16k() {
        let resampler = Resampler::new(48000, 16000, ResampleQuality::Sinc).unwrap();

        // 100ms of a 440Hz tone at 48kHz
        let input: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48000.0).sin() * 0.5)
            .collect();

        let output = resampler.process(&input).unwrap();
        assert_eq!(output.len(), 1600);

        // Energy survives the conversion (tone is well below the cutoff)
        let rms = |s: &[f32]| (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt();
        let inner = &output[200..1400];
        assert!((rms(inner) - 0.3535).abs() < 0.05, "rms = {}", rms(inner));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Resampler::new(0, 16000, ResampleQuality::Linear),
            Err(AudioError::ConverterError(_))
        ));
        assert!(Resampler::new(48000, 0, ResampleQuality::Sinc).is_err());
    }
}
