//! On-demand slice export
//!
//! Turns the recent contents of a slice buffer into a fixed-format WAV:
//! left-pad to at least two seconds, resample to 16kHz, quantize, encode.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::buffer::CaptureBuffer;
use crate::error::Result;
use crate::quantize::quantize;
use crate::resampler::{ResampleQuality, Resampler};
use crate::wav::WavContainer;
use crate::TARGET_SAMPLE_RATE;

/// Slices shorter than this are left-padded with silence (seconds)
pub const MIN_SLICE_SECONDS: f64 = 2.0;

/// A materialized slice
///
/// Serializes as `{"audio": "data:audio/wav;base64,...", "duration": <ms>}`;
/// an empty slice is `{"audio": "", "duration": 0.0}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioSlice {
    /// WAV data URL, or empty when nothing was buffered
    pub audio: String,
    /// Duration of the encoded audio in milliseconds
    pub duration: f64,
    /// Encoded WAV file
    #[serde(skip)]
    pub wav: Option<WavContainer>,
    /// Raw samples drained from the slice buffer (before padding)
    #[serde(skip)]
    pub source_samples: usize,
}

impl AudioSlice {
    pub fn is_empty(&self) -> bool {
        self.wav.is_none()
    }
}

/// Builds [`AudioSlice`]s from drained slice buffers
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceAssembler {
    quality: ResampleQuality,
}

impl SliceAssembler {
    pub fn new(quality: ResampleQuality) -> Self {
        Self { quality }
    }

    /// Drain `buffer` and assemble its contents
    ///
    /// The lock is held only while the buffer is taken, never during
    /// resampling. If assembly fails the samples are put back in front of
    /// anything captured meanwhile.
    pub fn slice(&self, buffer: &Mutex<CaptureBuffer>) -> Result<AudioSlice> {
        let Some(drained) = buffer.lock().take_slice() else {
            return Ok(AudioSlice::default());
        };

        match self.assemble(&drained.samples, drained.sample_rate) {
            Ok(slice) => Ok(slice),
            Err(e) => {
                let restored = buffer.lock().restore_slice(drained);
                debug!("Slice assembly failed (restored: {}): {}", restored, e);
                Err(e)
            }
        }
    }

    /// Pad, resample, quantize and encode `samples` captured at `native_rate`
    pub fn assemble(&self, samples: &[f32], native_rate: u32) -> Result<AudioSlice> {
        if samples.is_empty() {
            return Ok(AudioSlice::default());
        }

        let padded = pad_to_min_duration(samples, native_rate);
        let resampler = Resampler::new(native_rate, TARGET_SAMPLE_RATE, self.quality)?;
        let resampled = resampler.process(&padded)?;
        let pcm = quantize(&resampled);
        let wav = WavContainer::encode(&pcm, TARGET_SAMPLE_RATE)?;
        let duration = resampled.len() as f64 / TARGET_SAMPLE_RATE as f64 * 1000.0;

        debug!(
            "Assembled slice: {} samples @ {} Hz -> {} samples @ {} Hz ({:.1} ms)",
            samples.len(),
            native_rate,
            resampled.len(),
            TARGET_SAMPLE_RATE,
            duration
        );

        Ok(AudioSlice {
            audio: wav.to_data_url(),
            duration,
            wav: Some(wav),
            source_samples: samples.len(),
        })
    }
}

/// Number of samples in [`MIN_SLICE_SECONDS`] at `sample_rate`
pub fn min_slice_len(sample_rate: u32) -> usize {
    (MIN_SLICE_SECONDS * sample_rate as f64).ceil() as usize
}

/// Left-pad with zeros up to [`MIN_SLICE_SECONDS`]
///
/// The most recent audio stays at the end. Buffers that are already long
/// enough are returned unchanged.
pub fn pad_to_min_duration(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let required = min_slice_len(sample_rate);
    if samples.len() >= required {
        return samples.to_vec();
    }

    let mut padded = vec![0.0; required - samples.len()];
    padded.extend_from_slice(samples);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use crate::wav::WAV_HEADER_LEN;
    use approx::assert_relative_eq;

    #[test]
    fn test_padding_keeps_recent_audio_last() {
        let samples: Vec<f32> = (1..=100).map(|i| i as f32 / 100.0).collect();
        let padded = pad_to_min_duration(&samples, 8000);

        assert_eq!(padded.len(), 16000);
        assert!(padded[..15900].iter().all(|&s| s == 0.0));
        assert_eq!(&padded[15900..], samples.as_slice());
    }

    #[test]
    fn test_min_slice_len() {
        assert_eq!(min_slice_len(44100), 88200);
        assert_eq!(min_slice_len(11025), 22050);
        assert_eq!(min_slice_len(16000), 32000);
    }

    #[test]
    fn test_long_buffers_are_not_padded() {
        let samples = vec![0.25; 40000];
        assert_eq!(pad_to_min_duration(&samples, 16000), samples);
    }

    #[test]
    fn test_short_slice_is_two_seconds() {
        let assembler = SliceAssembler::default();
        let slice = assembler.assemble(&[0.0; 1000], 44100).unwrap();

        assert_eq!(slice.source_samples, 1000);
        assert_relative_eq!(slice.duration, 2000.0);
        let wav = slice.wav.as_ref().unwrap();
        assert_eq!(wav.sample_rate(), TARGET_SAMPLE_RATE);
        assert_eq!(wav.sample_count(), 32000);
        assert!(wav.as_bytes()[WAV_HEADER_LEN..].iter().all(|&b| b == 0));
        assert!(slice.audio.starts_with("data:audio/wav;base64,"));
    }

    #[test]
    fn test_long_slice_keeps_its_duration() {
        let assembler = SliceAssembler::default();
        let slice = assembler.assemble(&vec![0.1; 144000], 48000).unwrap();
        assert_eq!(slice.wav.as_ref().unwrap().sample_count(), 48000);
        assert_relative_eq!(slice.duration, 3000.0);
    }

    #[test]
    fn test_empty_slice_serializes_empty() {
        let slice = SliceAssembler::default().assemble(&[], 44100).unwrap();
        assert!(slice.is_empty());
        assert_eq!(slice.duration, 0.0);
        let json = serde_json::to_value(&slice).unwrap();
        assert_eq!(json, serde_json::json!({ "audio": "", "duration": 0.0 }));
    }

    #[test]
    fn test_slice_drains_buffer() {
        let buffer = Mutex::new(CaptureBuffer::new(false));
        buffer.lock().start(16000).unwrap();
        buffer.lock().append(&[0.5; 1600]);

        let slice = SliceAssembler::default().slice(&buffer).unwrap();
        assert_eq!(slice.source_samples, 1600);
        assert_eq!(slice.wav.unwrap().sample_count(), 32000);
        assert_eq!(buffer.lock().slice_len(), 0);

        let again = SliceAssembler::default().slice(&buffer).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_zero_rate_is_converter_error() {
        let assembler = SliceAssembler::default();
        assert!(matches!(
            assembler.assemble(&[0.1; 10], 0),
            Err(AudioError::ConverterError(_))
        ));
    }
}
