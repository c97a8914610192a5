//! Session configuration

use pitchy_audio::pitch::{DEFAULT_MAX_FREQUENCY, DEFAULT_MIN_CORRELATION, DEFAULT_MIN_FREQUENCY};
use pitchy_audio::{PitchDetector, ResampleQuality, DEFAULT_BUFFER_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Settings applied by [`SessionController::init`](crate::SessionController::init)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// RMS below which a block has no pitch (0.0 - 1.0)
    pub min_volume: f32,

    /// Frame block size requested from the source (samples)
    pub buffer_size: usize,

    /// Keep the whole session as 16-bit PCM for `save_recording`
    pub record_full_audio: bool,

    /// Resampling used when exporting slices
    pub resample_quality: ResampleQuality,

    /// Lowest fundamental searched (Hz)
    pub min_frequency: f32,

    /// Highest fundamental searched (Hz)
    pub max_frequency: f32,

    /// Minimum normalized autocorrelation for a pitch
    pub min_correlation: f32,

    /// Pitch worker threads
    pub pitch_workers: usize,

    /// Pending pitch jobs before blocks are skipped
    pub pitch_queue_capacity: usize,

    /// Undelivered pitch events kept before the oldest is evicted
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_volume: 0.01,
            buffer_size: DEFAULT_BUFFER_SIZE,
            record_full_audio: false,
            resample_quality: ResampleQuality::Linear,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            min_correlation: DEFAULT_MIN_CORRELATION,
            pitch_workers: 1,
            pitch_queue_capacity: 4,
            event_capacity: 32,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_volume(mut self, min_volume: f32) -> Self {
        self.min_volume = min_volume;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn record_full_audio(mut self, record_full_audio: bool) -> Self {
        self.record_full_audio = record_full_audio;
        self
    }

    pub fn resample_quality(mut self, quality: ResampleQuality) -> Self {
        self.resample_quality = quality;
        self
    }

    pub fn frequency_range(mut self, min_frequency: f32, max_frequency: f32) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    pub fn min_correlation(mut self, min_correlation: f32) -> Self {
        self.min_correlation = min_correlation;
        self
    }

    pub fn pitch_workers(mut self, workers: usize) -> Self {
        self.pitch_workers = workers;
        self
    }

    pub fn pitch_queue_capacity(mut self, capacity: usize) -> Self {
        self.pitch_queue_capacity = capacity;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Detector built from the frequency band and correlation threshold
    pub fn detector(&self) -> PitchDetector {
        PitchDetector::new()
            .frequency_range(self.min_frequency, self.max_frequency)
            .min_correlation(self.min_correlation)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_volume) {
            return Err(SessionError::invalid_config(
                "min_volume must be between 0.0 and 1.0",
            ));
        }

        if self.buffer_size == 0 {
            return Err(SessionError::invalid_config("buffer_size cannot be zero"));
        }

        if self.pitch_workers == 0 {
            return Err(SessionError::invalid_config("pitch_workers must be at least 1"));
        }

        if self.pitch_queue_capacity == 0 || self.event_capacity == 0 {
            return Err(SessionError::invalid_config(
                "pitch_queue_capacity and event_capacity must be at least 1",
            ));
        }

        self.detector().validate()?;
        Ok(())
    }
}
