//! Autocorrelation pitch estimation
//!
//! Estimates the fundamental frequency of a mono block using the normalized
//! autocorrelation over the lag band of plausible fundamentals, then refines
//! the winning lag with parabolic interpolation.
//!
//! The detector is a plain value holding only its parameters. Every call is
//! independent, so one detector can be shared freely between worker threads.

use crate::error::{AudioError, Result};

/// Lowest fundamental searched by default (Hz)
pub const DEFAULT_MIN_FREQUENCY: f32 = 50.0;

/// Highest fundamental searched by default (Hz)
pub const DEFAULT_MAX_FREQUENCY: f32 = 1000.0;

/// Minimum normalized correlation for a lag to count as periodic
pub const DEFAULT_MIN_CORRELATION: f32 = 0.5;

/// Shorter-lag peaks within this fraction of the best peak win over it
pub const DEFAULT_OCTAVE_TOLERANCE: f32 = 0.9;

/// Autocorrelation pitch detector with volume gating
///
/// # Example
///
/// ```
/// use pitchy_audio::PitchDetector;
///
/// let sample_rate = 44100.0;
/// let tone: Vec<f32> = (0..2048)
///     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate).sin() * 0.5)
///     .collect();
///
/// let pitch = PitchDetector::default().estimate(&tone, sample_rate, 0.01).unwrap();
/// assert!((pitch - 440.0).abs() < 4.4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchDetector {
    min_frequency: f32,
    max_frequency: f32,
    min_correlation: f32,
    octave_tolerance: f32,
}

impl Default for PitchDetector {
    fn default() -> Self {
        Self {
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            min_correlation: DEFAULT_MIN_CORRELATION,
            octave_tolerance: DEFAULT_OCTAVE_TOLERANCE,
        }
    }
}

impl PitchDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the band of fundamentals to search (Hz)
    pub fn frequency_range(mut self, min_frequency: f32, max_frequency: f32) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    /// Set the minimum normalized correlation a peak must exceed
    pub fn min_correlation(mut self, min_correlation: f32) -> Self {
        self.min_correlation = min_correlation;
        self
    }

    /// Set the fraction of the best peak at which a shorter lag is preferred
    pub fn octave_tolerance(mut self, octave_tolerance: f32) -> Self {
        self.octave_tolerance = octave_tolerance;
        self
    }

    pub fn min_frequency(&self) -> f32 {
        self.min_frequency
    }

    pub fn max_frequency(&self) -> f32 {
        self.max_frequency
    }

    /// Validate detector parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.min_frequency > 0.0) {
            return Err(AudioError::invalid_config("min_frequency must be positive"));
        }

        if !(self.max_frequency > self.min_frequency) {
            return Err(AudioError::invalid_config(
                "max_frequency must be greater than min_frequency",
            ));
        }

        if !(0.0..=1.0).contains(&self.min_correlation) {
            return Err(AudioError::invalid_config(
                "min_correlation must be between 0.0 and 1.0",
            ));
        }

        if !(self.octave_tolerance > 0.0 && self.octave_tolerance <= 1.0) {
            return Err(AudioError::invalid_config(
                "octave_tolerance must be in (0.0, 1.0]",
            ));
        }

        Ok(())
    }

    /// Lag band `[min_lag, max_lag]` searched for a buffer of `len` samples
    ///
    /// The upper bound is clamped to half the buffer so at least two periods
    /// are correlated; the lower bound keeps one neighbour for interpolation.
    /// Returns `None` when the band is empty.
    pub fn lag_range(&self, sample_rate: f32, len: usize) -> Option<(usize, usize)> {
        let min_lag = ((sample_rate / self.max_frequency).floor() as usize).max(2);
        let max_lag = ((sample_rate / self.min_frequency).ceil() as usize).min(len / 2);

        if min_lag >= max_lag {
            return None;
        }

        Some((min_lag, max_lag))
    }

    /// Estimate the fundamental frequency of `samples` in Hz
    ///
    /// Returns `None` when the block is quieter than `min_volume` (RMS), too
    /// short for the lag band, or not periodic enough.
    pub fn estimate(&self, samples: &[f32], sample_rate: f32, min_volume: f32) -> Option<f32> {
        if samples.is_empty() || !(sample_rate > 0.0) {
            return None;
        }

        if rms(samples) < min_volume {
            return None;
        }

        let (min_lag, max_lag) = self.lag_range(sample_rate, samples.len())?;

        // Correlation for every lag in the band plus one neighbour on each side.
        let energy = prefix_energy(samples);
        let first = min_lag - 1;
        let corr: Vec<f64> = (first..=max_lag + 1)
            .map(|lag| normalized_autocorrelation(samples, &energy, lag))
            .collect();
        let at = |lag: usize| corr[lag - first];

        let threshold = self.min_correlation as f64;
        let peaks: Vec<(usize, f64)> = (min_lag..=max_lag)
            .filter_map(|lag| {
                let r = at(lag);
                let is_peak = r > at(lag - 1) && r >= at(lag + 1);
                (is_peak && r > threshold).then_some((lag, r))
            })
            .collect();

        let best = peaks.iter().map(|&(_, r)| r).fold(f64::NEG_INFINITY, f64::max);
        let octave_floor = best * self.octave_tolerance as f64;
        let &(lag, r) = peaks.iter().find(|&&(_, r)| r >= octave_floor)?;

        let offset = parabolic_offset(at(lag - 1), r, at(lag + 1));
        let refined = lag as f64 + offset;

        Some((sample_rate as f64 / refined) as f32)
    }
}

/// Root-mean-square amplitude
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

fn prefix_energy(samples: &[f32]) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    let mut acc = 0.0f64;
    prefix.push(acc);
    for &s in samples {
        acc += s as f64 * s as f64;
        prefix.push(acc);
    }
    prefix
}

/// Correlation of the signal with itself shifted by `lag`, normalized by the
/// energy of both overlapping windows so the result lies in `[-1, 1]`.
fn normalized_autocorrelation(samples: &[f32], energy: &[f64], lag: usize) -> f64 {
    let n = samples.len();
    let overlap = n - lag;

    let cross: f64 = samples[..overlap]
        .iter()
        .zip(&samples[lag..])
        .map(|(&a, &b)| a as f64 * b as f64)
        .sum();

    let head = energy[overlap] - energy[0];
    let tail = energy[n] - energy[lag];
    let norm = (head * tail).sqrt();

    if norm <= f64::EPSILON {
        0.0
    } else {
        cross / norm
    }
}

/// Vertex offset of the parabola through three equally spaced points
fn parabolic_offset(y0: f64, y1: f64, y2: f64) -> f64 {
    let denom = y0 - 2.0 * y1 + y2;
    if denom.abs() <= f64::EPSILON {
        return 0.0;
    }
    (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
}
