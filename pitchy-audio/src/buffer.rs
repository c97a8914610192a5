//! Capture buffers and the recording state machine
//!
//! A [`CaptureBuffer`] owns the two accumulators of a capture session:
//!
//! - the **slice buffer**, raw `f32` samples drained by on-demand slicing
//! - the **full buffer**, quantized `i16` samples drained when the session is saved
//!
//! The buffer is not internally synchronized. Sessions wrap it in a single
//! `parking_lot::Mutex` so that appends from the audio callback, drains from
//! callers and state transitions are mutually exclusive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};
use crate::quantize::quantize_into;

/// Recording state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "idle"),
            CaptureState::Recording => write!(f, "recording"),
            CaptureState::Paused => write!(f, "paused"),
        }
    }
}

/// Samples drained from a [`CaptureBuffer`]
///
/// Remembers which session they came from so a failed export can hand them
/// back with [`CaptureBuffer::restore_slice`] / [`CaptureBuffer::restore_full`].
#[derive(Debug)]
pub struct Drained<T> {
    pub samples: Vec<T>,
    pub sample_rate: u32,
    session: u64,
}

/// Slice and full-session accumulators gated by [`CaptureState`]
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    state: CaptureState,
    record_full_audio: bool,
    native_sample_rate: Option<u32>,
    session: u64,
    slice: Vec<f32>,
    full: Vec<i16>,
    total_frames: u64,
}

impl CaptureBuffer {
    /// Create an idle buffer
    ///
    /// # Arguments
    ///
    /// * `record_full_audio` - Also keep the whole session as 16-bit PCM
    pub fn new(record_full_audio: bool) -> Self {
        Self {
            record_full_audio,
            ..Default::default()
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// True while a session is open (recording or paused)
    pub fn is_active(&self) -> bool {
        self.state != CaptureState::Idle
    }

    /// Native sample rate of the open session
    pub fn native_sample_rate(&self) -> Option<u32> {
        self.native_sample_rate
    }

    pub fn record_full_audio(&self) -> bool {
        self.record_full_audio
    }

    /// Samples appended since the session started
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn slice_len(&self) -> usize {
        self.slice.len()
    }

    pub fn full_len(&self) -> usize {
        self.full.len()
    }

    /// Open a session at `native_sample_rate` (Idle -> Recording)
    pub fn start(&mut self, native_sample_rate: u32) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(AudioError::AlreadyRecording);
        }

        if native_sample_rate == 0 {
            return Err(AudioError::invalid_config("Native sample rate cannot be zero"));
        }

        self.slice.clear();
        self.full.clear();
        self.total_frames = 0;
        self.native_sample_rate = Some(native_sample_rate);
        self.session += 1;
        self.state = CaptureState::Recording;
        Ok(())
    }

    /// Stop accumulating without closing the session (Recording -> Paused)
    ///
    /// Pausing an already paused session is a no-op.
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Idle => Err(AudioError::NotRecording),
            CaptureState::Recording | CaptureState::Paused => {
                self.state = CaptureState::Paused;
                Ok(())
            }
        }
    }

    /// Continue accumulating (Paused -> Recording)
    ///
    /// Resuming a session that is already recording is a no-op.
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Idle => Err(AudioError::NotRecording),
            CaptureState::Recording | CaptureState::Paused => {
                self.state = CaptureState::Recording;
                Ok(())
            }
        }
    }

    /// Close the session, discarding both buffers (-> Idle)
    pub fn stop(&mut self) -> Result<()> {
        if self.state == CaptureState::Idle {
            return Err(AudioError::NotRecording);
        }

        self.clear();
        self.native_sample_rate = None;
        self.session += 1;
        self.state = CaptureState::Idle;
        Ok(())
    }

    /// Discard buffered audio without changing state
    pub fn clear(&mut self) {
        self.slice.clear();
        self.full.clear();
    }

    /// Append a frame block if recording
    ///
    /// Returns `false` (and leaves both buffers untouched) while idle or paused.
    pub fn append(&mut self, samples: &[f32]) -> bool {
        if self.state != CaptureState::Recording {
            return false;
        }

        self.slice.extend_from_slice(samples);
        if self.record_full_audio {
            quantize_into(&mut self.full, samples);
        }
        self.total_frames += samples.len() as u64;
        true
    }

    /// Drain the slice buffer
    ///
    /// Returns `None` without touching anything when the buffer is empty.
    pub fn take_slice(&mut self) -> Option<Drained<f32>> {
        if self.slice.is_empty() {
            return None;
        }
        let sample_rate = self.native_sample_rate?;

        Some(Drained {
            samples: std::mem::take(&mut self.slice),
            sample_rate,
            session: self.session,
        })
    }

    /// Drain the full-session buffer
    ///
    /// Returns `None` without touching anything when the buffer is empty.
    pub fn take_full(&mut self) -> Option<Drained<i16>> {
        if self.full.is_empty() {
            return None;
        }
        let sample_rate = self.native_sample_rate?;

        Some(Drained {
            samples: std::mem::take(&mut self.full),
            sample_rate,
            session: self.session,
        })
    }

    /// Put drained slice samples back in front of anything appended since
    ///
    /// Ignored (returns `false`) if the session was stopped or restarted in between.
    pub fn restore_slice(&mut self, drained: Drained<f32>) -> bool {
        if drained.session != self.session {
            return false;
        }
        let mut samples = drained.samples;
        samples.append(&mut self.slice);
        self.slice = samples;
        true
    }

    /// Put drained PCM back in front of anything appended since
    ///
    /// Ignored (returns `false`) if the session was stopped or restarted in between.
    pub fn restore_full(&mut self, drained: Drained<i16>) -> bool {
        if drained.session != self.session {
            return false;
        }
        let mut samples = drained.samples;
        samples.append(&mut self.full);
        self.full = samples;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_state_transitions() {
        let mut buffer = CaptureBuffer::new(false);
        assert_eq!(buffer.state(), CaptureState::Idle);

        assert!(matches!(buffer.pause(), Err(AudioError::NotRecording)));
        assert!(matches!(buffer.resume(), Err(AudioError::NotRecording)));
        assert!(matches!(buffer.stop(), Err(AudioError::NotRecording)));

        buffer.start(44100).unwrap();
        assert_eq!(buffer.state(), CaptureState::Recording);
        assert_eq!(buffer.native_sample_rate(), Some(44100));

        buffer.pause().unwrap();
        assert_eq!(buffer.state(), CaptureState::Paused);
        assert!(buffer.is_active());
        buffer.pause().unwrap();
        assert_eq!(buffer.state(), CaptureState::Paused);

        buffer.resume().unwrap();
        assert_eq!(buffer.state(), CaptureState::Recording);

        buffer.stop().unwrap();
        assert_eq!(buffer.state(), CaptureState::Idle);
        assert_eq!(buffer.native_sample_rate(), None);
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let mut buffer = CaptureBuffer::new(true);
        buffer.start(48000).unwrap();
        buffer.append(&[0.1, 0.2]);

        assert!(matches!(buffer.start(16000), Err(AudioError::AlreadyRecording)));
        assert_eq!(buffer.state(), CaptureState::Recording);
        assert_eq!(buffer.native_sample_rate(), Some(48000));
        assert_eq!(buffer.slice_len(), 2);
        assert_eq!(buffer.full_len(), 2);

        buffer.pause().unwrap();
        assert!(matches!(buffer.start(16000), Err(AudioError::AlreadyRecording)));
        assert_eq!(buffer.state(), CaptureState::Paused);
    }

    #[test]
    fn test_append_is_gated_by_state() {
        let mut buffer = CaptureBuffer::new(true);
        assert!(!buffer.append(&[0.5; 8]));
        assert_eq!(buffer.slice_len(), 0);

        buffer.start(16000).unwrap();
        assert!(buffer.append(&[0.5; 8]));

        buffer.pause().unwrap();
        assert!(!buffer.append(&[0.5; 8]));
        assert_eq!(buffer.slice_len(), 8);
        assert_eq!(buffer.full_len(), 8);

        buffer.resume().unwrap();
        assert!(buffer.append(&[0.5; 4]));
        assert_eq!(buffer.slice_len(), 12);
        assert_eq!(buffer.total_frames(), 12);
    }

    #[test]
    fn test_full_buffer_is_quantized_and_optional() {
        let mut buffer = CaptureBuffer::new(true);
        buffer.start(16000).unwrap();
        buffer.append(&[1.5, -1.0, 0.0]);
        let full = buffer.take_full().unwrap();
        assert_eq!(full.samples, vec![32767, -32767, 0]);
        assert_eq!(full.sample_rate, 16000);

        let mut slice_only = CaptureBuffer::new(false);
        slice_only.start(16000).unwrap();
        slice_only.append(&[0.25; 10]);
        assert_eq!(slice_only.slice_len(), 10);
        assert_eq!(slice_only.full_len(), 0);
        assert!(slice_only.take_full().is_none());
    }

    #[test]
    fn test_take_empty_leaves_state_alone() {
        let mut buffer = CaptureBuffer::new(true);
        assert!(buffer.take_slice().is_none());
        buffer.start(22050).unwrap();
        assert!(buffer.take_slice().is_none());
        assert!(buffer.take_full().is_none());
        assert_eq!(buffer.state(), CaptureState::Recording);
    }

    #[test]
    fn test_stop_clears_everything() {
        let mut buffer = CaptureBuffer::new(true);
        buffer.start(16000).unwrap();
        buffer.append(&[0.1; 100]);
        buffer.stop().unwrap();
        assert_eq!(buffer.slice_len(), 0);
        assert_eq!(buffer.full_len(), 0);
        assert!(buffer.take_slice().is_none());
    }

    #[test]
    fn test_restore_keeps_order() {
        let mut buffer = CaptureBuffer::new(false);
        buffer.start(16000).unwrap();
        buffer.append(&[1.0, 2.0]);
        let drained = buffer.take_slice().unwrap();
        buffer.append(&[3.0]);

        assert!(buffer.restore_slice(drained));
        assert_eq!(buffer.take_slice().unwrap().samples, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_restore_after_stop_is_ignored() {
        let mut buffer = CaptureBuffer::new(true);
        buffer.start(16000).unwrap();
        buffer.append(&[0.5; 4]);
        let drained = buffer.take_full().unwrap();

        buffer.stop().unwrap();
        buffer.start(16000).unwrap();
        assert!(!buffer.restore_full(drained));
        assert_eq!(buffer.full_len(), 0);
    }

    #[test]
    fn test_concurrent_append_and_drain_accounting() {
        const BLOCKS: usize = 2000;
        const BLOCK_LEN: usize = 64;

        let buffer = Arc::new(Mutex::new(CaptureBuffer::new(false)));
        buffer.lock().start(48000).unwrap();

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for block in 0..BLOCKS {
                    let samples: Vec<f32> = (0..BLOCK_LEN)
                        .map(|i| (block * BLOCK_LEN + i) as f32)
                        .collect();
                    assert!(buffer.lock().append(&samples));
                }
            })
        };

        let mut drained: Vec<f32> = Vec::new();
        while !producer.is_finished() {
            if let Some(taken) = buffer.lock().take_slice() {
                // Blocks are never observed half-appended
                assert_eq!(taken.samples.len() % BLOCK_LEN, 0);
                drained.extend(taken.samples);
            }
        }
        producer.join().unwrap();

        if let Some(rest) = buffer.lock().take_slice() {
            drained.extend(rest.samples);
        }

        assert_eq!(drained.len(), BLOCKS * BLOCK_LEN);
        assert!(drained.iter().enumerate().all(|(i, &s)| s == i as f32));
        assert_eq!(buffer.lock().slice_len(), 0);
    }
}
