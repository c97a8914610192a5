//! Pitchy Audio Core
//!
//! Real-time pitch estimation and on-demand WAV extraction for live mono audio.
//!
//! ## Features
//!
//! - Autocorrelation pitch detection with volume gating
//! - Recording state machine with slice and full-session buffers
//! - One-shot resampling to 16kHz (linear, or windowed sinc via rubato)
//! - Canonical 16-bit PCM WAV encoding and `data:` URLs
//! - cpal microphone source and a host-fed push source
//!
//! ## Architecture
//!
//! ```text
//! AudioSource (cpal / push)
//!   │  FrameBlock (f32, native rate)
//!   ├─> PitchDetector ──> Hz | None
//!   │
//!   └─> CaptureBuffer (gated by Recording/Paused)
//!         ├─> slice buffer (f32) ─> SliceAssembler: pad 2s → 16kHz → i16 → WAV
//!         └─> full buffer (i16)  ─> WAV @ native rate
//! ```

pub mod buffer;
pub mod capture;
pub mod error;
pub mod pitch;
pub mod quantize;
pub mod resampler;
pub mod slice;
pub mod source;
pub mod wav;

pub use buffer::{CaptureBuffer, CaptureState, Drained};
pub use capture::{CpalSource, DeviceInfo};
pub use error::{AudioError, Result};
pub use pitch::PitchDetector;
pub use quantize::pcm16;
pub use resampler::{ResampleQuality, Resampler};
pub use slice::{AudioSlice, SliceAssembler};
pub use source::{AudioSource, BlockCallback, FrameBlock, PushHandle, PushSource};
pub use wav::WavContainer;

/// Sample rate of exported slices (16kHz)
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Default frame block size requested from sources (samples per callback)
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
