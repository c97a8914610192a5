//! Audio source abstraction
//!
//! A session never talks to an audio API directly. It opens an [`AudioSource`]
//! with a block callback and receives mono `f32` frame blocks on whatever
//! thread the source delivers them from.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{AudioError, Result};

/// One block of mono samples delivered by a source
#[derive(Debug, Clone, Copy)]
pub struct FrameBlock<'a> {
    /// Samples in `[-1.0, 1.0]`, oldest first
    pub samples: &'a [f32],
    /// Rate the source is running at (Hz)
    pub sample_rate: u32,
}

/// Callback invoked for every delivered block
///
/// Runs on the source's delivery thread, which may be real-time: it must not
/// block for long.
pub type BlockCallback = Arc<dyn Fn(FrameBlock<'_>) + Send + Sync>;

/// A live mono audio input
pub trait AudioSource: Send {
    /// Start delivering blocks of roughly `buffer_size` samples to `on_block`
    ///
    /// Returns the native sample rate of the stream.
    fn open(&mut self, buffer_size: usize, on_block: BlockCallback) -> Result<u32>;

    /// Stop delivery
    ///
    /// When this returns, `on_block` is not running and will not be called again.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

struct PushState {
    buffer_size: usize,
    on_block: BlockCallback,
}

/// Source fed by the host through a [`PushHandle`]
///
/// For hosts whose audio API already delivers frames through its own
/// callbacks, and for driving sessions deterministically in tests.
pub struct PushSource {
    sample_rate: u32,
    state: Arc<Mutex<Option<PushState>>>,
}

impl PushSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle used to push samples into this source
    pub fn handle(&self) -> PushHandle {
        PushHandle {
            sample_rate: self.sample_rate,
            state: Arc::clone(&self.state),
        }
    }
}

impl AudioSource for PushSource {
    fn open(&mut self, buffer_size: usize, on_block: BlockCallback) -> Result<u32> {
        if buffer_size == 0 {
            return Err(AudioError::invalid_config("Buffer size cannot be zero"));
        }

        let mut state = self.state.lock();
        if state.is_some() {
            return Err(AudioError::stream("Push source is already open"));
        }

        *state = Some(PushState {
            buffer_size,
            on_block,
        });
        Ok(self.sample_rate)
    }

    fn close(&mut self) {
        // Waits for an in-flight push to finish delivering
        self.state.lock().take();
    }

    fn is_open(&self) -> bool {
        self.state.lock().is_some()
    }
}

/// Producer side of a [`PushSource`]
#[derive(Clone)]
pub struct PushHandle {
    sample_rate: u32,
    state: Arc<Mutex<Option<PushState>>>,
}

impl PushHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Deliver `samples` as blocks of the size the source was opened with
    ///
    /// Returns `false` if the source is closed; nothing is delivered then.
    pub fn push(&self, samples: &[f32]) -> bool {
        let state = self.state.lock();
        let Some(state) = state.as_ref() else {
            return false;
        };

        for chunk in samples.chunks(state.buffer_size) {
            (state.on_block)(FrameBlock {
                samples: chunk,
                sample_rate: self.sample_rate,
            });
        }
        true
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(blocks: Arc<AtomicUsize>, samples: Arc<AtomicUsize>) -> BlockCallback {
        Arc::new(move |block: FrameBlock<'_>| {
            assert_eq!(block.sample_rate, 22050);
            blocks.fetch_add(1, Ordering::SeqCst);
            samples.fetch_add(block.samples.len(), Ordering::SeqCst);
        })
    }

    #[test]
    fn test_push_splits_into_blocks() {
        let blocks = Arc::new(AtomicUsize::new(0));
        let samples = Arc::new(AtomicUsize::new(0));

        let mut source = PushSource::new(22050);
        let handle = source.handle();
        assert!(!handle.push(&[0.0; 10]));

        let rate = source
            .open(256, counting_callback(blocks.clone(), samples.clone()))
            .unwrap();
        assert_eq!(rate, 22050);
        assert!(source.is_open());

        assert!(handle.push(&[0.0; 1000]));
        assert_eq!(blocks.load(Ordering::SeqCst), 4); // 256 * 3 + 232
        assert_eq!(samples.load(Ordering::SeqCst), 1000);

        source.close();
        assert!(!handle.is_open());
        assert!(!handle.push(&[0.0; 10]));
        assert_eq!(samples.load(Ordering::SeqCst), 1000);
    }

    #[test]
    fn test_double_open_is_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut source = PushSource::new(22050);
        source
            .open(64, counting_callback(counter.clone(), counter.clone()))
            .unwrap();
        assert!(source
            .open(64, counting_callback(counter.clone(), counter.clone()))
            .is_err());
        assert!(matches!(
            PushSource::new(22050).open(0, counting_callback(counter.clone(), counter)),
            Err(AudioError::InvalidConfig(_))
        ));
    }
}
