//! Session controller
//!
//! Ties a [`CaptureBuffer`] to an [`AudioSource`]: every delivered block is
//! appended (when recording) and handed to the pitch workers. Slices and saved
//! recordings are drained from the buffer on demand.
//!
//! Lock order is source, then buffer. The audio callback only ever takes the
//! buffer lock, and never while the controller holds it.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pitchy_audio::{
    AudioSource, AudioSlice, BlockCallback, CaptureBuffer, CaptureState, FrameBlock,
    SliceAssembler, WavContainer,
};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::dispatch::{DispatchStats, PitchDispatcher};
use crate::error::{Result, SessionError};
use crate::events::PitchEvents;
use crate::storage::Storage;

struct Runtime {
    config: SessionConfig,
    assembler: SliceAssembler,
    dispatcher: Arc<PitchDispatcher>,
}

/// A capture session
///
/// Construct with a source and a storage, [`init`](Self::init) once, then
/// drive with `start` / `pause` / `resume` / `stop`. All methods take `&self`
/// and may be called from any thread.
pub struct SessionController {
    source: Mutex<Box<dyn AudioSource>>,
    storage: Box<dyn Storage>,
    buffer: Arc<Mutex<CaptureBuffer>>,
    runtime: RwLock<Option<Runtime>>,
}

impl SessionController {
    pub fn new(source: Box<dyn AudioSource>, storage: Box<dyn Storage>) -> Self {
        Self {
            source: Mutex::new(source),
            storage,
            buffer: Arc::new(Mutex::new(CaptureBuffer::default())),
            runtime: RwLock::new(None),
        }
    }

    /// Apply `config` and start the pitch workers
    ///
    /// A second call on an initialized controller is ignored.
    pub fn init(&self, config: SessionConfig) -> Result<()> {
        let mut runtime = self.runtime.write();
        if runtime.is_some() {
            debug!("Session already initialized, ignoring init");
            return Ok(());
        }

        config.validate()?;

        let dispatcher = PitchDispatcher::new(
            config.detector(),
            config.min_volume,
            config.pitch_workers,
            config.pitch_queue_capacity,
            config.event_capacity,
        )?;

        *self.buffer.lock() = CaptureBuffer::new(config.record_full_audio);

        info!(
            "Session initialized (buffer {} samples, full audio: {}, {:?} resampling)",
            config.buffer_size, config.record_full_audio, config.resample_quality
        );

        *runtime = Some(Runtime {
            assembler: SliceAssembler::new(config.resample_quality),
            dispatcher: Arc::new(dispatcher),
            config,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.read().is_some()
    }

    /// Configuration applied by `init`
    pub fn config(&self) -> Option<SessionConfig> {
        self.runtime.read().as_ref().map(|r| r.config.clone())
    }

    /// Open the source and begin recording
    pub fn start(&self) -> Result<()> {
        let (buffer_size, dispatcher) = {
            let runtime = self.runtime.read();
            let runtime = runtime.as_ref().ok_or(SessionError::NotInitialized)?;
            (runtime.config.buffer_size, Arc::clone(&runtime.dispatcher))
        };

        let mut source = self.source.lock();
        if self.buffer.lock().is_active() {
            return Err(SessionError::AlreadyRecording);
        }

        let generation = dispatcher.generation();
        let buffer = Arc::clone(&self.buffer);
        let pitch = Arc::clone(&dispatcher);
        let on_block: BlockCallback = Arc::new(move |block: FrameBlock<'_>| {
            buffer.lock().append(block.samples);
            pitch.submit(block, generation);
        });

        let sample_rate = source.open(buffer_size, on_block)?;

        if let Err(e) = self.buffer.lock().start(sample_rate) {
            source.close();
            dispatcher.invalidate();
            return Err(e.into());
        }

        info!("Recording started at {} Hz", sample_rate);
        Ok(())
    }

    /// Close the source and discard both buffers
    ///
    /// When this returns no more blocks are appended and no pitch event from
    /// this session will be published.
    pub fn stop(&self) -> Result<()> {
        let mut source = self.source.lock();
        if !self.buffer.lock().is_active() {
            return Err(SessionError::NotRecording);
        }

        source.close();

        if let Some(runtime) = self.runtime.read().as_ref() {
            runtime.dispatcher.invalidate();
        }

        let mut buffer = self.buffer.lock();
        let frames = buffer.total_frames();
        buffer.stop()?;

        info!("Recording stopped ({} samples captured)", frames);
        Ok(())
    }

    /// Keep the source running but stop accumulating audio
    pub fn pause(&self) -> Result<()> {
        self.buffer.lock().pause()?;
        info!("Recording paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        self.buffer.lock().resume()?;
        info!("Recording resumed");
        Ok(())
    }

    /// True while a session is open, paused or not
    pub fn is_recording(&self) -> bool {
        self.buffer.lock().is_active()
    }

    pub fn state(&self) -> CaptureState {
        self.buffer.lock().state()
    }

    /// Native rate of the open session
    pub fn native_sample_rate(&self) -> Option<u32> {
        self.buffer.lock().native_sample_rate()
    }

    /// Export and clear the audio captured since the last slice
    pub fn slice(&self) -> Result<AudioSlice> {
        let assembler = self
            .runtime
            .read()
            .as_ref()
            .map(|r| r.assembler)
            .unwrap_or_default();

        Ok(assembler.slice(&self.buffer)?)
    }

    /// Encode the full-session buffer and write it to storage under `id`
    ///
    /// On failure the audio stays buffered for another attempt.
    pub fn save_recording(&self, id: &str) -> Result<PathBuf> {
        let Some(drained) = self.buffer.lock().take_full() else {
            return Err(SessionError::NoData);
        };

        let written = WavContainer::encode(&drained.samples, drained.sample_rate)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
            .and_then(|wav| self.storage.write(id, wav.as_bytes()));
        match written {
            Ok(path) => {
                debug!(
                    "Saved {} samples @ {} Hz to {}",
                    drained.samples.len(),
                    drained.sample_rate,
                    path.display()
                );
                Ok(path)
            }
            Err(e) => {
                let restored = self.buffer.lock().restore_full(drained);
                warn!("Failed to save recording {:?} (restored: {}): {}", id, restored, e);
                Err(SessionError::SaveError(e))
            }
        }
    }

    /// Consumer end of the pitch event stream (None before `init`)
    pub fn events(&self) -> Option<PitchEvents> {
        self.runtime
            .read()
            .as_ref()
            .map(|r| PitchEvents::new(r.dispatcher.subscribe()))
    }

    pub fn stats(&self) -> DispatchStats {
        self.runtime
            .read()
            .as_ref()
            .map(|r| r.dispatcher.stats())
            .unwrap_or_default()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.is_recording() {
            if let Err(e) = self.stop() {
                warn!("Failed to stop session on drop: {}", e);
            }
        }
    }
}
