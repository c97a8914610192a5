//! Microphone input with cpal
//!
//! [`CpalSource`] implements [`AudioSource`] on top of the default cpal host.
//! The `cpal::Stream` lives on its own thread for its whole life, so the
//! source itself can be moved between threads and closed from anywhere.

use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{AudioError, Result};
use crate::source::{AudioSource, BlockCallback, FrameBlock};

/// Audio device information
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
}

struct StreamThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Live input from a cpal device
///
/// Multi-channel devices are reduced to their first channel.
pub struct CpalSource {
    device_index: Option<usize>,
    stream: Option<StreamThread>,
}

impl CpalSource {
    /// Create a source for the input device at `device_index` (None = default device)
    pub fn new(device_index: Option<usize>) -> Self {
        Self {
            device_index,
            stream: None,
        }
    }

    /// List all available input devices
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| AudioError::device(format!("Failed to enumerate devices: {}", e)))?
            .enumerate()
            .map(|(index, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));

                let (max_input_channels, default_sample_rate) = device
                    .default_input_config()
                    .map(|config| (config.channels(), config.sample_rate().0))
                    .unwrap_or((0, 0));

                DeviceInfo {
                    index,
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    max_input_channels,
                    default_sample_rate,
                }
            })
            .collect();

        Ok(devices)
    }
}

impl AudioSource for CpalSource {
    fn open(&mut self, buffer_size: usize, on_block: BlockCallback) -> Result<u32> {
        if self.stream.is_some() {
            return Err(AudioError::stream("Audio stream is already open"));
        }

        let (ready_tx, ready_rx) = bounded::<Result<u32>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let device_index = self.device_index;

        let handle = thread::Builder::new()
            .name("pitchy-capture".to_string())
            .spawn(move || {
                let stream = match start_stream(device_index, buffer_size, on_block) {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until close() (or the source is dropped)
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => {
                self.stream = Some(StreamThread { stop_tx, handle });
                Ok(sample_rate)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::stream("Capture thread exited before the stream started"))
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.stop_tx.send(());
            if stream.handle.join().is_err() {
                error!("Capture thread panicked");
            }
            info!("Audio stream closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn select_device(device_index: Option<usize>) -> Result<Device> {
    let host = cpal::default_host();

    match device_index {
        Some(index) => host
            .input_devices()
            .map_err(|e| AudioError::device(format!("Failed to enumerate devices: {}", e)))?
            .nth(index)
            .ok_or_else(|| AudioError::device(format!("Device index {} not found", index))),
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::device("No default input device found")),
    }
}

fn start_stream(
    device_index: Option<usize>,
    buffer_size: usize,
    on_block: BlockCallback,
) -> Result<(Stream, u32)> {
    let device = select_device(device_index)?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::device(format!("Failed to get device config: {}", e)))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let format = supported.sample_format();

    let fixed = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: BufferSize::Fixed(buffer_size as u32),
    };

    let stream = match build_stream(&device, &fixed, format, on_block.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(
                "Device rejected a fixed buffer of {} frames ({}), using its default",
                buffer_size, e
            );
            let fallback = StreamConfig {
                buffer_size: BufferSize::Default,
                ..fixed
            };
            build_stream(&device, &fallback, format, on_block)?
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::stream(format!("Failed to start stream: {}", e)))?;

    info!(
        "Audio stream open: {} @ {} Hz, {} channel(s), {:?}",
        device_name, sample_rate, channels, format
    );

    Ok((stream, sample_rate))
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
    on_block: BlockCallback,
) -> Result<Stream> {
    match format {
        SampleFormat::F32 => build_stream_typed::<f32>(device, config, on_block),
        SampleFormat::I16 => build_stream_typed::<i16>(device, config, on_block),
        SampleFormat::U16 => build_stream_typed::<u16>(device, config, on_block),
        other => Err(AudioError::device(format!(
            "Unsupported sample format: {:?}",
            other
        ))),
    }
}

fn build_stream_typed<T>(device: &Device, config: &StreamConfig, on_block: BlockCallback) -> Result<Stream>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let sample_rate = config.sample_rate.0;
    let mut mono: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // First channel only: averaging halves a mic wired to one side
                mono.clear();
                mono.extend(data.iter().step_by(channels).map(|&s| s.to_sample::<f32>()));
                on_block(FrameBlock {
                    samples: &mono,
                    sample_rate,
                });
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::stream(format!("Failed to build input stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_closed_source() {
        let mut source = CpalSource::new(None);
        assert!(!source.is_open());
        source.close(); // no-op when never opened
        assert!(!source.is_open());
    }

    #[test]
    #[ignore = "Requires an audio input device"]
    fn test_list_devices() {
        let devices = CpalSource::list_devices().unwrap();
        assert!(!devices.is_empty(), "Should have at least one audio device");
    }

    #[test]
    #[ignore = "Requires an audio input device"]
    fn test_open_delivers_blocks() {
        let blocks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&blocks);

        let mut source = CpalSource::new(None);
        let rate = source
            .open(
                1024,
                Arc::new(move |_block: FrameBlock<'_>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(rate > 0);

        std::thread::sleep(Duration::from_millis(500));
        source.close();

        let seen = blocks.load(Ordering::SeqCst);
        assert!(seen > 0);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(blocks.load(Ordering::SeqCst), seen, "no delivery after close");
    }
}
