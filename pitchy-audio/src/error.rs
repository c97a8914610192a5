//! Error types for capture, resampling and buffering

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AudioError>;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resampler could not be set up for the requested rates
    #[error("Converter error: {0}")]
    ConverterError(String),

    #[error("Resampling error: {0}")]
    ResampleError(String),

    /// Payload does not fit the 32-bit RIFF size fields
    #[error("WAV encoding error: {0}")]
    EncodeError(String),

    #[error("Not recording")]
    NotRecording,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Self::DeviceError(msg.into())
    }

    pub fn stream<S: Into<String>>(msg: S) -> Self {
        Self::StreamError(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn converter<S: Into<String>>(msg: S) -> Self {
        Self::ConverterError(msg.into())
    }

    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::EncodeError(msg.into())
    }
}
