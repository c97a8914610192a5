//! Error types for capture sessions

use pitchy_audio::AudioError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not initialized")]
    NotInitialized,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Converter error: {0}")]
    Converter(String),

    #[error("Resampling error: {0}")]
    Resample(String),

    #[error("No recorded audio to save")]
    NoData,

    /// Storage failed; the recording is still buffered
    #[error("Failed to save recording: {0}")]
    SaveError(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Audio source error: {0}")]
    Source(String),
}

impl SessionError {
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn source<S: Into<String>>(msg: S) -> Self {
        Self::Source(msg.into())
    }
}

impl From<AudioError> for SessionError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::NotRecording => Self::NotRecording,
            AudioError::AlreadyRecording => Self::AlreadyRecording,
            AudioError::ConverterError(msg) | AudioError::EncodeError(msg) => Self::Converter(msg),
            AudioError::ResampleError(msg) => Self::Resample(msg),
            AudioError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other @ (AudioError::DeviceError(_) | AudioError::StreamError(_) | AudioError::Io(_)) => {
                Self::Source(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_mapping() {
        assert!(matches!(
            SessionError::from(AudioError::AlreadyRecording),
            SessionError::AlreadyRecording
        ));
        assert!(matches!(
            SessionError::from(AudioError::converter("rate 0")),
            SessionError::Converter(msg) if msg == "rate 0"
        ));
        assert!(matches!(
            SessionError::from(AudioError::device("unplugged")),
            SessionError::Source(msg) if msg.contains("unplugged")
        ));
        assert!(matches!(
            SessionError::from(AudioError::encode("too long")),
            SessionError::Converter(msg) if msg == "too long"
        ));
    }
}
