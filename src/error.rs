//! Error types

use thiserror::Error;

/// Crate-level result
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors raised by the capture side
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no input device with index {0}")]
    DeviceNotFound(usize),

    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    #[error("unsupported stream config: {0}")]
    UnsupportedConfig(String),

    #[error("failed to build stream: {0}")]
    BuildStream(String),

    #[error("failed to start stream: {0}")]
    PlayStream(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("capture stream closed")]
    Closed,
}

impl From<cpal::DevicesError> for AudioError {
    fn from(e: cpal::DevicesError) -> Self {
        AudioError::Enumeration(e.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        AudioError::UnsupportedConfig(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(e: cpal::BuildStreamError) -> Self {
        AudioError::BuildStream(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(e: cpal::PlayStreamError) -> Self {
        AudioError::PlayStream(e.to_string())
    }
}

impl From<cpal::StreamError> for AudioError {
    fn from(e: cpal::StreamError) -> Self {
        AudioError::StreamError(e.to_string())
    }
}
