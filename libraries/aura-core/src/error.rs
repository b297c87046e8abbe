//! Core error types for Aura Player

use thiserror::Error;

/// Result type alias using `AuraError`
pub type Result<T> = std::result::Result<T, AuraError>;

/// Core error type for Aura Player
#[derive(Error, Debug)]
pub enum AuraError {
    /// Audio decoding errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Output sink errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// Playback control errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AuraError {
    /// Create an audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a playback error
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
