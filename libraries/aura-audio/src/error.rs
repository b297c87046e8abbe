//! Audio-specific errors

use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
///
/// `FileNotFound`, `UnsupportedFormat` and `NoAudioTrack` are fatal at
/// open time; `DecodeError` is fatal mid-stream. All of them are reported
/// exactly once per failure through the pipeline event channel.
#[derive(Error, Debug)]
pub enum AudioError {
    /// File not found at prepare time
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Container or codec not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Container carried no audio elementary stream
    #[error("No audio track in container")]
    NoAudioTrack,

    /// Unrecoverable decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Seek error
    #[error("Seek error: {0}")]
    SeekError(String),

    /// No file is currently open
    #[error("No file open for streaming decode")]
    NoFileOpen,

    /// Output sink failure (not backpressure)
    #[error("Sink error: {0}")]
    Sink(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<AudioError> for aura_core::AuraError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Sink(msg) => aura_core::AuraError::Sink(msg),
            other => aura_core::AuraError::audio(other.to_string()),
        }
    }
}
