//! Error types for playback management

use thiserror::Error;

/// Playback errors
///
/// These are synchronous control-surface errors (bad index, empty
/// playlist). Decode and device failures never cross the control API as
/// errors; they arrive asynchronously as [`crate::PlaybackEvent::Error`].
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The playlist has no tracks
    #[error("Playlist is empty")]
    PlaylistEmpty,

    /// Index past the end of the playlist
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
