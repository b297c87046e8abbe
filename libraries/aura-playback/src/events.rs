//! Playback events
//!
//! The core never assumes a UI thread exists: everything the outside
//! world needs to know arrives on a bounded channel of [`PlaybackEvent`]s
//! that the consumer drains on whatever thread it likes. Values that an
//! external collaborator persists (shuffle, repeat, favorites, spatial
//! delay) are emitted here as change events.

use crate::types::{PlayerState, RepeatMode};
use aura_audio::AudioError;
use aura_core::{StreamInfo, Track};
use serde::{Deserialize, Serialize};

/// Classified playback failure, mirrored from the decode-side taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Path missing at prepare time
    NotFound,
    /// Container or codec not supported
    UnsupportedFormat,
    /// Container carried no audio stream
    NoAudioTrack,
    /// Unrecoverable mid-stream decode failure
    Decode,
    /// Reposition failed
    Seek,
    /// Output device failure
    Sink,
    /// File system failure
    Io,
}

impl From<&AudioError> for ErrorKind {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::FileNotFound(_) => Self::NotFound,
            AudioError::UnsupportedFormat(_) => Self::UnsupportedFormat,
            AudioError::NoAudioTrack => Self::NoAudioTrack,
            AudioError::DecodeError(_) | AudioError::NoFileOpen => Self::Decode,
            AudioError::SeekError(_) => Self::Seek,
            AudioError::Sink(_) => Self::Sink,
            AudioError::Io(_) => Self::Io,
        }
    }
}

/// Events emitted by the playback core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// A session finished probing its track
    Prepared {
        /// Playlist index of the prepared track
        index: usize,
        /// Stream parameters and duration learned from the container
        info: StreamInfo,
    },

    /// Track metadata was filled in from container tags
    MetadataUpdated {
        /// Playlist index of the updated track
        index: usize,
        /// The track with tags and duration applied
        track: Track,
    },

    /// The state machine moved to a new state
    StateChanged {
        /// The new state
        state: PlayerState,
    },

    /// Another track became current
    TrackChanged {
        /// Playlist index of the new current track
        index: usize,
    },

    /// Periodic position report while playing
    PositionTick {
        /// Estimated audible position
        position_ms: u64,
        /// Track duration (0 = unknown)
        duration_ms: u64,
    },

    /// A track played to its natural end (exactly once per track, never
    /// for `stop`)
    Completed {
        /// Playlist index of the finished track
        index: usize,
    },

    /// Shuffle was toggled; persist collaborators store the new value
    ShuffleChanged {
        /// New shuffle flag
        enabled: bool,
    },

    /// Repeat mode was cycled
    RepeatChanged {
        /// New repeat mode
        mode: RepeatMode,
    },

    /// A track's favorite flag was toggled
    FavoriteChanged {
        /// Playlist index of the track
        index: usize,
        /// New favorite flag
        favorite: bool,
    },

    /// The Haas delay changed
    SpatialDelayChanged {
        /// New delay in milliseconds
        delay_ms: u32,
    },

    /// A failure was reported (exactly once per failure)
    Error {
        /// Classified failure kind
        kind: ErrorKind,
        /// Human-readable description
        message: String,
    },
}
