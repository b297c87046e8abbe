//! Core domain types for the playback engine

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Stream parameters fixed for the life of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSpec {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl AudioSpec {
    /// Create a new audio spec
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// CD quality stereo (44.1 kHz)
    pub fn cd_quality() -> Self {
        Self::new(44_100, 2)
    }

    /// Number of interleaved samples per millisecond
    pub fn samples_per_ms(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.channels) / 1000
    }
}

/// Descriptive tags read from the container at open time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    /// Track title
    pub title: Option<String>,

    /// Artist name
    pub artist: Option<String>,

    /// Album name
    pub album: Option<String>,
}

/// Information returned when a compressed stream has been opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Decoded output spec (always stereo after downmix)
    pub spec: AudioSpec,

    /// Total duration in milliseconds (0 if the container does not say)
    pub duration_ms: u64,

    /// Tags found in the container
    pub tags: Tags,
}

/// Audio track
///
/// The path is the identity; everything else is descriptive metadata
/// populated lazily once the container has been probed. A duration of 0
/// means "not known yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// File path on disk (immutable identifier)
    pub path: PathBuf,

    /// Track title (falls back to the file stem until tags are read)
    pub title: String,

    /// Artist name
    pub artist: Option<String>,

    /// Album name
    pub album: Option<String>,

    /// Track duration in milliseconds (0 = unknown)
    pub duration_ms: u64,

    /// Whether the user marked this track as a favorite
    pub favorite: bool,
}

impl Track {
    /// Create a new track from a file path with no metadata yet
    pub fn new(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();
        Self {
            path,
            title,
            artist: None,
            album: None,
            duration_ms: 0,
            favorite: false,
        }
    }

    /// Fill in metadata learned from the opened container
    ///
    /// Tags only overwrite the placeholder values; an absent tag never
    /// erases something the caller already knew.
    pub fn apply_stream_info(&mut self, info: &StreamInfo) {
        if let Some(title) = &info.tags.title {
            self.title = title.clone();
        }
        if info.tags.artist.is_some() {
            self.artist = info.tags.artist.clone();
        }
        if info.tags.album.is_some() {
            self.album = info.tags.album.clone();
        }
        if info.duration_ms > 0 {
            self.duration_ms = info.duration_ms;
        }
    }
}

/// File extensions the playback core accepts
///
/// Enumerating collaborators (file browsers) filter against this list;
/// the core itself rejects unknown containers at probe time instead.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac", "aac", "opus"];

/// Check whether a path carries a supported audio extension
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
