//! Core types for playback management

use serde::{Deserialize, Serialize};

/// Playback state machine states
///
/// Per-session lifecycle: `Preparing → Ready → Playing ⇄ Paused`, with
/// `Seeking` as a transient stop between `Playing`/`Paused` and itself.
/// `Stopped` and `Released` are terminal for the session; `Idle` is the
/// manager's state when no session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// No track loaded
    Idle,

    /// Worker is probing the container
    Preparing,

    /// Opened successfully, not yet started
    Ready,

    /// Decoding and writing to the sink
    Playing,

    /// Worker idles, position frozen
    Paused,

    /// A reposition is in flight; returns to the originating state
    Seeking,

    /// Session ended (stop or error); terminal
    Stopped,

    /// Session torn down; terminal
    Released,
}

impl PlayerState {
    /// Whether the session accepts no further commands
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Released)
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Hold at the end of the playlist
    Off,

    /// Wrap around at the end
    All,

    /// Replay the current track forever
    One,
}

impl RepeatMode {
    /// Next mode in the cycle Off → All → One → Off
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Configuration and resume parameters for the playback manager
///
/// Shuffle/repeat/spatial-delay come back from whatever collaborator
/// persists user preferences; the core only consumes them here and emits
/// change events for the collaborator to store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Start with shuffle enabled
    pub shuffle: bool,

    /// Initial repeat mode
    pub repeat: RepeatMode,

    /// Haas delay to apply to every session, in milliseconds
    pub spatial_delay_ms: u32,

    /// `previous()` restarts the current track above this position
    pub restart_threshold_ms: u64,

    /// Seed for the shuffle generator (deterministic tests); `None`
    /// seeds from entropy
    pub shuffle_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatMode::Off,
            spatial_delay_ms: 0,
            restart_threshold_ms: 5_000,
            shuffle_seed: None,
        }
    }
}
