//! Track sequencing: playlist order, shuffle, repeat, previous-threshold
//!
//! The sequencer owns the ordered track list and the current index and
//! answers one question: which track plays next. It never talks to the
//! audio stack itself; the manager turns its decisions into sessions.

use crate::types::RepeatMode;
use aura_core::Track;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What `previous` decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousAction {
    /// Past the restart threshold: restart the current track at 0
    Restart,
    /// Move to this index (wrapping from the first to the last)
    Index(usize),
}

/// What happens after a track completes naturally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    /// Repeat-one: prepare the same index again
    Replay,
    /// Prepare this index next
    Advance(usize),
    /// Repeat-off at the last track: playback holds at the end
    EndOfPlaylist,
}

/// Playlist, current index and sequencing policy
///
/// Invariant: while the playlist is non-empty the current index is valid;
/// an empty playlist has no meaningful index and every navigation method
/// returns `None`.
///
/// Policy choices (documented in DESIGN.md): shuffle only affects
/// `next()` and may re-pick the current index; repeat-off end detection
/// uses sequential order even while shuffled; `previous()` ignores
/// shuffle entirely.
#[derive(Debug)]
pub struct TrackSequencer {
    tracks: Vec<Track>,
    current: usize,
    shuffle: bool,
    repeat: RepeatMode,
    restart_threshold_ms: u64,
    rng: StdRng,
}

impl TrackSequencer {
    /// Create a sequencer with an entropy-seeded shuffle generator
    pub fn new(tracks: Vec<Track>) -> Self {
        Self::with_rng(tracks, StdRng::from_entropy())
    }

    /// Create a sequencer with a fixed shuffle seed (deterministic tests)
    pub fn with_seed(tracks: Vec<Track>, seed: u64) -> Self {
        Self::with_rng(tracks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tracks: Vec<Track>, rng: StdRng) -> Self {
        Self {
            tracks,
            current: 0,
            shuffle: false,
            repeat: RepeatMode::Off,
            restart_threshold_ms: 5_000,
            rng,
        }
    }

    /// Replace the playlist, resetting the index to 0
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.current = 0;
    }

    /// Change how far into a track `previous` still moves backwards
    pub fn set_restart_threshold_ms(&mut self, threshold_ms: u64) {
        self.restart_threshold_ms = threshold_ms;
    }

    /// Enable or disable shuffle directly (resume from preferences)
    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    /// Set the repeat mode directly (resume from preferences)
    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Current index, if the playlist is non-empty
    pub fn current_index(&self) -> Option<usize> {
        (!self.tracks.is_empty()).then_some(self.current)
    }

    /// The current track
    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current)
    }

    /// Mutable access to the current track (metadata updates)
    pub fn current_track_mut(&mut self) -> Option<&mut Track> {
        self.tracks.get_mut(self.current)
    }

    /// All tracks in playlist order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Jump to a specific index
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Advance to the next track per policy and return the new index
    ///
    /// Shuffled: a uniformly random index over the whole list, repeats of
    /// the current index included. Sequential: `(index + 1) % len`.
    pub fn next(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        self.current = if self.shuffle {
            self.rng.gen_range(0..self.tracks.len())
        } else {
            (self.current + 1) % self.tracks.len()
        };
        Some(self.current)
    }

    /// Decide what "previous" means at the given position
    ///
    /// Above the restart threshold the current track restarts and the
    /// index stays put; below it the index moves back, wrapping from the
    /// first track to the last.
    pub fn previous(&mut self, position_ms: u64) -> Option<PreviousAction> {
        if self.tracks.is_empty() {
            return None;
        }
        if position_ms > self.restart_threshold_ms {
            return Some(PreviousAction::Restart);
        }
        self.current = if self.current == 0 {
            self.tracks.len() - 1
        } else {
            self.current - 1
        };
        Some(PreviousAction::Index(self.current))
    }

    /// Dispatch a natural end of stream per the repeat mode
    pub fn on_track_completed(&mut self) -> Option<CompletionAction> {
        if self.tracks.is_empty() {
            return None;
        }
        let action = match self.repeat {
            RepeatMode::One => CompletionAction::Replay,
            RepeatMode::All => CompletionAction::Advance(self.next()?),
            RepeatMode::Off => {
                if self.current + 1 >= self.tracks.len() {
                    CompletionAction::EndOfPlaylist
                } else {
                    CompletionAction::Advance(self.next()?)
                }
            }
        };
        Some(action)
    }

    /// Flip the shuffle flag, returning the new value
    ///
    /// Policy mutation only; never itself triggers a track change.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    /// Cycle the repeat mode, returning the new value
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycled();
        self.repeat
    }

    /// Current shuffle flag
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Current repeat mode
    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }
}
