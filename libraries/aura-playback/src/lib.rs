//! Aura Player - Playback Core
//!
//! Platform-independent playback management on top of [`aura_audio`]:
//! a wall-clock position model, a per-track session state machine, a
//! track sequencer (shuffle, repeat, previous-threshold) and the
//! [`PlaybackManager`] that ties them together behind a command API and
//! an event stream.
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use aura_core::{AuraError, Track};
//! use aura_playback::{PlaybackConfig, PlaybackManager, SharedSinkFactory};
//!
//! let factory: SharedSinkFactory =
//!     Arc::new(|_spec| Err(AuraError::sink("no output device in docs")));
//! let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
//! manager.load_tracks(vec![Track::new(PathBuf::from("/music/song.mp3"))]);
//! manager.play()?;
//! // Drive the manager and drain events from a tick loop:
//! manager.poll();
//! for event in events.try_iter() {
//!     println!("{event:?}");
//! }
//! # Ok::<(), aura_playback::PlaybackError>(())
//! ```

#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod events;
pub mod manager;
pub mod sequencer;
pub mod session;
pub mod types;

pub use clock::PositionClock;
pub use error::{PlaybackError, Result};
pub use events::{ErrorKind, PlaybackEvent};
pub use manager::{PlaybackManager, SharedSinkFactory};
pub use sequencer::{CompletionAction, PreviousAction, TrackSequencer};
pub use session::PlaybackSession;
pub use types::{PlaybackConfig, PlayerState, RepeatMode};
