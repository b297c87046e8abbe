//! Playback manager: ties the sequencer, sessions and events together
//!
//! One `PlaybackManager` owns the playlist and at most one live decode
//! session. Commands come in on the caller's thread; progress comes back
//! on the event receiver handed out by [`PlaybackManager::new`]. The
//! manager is not itself a thread: callers drive it by invoking commands
//! and calling [`PlaybackManager::poll`] periodically (a UI tick or a
//! small timer loop both work).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aura_audio::{PipelineEvent, SinkFactory};
use aura_core::{AudioSink, AudioSpec, Track};
use crossbeam_channel::{Receiver, Sender};

use crate::error::{PlaybackError, Result};
use crate::events::{ErrorKind, PlaybackEvent};
use crate::sequencer::{CompletionAction, PreviousAction, TrackSequencer};
use crate::session::PlaybackSession;
use crate::types::{PlaybackConfig, PlayerState, RepeatMode};

/// Outward event queue depth; events beyond this are dropped with a log
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Minimum interval between `PositionTick` events
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Builds an output sink for a stream's parameters
///
/// Called on the decode worker once the container has been probed, so
/// the sink can match the stream's sample rate. Must be cheap to clone
/// (it is shared across sessions).
pub type SharedSinkFactory =
    Arc<dyn Fn(AudioSpec) -> aura_core::Result<Box<dyn AudioSink>> + Send + Sync>;

/// Top-level playback orchestrator
pub struct PlaybackManager {
    sequencer: TrackSequencer,
    session: Option<PlaybackSession>,
    sink_factory: SharedSinkFactory,
    events_tx: Sender<PlaybackEvent>,

    /// Haas delay carried from session to session
    spatial_delay_ms: u32,

    /// Start playing as soon as the in-flight prepare reports `Ready`
    autoplay: bool,

    last_emitted_state: PlayerState,
    last_tick: Option<Instant>,
}

impl PlaybackManager {
    /// Create a manager and the receiver its events arrive on
    pub fn new(config: PlaybackConfig, sink_factory: SharedSinkFactory) -> (Self, Receiver<PlaybackEvent>) {
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);
        let mut sequencer = match config.shuffle_seed {
            Some(seed) => TrackSequencer::with_seed(Vec::new(), seed),
            None => TrackSequencer::new(Vec::new()),
        };
        sequencer.set_shuffle(config.shuffle);
        sequencer.set_repeat(config.repeat);
        sequencer.set_restart_threshold_ms(config.restart_threshold_ms);
        let manager = Self {
            sequencer,
            session: None,
            sink_factory,
            events_tx,
            spatial_delay_ms: config.spatial_delay_ms.min(aura_audio::MAX_HAAS_DELAY_MS),
            autoplay: false,
            last_emitted_state: PlayerState::Idle,
            last_tick: None,
        };
        (manager, events_rx)
    }

    /// Replace the playlist
    ///
    /// The current session keeps playing; the new list takes effect at
    /// the next navigation or completion.
    pub fn load_tracks(&mut self, tracks: Vec<Track>) {
        self.sequencer.set_tracks(tracks);
    }

    /// Start playing the track at `index`
    pub fn play_index(&mut self, index: usize) -> Result<()> {
        if self.sequencer.is_empty() {
            return Err(PlaybackError::PlaylistEmpty);
        }
        if !self.sequencer.select(index) {
            return Err(PlaybackError::IndexOutOfBounds(index));
        }
        self.emit(PlaybackEvent::TrackChanged { index });
        self.start_current(true);
        Ok(())
    }

    /// Start or resume playback
    ///
    /// With a live session this resumes it; with no session, a terminal
    /// one, or one that already reached the end of its stream, the
    /// current track is prepared from the start.
    pub fn play(&mut self) -> Result<()> {
        match &mut self.session {
            Some(session) if !session.state().is_terminal() && !session.is_completed() => {
                if session.state() == PlayerState::Preparing {
                    self.autoplay = true;
                } else {
                    session.play();
                    self.emit_state();
                }
                Ok(())
            }
            _ => {
                if self.sequencer.is_empty() {
                    return Err(PlaybackError::PlaylistEmpty);
                }
                self.start_current(true);
                Ok(())
            }
        }
    }

    /// Pause playback, freezing the position
    pub fn pause(&mut self) {
        if let Some(session) = &mut self.session {
            session.pause();
            self.emit_state();
        }
    }

    /// Pause when playing, otherwise play
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.state() == PlayerState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Reposition the current track
    pub fn seek(&mut self, position_ms: u64) {
        if let Some(session) = &mut self.session {
            session.seek(position_ms);
            self.emit_state();
        }
    }

    /// Stop playback and discard the session
    pub fn stop(&mut self) {
        if let Some(session) = &mut self.session {
            session.stop();
        }
        self.autoplay = false;
        self.emit_state();
    }

    /// Tear everything down; the manager returns to `Idle`
    pub fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
        }
        self.autoplay = false;
        self.emit_state();
    }

    /// Skip to the next track per the shuffle policy
    pub fn next(&mut self) -> Result<()> {
        let index = self.sequencer.next().ok_or(PlaybackError::PlaylistEmpty)?;
        self.emit(PlaybackEvent::TrackChanged { index });
        self.start_current(true);
        Ok(())
    }

    /// Go back: restart the current track past the threshold, otherwise
    /// move to the previous index
    pub fn previous(&mut self) -> Result<()> {
        let position_ms = self.position_ms();
        let action = self
            .sequencer
            .previous(position_ms)
            .ok_or(PlaybackError::PlaylistEmpty)?;
        match action {
            PreviousAction::Restart => match &mut self.session {
                // Seeking only works while the decode worker is alive;
                // dead sessions get a fresh prepare instead.
                Some(session) if !session.state().is_terminal() && !session.is_completed() => {
                    session.seek(0);
                    self.emit_state();
                }
                _ => self.start_current(true),
            },
            PreviousAction::Index(index) => {
                self.emit(PlaybackEvent::TrackChanged { index });
                self.start_current(true);
            }
        }
        Ok(())
    }

    /// Toggle shuffle; takes effect at the next `next()` or completion
    pub fn toggle_shuffle(&mut self) -> bool {
        let enabled = self.sequencer.toggle_shuffle();
        self.emit(PlaybackEvent::ShuffleChanged { enabled });
        enabled
    }

    /// Cycle the repeat mode Off → All → One
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let mode = self.sequencer.cycle_repeat();
        self.emit(PlaybackEvent::RepeatChanged { mode });
        mode
    }

    /// Change the Haas delay, effective immediately and sticky across
    /// tracks
    pub fn set_spatial_delay(&mut self, delay_ms: u32) {
        let delay_ms = delay_ms.min(aura_audio::MAX_HAAS_DELAY_MS);
        self.spatial_delay_ms = delay_ms;
        if let Some(session) = &mut self.session {
            session.set_spatial_delay_ms(delay_ms);
        }
        self.emit(PlaybackEvent::SpatialDelayChanged { delay_ms });
    }

    /// Toggle the current track's favorite flag
    pub fn toggle_favorite(&mut self) -> Option<bool> {
        let index = self.sequencer.current_index()?;
        let track = self.sequencer.current_track_mut()?;
        track.favorite = !track.favorite;
        let favorite = track.favorite;
        self.emit(PlaybackEvent::FavoriteChanged { index, favorite });
        Some(favorite)
    }

    /// Current wall-clock playback position
    pub fn position_ms(&self) -> u64 {
        self.session.as_ref().map_or(0, PlaybackSession::position_ms)
    }

    /// Duration of the current track (0 = unknown)
    pub fn duration_ms(&self) -> u64 {
        self.session.as_ref().map_or(0, PlaybackSession::duration_ms)
    }

    /// Current state; `Idle` when no session exists
    pub fn state(&self) -> PlayerState {
        self.session
            .as_ref()
            .map_or(PlayerState::Idle, PlaybackSession::state)
    }

    /// The track the sequencer currently points at
    pub fn current_track(&self) -> Option<&Track> {
        self.sequencer.current_track()
    }

    /// Current shuffle flag
    pub fn shuffle_enabled(&self) -> bool {
        self.sequencer.shuffle()
    }

    /// Current repeat mode
    pub fn repeat_mode(&self) -> RepeatMode {
        self.sequencer.repeat()
    }

    /// Current Haas delay
    pub fn spatial_delay_ms(&self) -> u32 {
        self.spatial_delay_ms
    }

    /// Drive the manager: drain worker events, dispatch completions and
    /// emit progress
    ///
    /// Call this periodically from the thread that owns the manager.
    pub fn poll(&mut self) {
        let updates = match &mut self.session {
            Some(session) => session.pump(),
            None => return,
        };
        for event in updates {
            match event {
                PipelineEvent::Prepared(info) => {
                    let Some(index) = self.sequencer.current_index() else {
                        continue;
                    };
                    if let Some(track) = self.sequencer.current_track_mut() {
                        track.apply_stream_info(&info);
                        let track = track.clone();
                        self.emit(PlaybackEvent::MetadataUpdated { index, track });
                    }
                    self.emit(PlaybackEvent::Prepared { index, info });
                    if self.autoplay {
                        self.autoplay = false;
                        if let Some(session) = &mut self.session {
                            session.play();
                        }
                    }
                }
                PipelineEvent::SeekComplete { .. } => {}
                PipelineEvent::Completed => {
                    if let Some(index) = self.sequencer.current_index() {
                        self.emit(PlaybackEvent::Completed { index });
                    }
                    self.dispatch_completion();
                }
                PipelineEvent::Failed(e) => {
                    let kind = ErrorKind::from(&e);
                    self.emit(PlaybackEvent::Error {
                        kind,
                        message: e.to_string(),
                    });
                    self.autoplay = false;
                }
            }
        }
        self.emit_state();
        self.maybe_tick();
    }

    /// Act on the sequencer's decision after a natural end of stream
    fn dispatch_completion(&mut self) {
        match self.sequencer.on_track_completed() {
            Some(CompletionAction::Replay) => {
                self.start_current(true);
            }
            Some(CompletionAction::Advance(index)) => {
                self.emit(PlaybackEvent::TrackChanged { index });
                self.start_current(true);
            }
            Some(CompletionAction::EndOfPlaylist) | None => {
                // End of playlist holds position at the end of the last
                // track; `play()` from here restarts it.
                if let Some(session) = &mut self.session {
                    session.pause();
                }
            }
        }
    }

    /// Replace the session with a fresh prepare of the current track
    fn start_current(&mut self, autoplay: bool) {
        let Some(track) = self.sequencer.current_track() else {
            return;
        };
        let path: PathBuf = track.path.clone();
        // Drop the old session first so its worker releases the output
        // device before the new one asks for it.
        self.session = None;
        self.autoplay = autoplay;
        let factory = Arc::clone(&self.sink_factory);
        let make_sink: SinkFactory = Box::new(move |spec| factory(spec));
        self.session = Some(PlaybackSession::prepare(
            path,
            self.spatial_delay_ms,
            make_sink,
        ));
        self.emit_state();
    }

    /// Emit a `StateChanged` if the state moved since the last emit
    fn emit_state(&mut self) {
        let state = self.state();
        if state != self.last_emitted_state {
            self.last_emitted_state = state;
            self.emit(PlaybackEvent::StateChanged { state });
        }
    }

    /// Emit a throttled `PositionTick` while playing
    fn maybe_tick(&mut self) {
        if self.state() != PlayerState::Playing {
            return;
        }
        let now = Instant::now();
        if let Some(last) = self.last_tick {
            if now.duration_since(last) < TICK_INTERVAL {
                return;
            }
        }
        self.last_tick = Some(now);
        self.emit(PlaybackEvent::PositionTick {
            position_ms: self.position_ms(),
            duration_ms: self.duration_ms(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        if self.events_tx.try_send(event).is_err() {
            tracing::warn!("event queue full, dropping playback event");
        }
    }
}
