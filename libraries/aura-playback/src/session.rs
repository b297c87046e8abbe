//! Per-track playback session
//!
//! A [`PlaybackSession`] binds exactly one track to one decode worker,
//! one output sink and one position clock. Two threads touch it: the
//! control thread (every method here) and the decode worker, which only
//! shares the lock-free [`PipelineControl`] flags. There is no global
//! player state: whoever needs the session holds it, and dropping it
//! tears the worker down.

use crate::clock::PositionClock;
use crate::types::PlayerState;
use aura_audio::pipeline::SinkFactory;
use aura_audio::{DecodePipeline, PipelineControl, PipelineEvent};
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

/// State machine and resources for one prepared track
pub struct PlaybackSession {
    state: PlayerState,

    /// Flags shared with the decode worker
    control: Arc<PipelineControl>,

    /// The decode worker; exactly one per session
    worker: Option<JoinHandle<()>>,

    /// Events from the worker, drained by `pump`
    pipeline_rx: Receiver<PipelineEvent>,

    /// Wall-clock position estimator
    clock: PositionClock,

    /// Which state `Seeking` returns to
    resume_after_seek: bool,

    /// Natural end of stream was observed; the session can be replaced
    completed: bool,

    /// An error event has already been surfaced
    error_reported: bool,
}

impl PlaybackSession {
    /// Spawn a session for `path`: probe the container, build the sink,
    /// then run the decode loop until told otherwise
    ///
    /// Returns immediately in the `Preparing` state; readiness or
    /// failure arrives through [`pump`](Self::pump). The worker starts
    /// with the paused flag set, so nothing is written before `play`.
    pub fn prepare(path: PathBuf, spatial_delay_ms: u32, make_sink: SinkFactory) -> Self {
        let control = Arc::new(PipelineControl::new(spatial_delay_ms));
        let (pipeline_tx, pipeline_rx) = crossbeam_channel::bounded(16);

        let worker_control = Arc::clone(&control);
        let worker = std::thread::Builder::new()
            .name("aura-decode".to_string())
            .spawn(move || {
                DecodePipeline::new(worker_control, pipeline_tx).execute(&path, make_sink);
            })
            .expect("spawn decode worker");

        Self {
            state: PlayerState::Preparing,
            control,
            worker: Some(worker),
            pipeline_rx,
            clock: PositionClock::new(),
            resume_after_seek: false,
            completed: false,
            error_reported: false,
        }
    }

    /// Current state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Estimated audible position in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.clock.position_ms()
    }

    /// Track duration learned at prepare time (0 = unknown)
    pub fn duration_ms(&self) -> u64 {
        self.clock.duration_ms()
    }

    /// Whether the track played to its natural end
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Start or resume playback
    ///
    /// Valid from `Ready` and `Paused`; everywhere else a silent no-op
    /// (terminal sessions tolerate stale UI callbacks).
    pub fn play(&mut self) {
        match self.state {
            PlayerState::Ready | PlayerState::Paused => {
                self.clock.start();
                self.control.set_paused(false);
                self.state = PlayerState::Playing;
            }
            _ => {}
        }
    }

    /// Pause playback, freezing the position
    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.clock.pause();
            self.control.set_paused(true);
            self.state = PlayerState::Paused;
        }
    }

    /// Request a reposition to `target_ms`
    ///
    /// The clock jumps to the target immediately so position reads are
    /// correct before the demuxer has caught up; the state machine sits
    /// in `Seeking` until the worker confirms, then returns to the
    /// originating state.
    pub fn seek(&mut self, target_ms: u64) {
        match self.state {
            PlayerState::Playing | PlayerState::Paused => {
                self.resume_after_seek = self.state == PlayerState::Playing;
                self.clock.seek(target_ms);
                self.control.request_seek(target_ms);
                self.state = PlayerState::Seeking;
            }
            _ => {}
        }
    }

    /// Change the Haas delay for this session
    ///
    /// Safe in any state; the worker picks it up before the next chunk.
    pub fn set_spatial_delay_ms(&mut self, delay_ms: u32) {
        self.control.set_spatial_delay_ms(delay_ms);
    }

    /// Stop the session: join the worker and release its resources
    ///
    /// Terminal; repeated calls are no-ops. Never produces a completion
    /// event.
    pub fn stop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.teardown();
        self.state = PlayerState::Stopped;
    }

    /// Release the session; like `stop` but marks the session `Released`
    pub fn release(&mut self) {
        if self.state == PlayerState::Released {
            return;
        }
        self.teardown();
        self.state = PlayerState::Released;
    }

    /// Drain worker events and apply their state transitions
    ///
    /// Must be called from the control thread. Returns the observed
    /// events for the owner (the manager) to act on; a failure is
    /// returned at most once per session.
    pub fn pump(&mut self) -> Vec<PipelineEvent> {
        let mut updates = Vec::new();
        while let Ok(event) = self.pipeline_rx.try_recv() {
            match &event {
                PipelineEvent::Prepared(info) => {
                    self.clock.set_duration_ms(info.duration_ms);
                    if self.state == PlayerState::Preparing {
                        self.state = PlayerState::Ready;
                    }
                }
                PipelineEvent::SeekComplete { .. } => {
                    if self.state == PlayerState::Seeking {
                        self.state = if self.resume_after_seek {
                            PlayerState::Playing
                        } else {
                            PlayerState::Paused
                        };
                    }
                }
                PipelineEvent::Completed => {
                    self.completed = true;
                    // "Duration reached" should agree with audible
                    // completion, so pin the clock to the end.
                    let duration_ms = self.clock.duration_ms();
                    if duration_ms > 0 {
                        self.clock.seek(duration_ms);
                    }
                    self.clock.pause();
                    // No transition here: the sequencer decides what
                    // happens next, the session just became replaceable.
                }
                PipelineEvent::Failed(e) => {
                    if self.error_reported {
                        continue;
                    }
                    tracing::warn!("session failed: {e}");
                    self.error_reported = true;
                    self.clock.pause();
                    self.control.request_stop();
                    self.state = PlayerState::Stopped;
                }
            }
            updates.push(event);
        }
        updates
    }

    /// Signal the worker to exit and wait for it
    fn teardown(&mut self) {
        self.control.request_stop();
        self.clock.pause();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        // A new session must never start while this worker still owns
        // an output device.
        self.control.request_stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
