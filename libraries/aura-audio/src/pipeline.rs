//! Streaming decode pipeline
//!
//! A [`DecodePipeline`] turns one compressed audio file into effect-
//! processed PCM written to an [`AudioSink`], running on a dedicated
//! worker thread. The control half lives in [`PipelineControl`]: a set of
//! shared flags the worker polls at every loop boundary, so stop, pause
//! and seek requests are honored within one decode/write cycle instead of
//! killing the thread.
//!
//! Lifecycle is reported over a channel of [`PipelineEvent`]s and nothing
//! here assumes which thread drains it.

use crate::decoder::SymphoniaDecoder;
use crate::effects::HaasEffect;
use crate::error::{AudioError, Result};
use aura_core::{AudioSink, AudioSpec, StreamInfo};
use crossbeam_channel::Sender;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long the worker sleeps while paused or waiting out backpressure
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Backoff between retries of a partially accepted write
const WRITE_BACKOFF: Duration = Duration::from_millis(5);

/// Stereo frames requested per decode iteration
///
/// At 44.1 kHz this is ~23 ms of audio, which also bounds how stale a
/// stop/pause/seek flag can get mid-stream.
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// Builds the output sink once the stream spec is known
///
/// Invoked on the worker thread after a successful probe, because the
/// sink must be opened at the stream's sample rate.
pub type SinkFactory = Box<dyn FnOnce(AudioSpec) -> aura_core::Result<Box<dyn AudioSink>> + Send>;

/// Events emitted by the pipeline worker
#[derive(Debug)]
pub enum PipelineEvent {
    /// Probe succeeded; stream parameters and tags are known
    Prepared(StreamInfo),

    /// A requested reposition finished; writes resume from `actual_ms`
    SeekComplete {
        /// Position actually reached (nearest sync point)
        actual_ms: u64,
    },

    /// Natural end of stream, after the sink accepted the final chunk.
    /// Sent at most once, and never for a stop/release teardown.
    Completed,

    /// Unrecoverable failure; the pipeline has shut down
    Failed(AudioError),
}

/// Shared control flags between the control thread and the decode worker
///
/// All fields are atomics: the worker polls them at loop boundaries, the
/// control side updates them without blocking.
#[derive(Debug)]
pub struct PipelineControl {
    /// Worker must exit as soon as observed
    stop: AtomicBool,

    /// Worker idles (sink paused, thread alive) while set
    paused: AtomicBool,

    /// Pending seek target in milliseconds, -1 when none
    seek_request_ms: AtomicI64,

    /// Haas delay to apply, in milliseconds
    spatial_delay_ms: AtomicU32,
}

impl PipelineControl {
    /// Create controls for a new session
    ///
    /// The worker starts paused; `play` clears the flag.
    pub fn new(spatial_delay_ms: u32) -> Self {
        Self {
            stop: AtomicBool::new(false),
            paused: AtomicBool::new(true),
            seek_request_ms: AtomicI64::new(-1),
            spatial_delay_ms: AtomicU32::new(spatial_delay_ms),
        }
    }

    /// Ask the worker to exit at the next loop boundary
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Pause or resume the decode loop
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Whether the loop is currently asked to idle
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Request a reposition; overwrites any not-yet-honored request
    pub fn request_seek(&self, target_ms: u64) {
        self.seek_request_ms
            .store(target_ms.min(i64::MAX as u64) as i64, Ordering::Release);
    }

    /// Whether a seek request is waiting
    pub fn seek_pending(&self) -> bool {
        self.seek_request_ms.load(Ordering::Acquire) >= 0
    }

    /// Consume the pending seek request, if any
    fn take_seek(&self) -> Option<u64> {
        let raw = self.seek_request_ms.swap(-1, Ordering::AcqRel);
        (raw >= 0).then_some(raw as u64)
    }

    /// Change the Haas delay; picked up before the next processed chunk
    pub fn set_spatial_delay_ms(&self, delay_ms: u32) {
        self.spatial_delay_ms.store(delay_ms, Ordering::Release);
    }

    /// Currently requested Haas delay
    pub fn spatial_delay_ms(&self) -> u32 {
        self.spatial_delay_ms.load(Ordering::Acquire)
    }
}

/// Outcome of draining one chunk into the sink
enum WriteStatus {
    /// Every sample was accepted
    Drained,
    /// A stop or seek request interrupted the drain; remaining samples
    /// are discarded by the caller
    Interrupted,
}

/// The decode worker: demux → decode → spatial effect → sink
///
/// Owns the decoder, the effect and the sink exclusively; the only shared
/// state is [`PipelineControl`]. One pipeline serves exactly one file and
/// one sink, matching the one-session-one-worker rule.
pub struct DecodePipeline {
    control: Arc<PipelineControl>,
    events: Sender<PipelineEvent>,
    chunk_frames: usize,
    decoder: SymphoniaDecoder,
    effect: Option<HaasEffect>,
    sink: Option<Box<dyn AudioSink>>,
    sink_playing: bool,
}

impl DecodePipeline {
    /// Create a pipeline bound to its control flags and event channel
    pub fn new(control: Arc<PipelineControl>, events: Sender<PipelineEvent>) -> Self {
        Self {
            control,
            events,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            decoder: SymphoniaDecoder::new(),
            effect: None,
            sink: None,
            sink_playing: false,
        }
    }

    /// Override the per-iteration chunk size (tests use small chunks)
    pub fn with_chunk_frames(mut self, frames: usize) -> Self {
        self.chunk_frames = frames.max(1);
        self
    }

    /// Open the file and build the sink and effect for its stream spec
    pub fn open(&mut self, path: &Path, make_sink: SinkFactory) -> Result<StreamInfo> {
        let info = self.decoder.open(path)?;
        tracing::debug!(
            path = %path.display(),
            sample_rate = info.spec.sample_rate,
            duration_ms = info.duration_ms,
            "stream opened"
        );

        let sink = make_sink(info.spec).map_err(|e| AudioError::Sink(e.to_string()))?;

        let mut effect = HaasEffect::new(info.spec.sample_rate);
        effect.set_delay_ms(self.control.spatial_delay_ms());

        self.sink = Some(sink);
        self.effect = Some(effect);
        self.sink_playing = false;
        Ok(info)
    }

    /// Convenience for the worker thread: open, report readiness, run
    ///
    /// Every terminal outcome is reported exactly once: `Prepared` + loop
    /// events on success, a single `Failed` otherwise.
    pub fn execute(mut self, path: &Path, make_sink: SinkFactory) {
        match self.open(path, make_sink) {
            Ok(info) => {
                let _ = self.events.send(PipelineEvent::Prepared(info));
                self.run();
            }
            Err(e) => {
                let _ = self.events.send(PipelineEvent::Failed(e));
            }
        }
    }

    /// The decode loop
    ///
    /// Runs until end of stream, a stop request, or a fatal error. Flags
    /// are polled once per iteration and inside the write drain, so the
    /// loop never blocks past `POLL_INTERVAL` against a shutdown request.
    pub fn run(&mut self) {
        debug_assert!(self.sink.is_some(), "run() before open()");

        loop {
            if self.control.is_stopped() {
                break;
            }

            if let Some(target_ms) = self.control.take_seek() {
                match self.reposition(target_ms) {
                    Ok(actual_ms) => {
                        let _ = self.events.send(PipelineEvent::SeekComplete { actual_ms });
                    }
                    Err(e) => {
                        let _ = self.events.send(PipelineEvent::Failed(e));
                        break;
                    }
                }
                continue;
            }

            if self.control.is_paused() {
                self.set_sink_playing(false);
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            self.set_sink_playing(true);

            match self.decoder.decode_chunk(self.chunk_frames) {
                Ok(Some(mut chunk)) => {
                    self.apply_pending_delay();
                    if let Some(effect) = self.effect.as_mut() {
                        effect.process(&mut chunk);
                    }
                    match self.write_chunk(&chunk) {
                        // Interrupted drains drop the rest of the chunk:
                        // a pending seek must never let pre-seek PCM
                        // reach the sink, and a stop exits next round.
                        Ok(WriteStatus::Drained | WriteStatus::Interrupted) => {}
                        Err(e) => {
                            let _ = self.events.send(PipelineEvent::Failed(e));
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!("end of stream");
                    let _ = self.events.send(PipelineEvent::Completed);
                    self.drain_tail();
                    break;
                }
                Err(e) => {
                    let _ = self.events.send(PipelineEvent::Failed(e));
                    break;
                }
            }
        }

        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.stop();
        }
        self.decoder.close();
    }

    /// Reposition decoder and sink to `target_ms`
    ///
    /// Flushes queued pre-seek audio, resets the decoder to the nearest
    /// sync point and zeroes the effect history so nothing from before
    /// the seek can be heard after it.
    fn reposition(&mut self, target_ms: u64) -> Result<u64> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush().map_err(|e| AudioError::Sink(e.to_string()))?;
        }
        let actual_ms = self.decoder.seek(target_ms)?;
        if let Some(effect) = self.effect.as_mut() {
            effect.reset();
        }
        tracing::debug!(target_ms, actual_ms, "repositioned");
        Ok(actual_ms)
    }

    /// Pick up a Haas delay change requested from the control thread
    fn apply_pending_delay(&mut self) {
        if let Some(effect) = self.effect.as_mut() {
            let requested = self.control.spatial_delay_ms();
            if requested != effect.delay_ms() {
                effect.set_delay_ms(requested);
            }
        }
    }

    /// Start or pause the sink, tracking its state locally
    fn set_sink_playing(&mut self, playing: bool) {
        if self.sink_playing == playing {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            let result = if playing { sink.play() } else { sink.pause() };
            if result.is_ok() {
                self.sink_playing = playing;
            }
        }
    }

    /// Drain one chunk into the sink, retrying partial writes
    ///
    /// Backpressure (zero accepted samples) is waited out with a short
    /// backoff; stop and seek requests interrupt the drain immediately,
    /// and a pause holds the drain without dropping the remainder.
    fn write_chunk(&mut self, samples: &[i16]) -> Result<WriteStatus> {
        let sink = self.sink.as_mut().ok_or(AudioError::NoFileOpen)?;
        let mut written = 0;

        while written < samples.len() {
            if self.control.is_stopped() || self.control.seek_pending() {
                return Ok(WriteStatus::Interrupted);
            }
            if self.control.is_paused() {
                if self.sink_playing {
                    let _ = sink.pause();
                    self.sink_playing = false;
                }
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            if !self.sink_playing {
                sink.play().map_err(|e| AudioError::Sink(e.to_string()))?;
                self.sink_playing = true;
            }

            let accepted = sink
                .write(&samples[written..])
                .map_err(|e| AudioError::Sink(e.to_string()))?;
            written += accepted;
            if accepted == 0 {
                thread::sleep(WRITE_BACKOFF);
            }
        }
        Ok(WriteStatus::Drained)
    }

    /// Let buffered audio play out after end of stream
    ///
    /// Keeps the worker alive until the sink runs dry so the audible tail
    /// is not cut off when the sink is dropped. A stop request ends the
    /// wait immediately.
    fn drain_tail(&mut self) {
        while !self.control.is_stopped() {
            let buffered = self.sink.as_ref().map(|s| s.buffered()).unwrap_or(0);
            if buffered == 0 || self.control.is_paused() {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
