//! Test helpers: an in-memory capture sink and WAV fixture writers
//!
//! Only compiled for tests or with the `test-utils` feature, mirroring
//! how integration suites across the workspace exercise the pipeline
//! without a real audio device.

use aura_core::{AudioSink, AudioSpec};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Shared state behind a [`CaptureSink`] and its [`CaptureHandle`]
#[derive(Debug)]
struct CaptureInner {
    /// Samples accepted but not yet "played"
    pending: VecDeque<i16>,
    /// Samples that made it through while playing, in arrival order
    played: Vec<i16>,
    /// Whether the sink is currently playing
    playing: bool,
    /// Number of `play` calls observed
    play_calls: usize,
    /// Number of `pause` calls observed
    pause_calls: usize,
    /// Number of `flush` calls observed
    flush_calls: usize,
    /// Whether `stop` was called
    stopped: bool,
    /// Samples per second drained while playing; `None` drains instantly
    pace: Option<u64>,
    /// Start of the current play period (paced mode)
    anchor: Option<Instant>,
    /// Samples drained since `anchor` (paced mode)
    drained_since_anchor: u64,
}

/// In-memory sink model
///
/// Accepted samples sit in a bounded pending queue until they are
/// "played" into the `played` record, which is what gives the decode
/// loop real backpressure to push against. The default sinks drain the
/// queue instantly while playing; [`CaptureSink::realtime`] drains at
/// the stream's sample rate instead, modeling an actual output device
/// so tests can interact with a stream mid-flight. `flush` discards only
/// the pending queue, like a device dropping not-yet-rendered frames.
pub struct CaptureSink {
    spec: AudioSpec,
    capacity: usize,
    inner: Arc<Mutex<CaptureInner>>,
}

/// Inspection handle kept by the test while the sink lives on the worker
#[derive(Clone)]
pub struct CaptureHandle {
    inner: Arc<Mutex<CaptureInner>>,
}

impl CaptureSink {
    /// Create an instant-drain sink with effectively unlimited capacity
    pub fn new(spec: AudioSpec) -> (Self, CaptureHandle) {
        Self::with_capacity(spec, usize::MAX / 2)
    }

    /// Create an instant-drain sink holding at most `capacity` samples
    pub fn with_capacity(spec: AudioSpec, capacity: usize) -> (Self, CaptureHandle) {
        Self::build(spec, capacity, None)
    }

    /// Create a sink that plays at the spec's real-time rate
    pub fn realtime(spec: AudioSpec, capacity: usize) -> (Self, CaptureHandle) {
        let pace = u64::from(spec.sample_rate) * u64::from(spec.channels);
        Self::build(spec, capacity, Some(pace))
    }

    fn build(spec: AudioSpec, capacity: usize, pace: Option<u64>) -> (Self, CaptureHandle) {
        let inner = Arc::new(Mutex::new(CaptureInner {
            pending: VecDeque::new(),
            played: Vec::new(),
            playing: false,
            play_calls: 0,
            pause_calls: 0,
            flush_calls: 0,
            stopped: false,
            pace,
            anchor: None,
            drained_since_anchor: 0,
        }));
        let handle = CaptureHandle {
            inner: Arc::clone(&inner),
        };
        (
            Self {
                spec,
                capacity,
                inner,
            },
            handle,
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CaptureInner> {
        self.inner.lock().expect("capture sink poisoned")
    }
}

impl CaptureInner {
    /// Move due pending samples into the played record
    fn drain(&mut self) {
        if !self.playing {
            return;
        }
        match self.pace {
            None => {
                self.played.extend(self.pending.drain(..));
            }
            Some(rate) => {
                let Some(anchor) = self.anchor else { return };
                let allowed = anchor.elapsed().as_micros() as u64 * rate / 1_000_000;
                let due = allowed.saturating_sub(self.drained_since_anchor) as usize;
                let take = due.min(self.pending.len());
                self.played.extend(self.pending.drain(..take));
                self.drained_since_anchor += take as u64;
            }
        }
    }
}

impl AudioSink for CaptureSink {
    fn write(&mut self, samples: &[i16]) -> aura_core::Result<usize> {
        let capacity = self.capacity;
        let mut inner = self.lock();
        inner.drain();
        let available = capacity.saturating_sub(inner.pending.len());
        let accepted = available.min(samples.len());
        inner.pending.extend(&samples[..accepted]);
        inner.drain();
        Ok(accepted)
    }

    fn play(&mut self) -> aura_core::Result<()> {
        let mut inner = self.lock();
        inner.playing = true;
        inner.play_calls += 1;
        inner.anchor = Some(Instant::now());
        inner.drained_since_anchor = 0;
        inner.drain();
        Ok(())
    }

    fn pause(&mut self) -> aura_core::Result<()> {
        let mut inner = self.lock();
        inner.drain();
        inner.playing = false;
        inner.pause_calls += 1;
        inner.anchor = None;
        Ok(())
    }

    fn stop(&mut self) -> aura_core::Result<()> {
        let mut inner = self.lock();
        inner.playing = false;
        inner.stopped = true;
        inner.pending.clear();
        Ok(())
    }

    fn flush(&mut self) -> aura_core::Result<()> {
        let mut inner = self.lock();
        inner.flush_calls += 1;
        inner.pending.clear();
        Ok(())
    }

    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn buffered(&self) -> usize {
        let mut inner = self.lock();
        inner.drain();
        inner.pending.len()
    }
}

impl CaptureHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, CaptureInner> {
        self.inner.lock().expect("capture sink poisoned")
    }

    /// Snapshot of everything played so far
    pub fn played(&self) -> Vec<i16> {
        let mut inner = self.lock();
        inner.drain();
        inner.played.clone()
    }

    /// Number of samples played so far
    pub fn played_len(&self) -> usize {
        let mut inner = self.lock();
        inner.drain();
        inner.played.len()
    }

    /// Number of samples accepted but not yet played
    pub fn pending_len(&self) -> usize {
        let mut inner = self.lock();
        inner.drain();
        inner.pending.len()
    }

    /// Whether the sink is currently playing
    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// How often `play` was called
    pub fn play_calls(&self) -> usize {
        self.lock().play_calls
    }

    /// How often `pause` was called
    pub fn pause_calls(&self) -> usize {
        self.lock().pause_calls
    }

    /// How often `flush` was called
    pub fn flush_calls(&self) -> usize {
        self.lock().flush_calls
    }
}

/// Write a mono 16-bit PCM WAV of a sine tone
///
/// # Panics
/// Panics on I/O failure; fixtures are test-only.
pub fn write_sine_wav(path: &Path, sample_rate: u32, duration_ms: u64, freq: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    let frames = sample_rate as u64 * duration_ms / 1000;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = ((2.0 * std::f32::consts::PI * freq * t).sin() * 16_000.0) as i16;
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Write a mono WAV whose sample value equals its frame index
///
/// Lets tests recover the source position of any decoded sample, which
/// is how seek accuracy is asserted. `duration_ms` at `sample_rate` must
/// stay below `i16::MAX` frames.
pub fn write_ramp_wav(path: &Path, sample_rate: u32, duration_ms: u64) {
    let frames = sample_rate as u64 * duration_ms / 1000;
    assert!(
        frames <= i16::MAX as u64,
        "ramp fixture would overflow i16 sample values"
    );
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for i in 0..frames {
        writer.write_sample(i as i16).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}
