//! CPAL-based output sink
//!
//! A dedicated audio thread owns the CPAL `Stream` (which is not `Send`
//! on every platform); the control side talks to it through shared state
//! and a command channel. The decode thread feeds a bounded sample
//! queue. When the queue is full, `write` accepts fewer samples and the
//! decode loop backs off, which is the pipeline's flow control.

use crate::error::AudioError;
use aura_core::{AudioSink, AudioSpec};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Queued audio kept ahead of the device, in milliseconds
const QUEUE_CAPACITY_MS: u32 = 500;

/// Commands for the audio thread
enum SinkCommand {
    /// Tear the stream down and exit the thread
    Shutdown,
}

/// State shared between the decode thread and the audio callback
struct SinkShared {
    /// Interleaved i16 samples waiting to be played
    queue: Mutex<VecDeque<i16>>,

    /// Whether the callback should consume the queue or output silence
    playing: AtomicBool,
}

/// CPAL output sink for interleaved 16-bit stereo PCM
pub struct CpalSink {
    shared: Arc<SinkShared>,
    command_tx: Sender<SinkCommand>,
    spec: AudioSpec,
    capacity: usize,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device at the given stream spec
    ///
    /// # Errors
    /// Returns an error when no output device exists or the stream cannot
    /// be built at the requested rate.
    pub fn for_spec(spec: AudioSpec) -> aura_core::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Sink("no output device".to_string()))?;

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(SinkShared {
            queue: Mutex::new(VecDeque::new()),
            playing: AtomicBool::new(false),
        });
        let capacity = (spec.samples_per_ms() * u64::from(QUEUE_CAPACITY_MS)) as usize;

        let (command_tx, command_rx) = bounded::<SinkCommand>(4);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);

        // The Stream must be created and dropped on the thread that owns
        // it; build it there and report the outcome back once.
        let callback_shared = Arc::clone(&shared);
        let audio_thread = thread::spawn(move || {
            let data_shared = Arc::clone(&callback_shared);
            let stream = device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_output(&data_shared, data);
                },
                |e| tracing::warn!("cpal stream error: {e}"),
                None,
            );

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Keep the stream alive until shutdown.
            while let Ok(command) = command_rx.recv() {
                match command {
                    SinkCommand::Shutdown => break,
                }
            }
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => {
                let _ = audio_thread.join();
                return Err(AudioError::Sink(msg).into());
            }
            Err(_) => {
                let _ = audio_thread.join();
                return Err(AudioError::Sink("audio thread died during setup".to_string()).into());
            }
        }

        tracing::debug!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "cpal sink opened"
        );

        Ok(Self {
            shared,
            command_tx,
            spec,
            capacity,
            audio_thread: Some(audio_thread),
        })
    }
}

/// Fill one callback buffer from the shared queue
///
/// Outputs silence while paused or starved; starvation is not an error,
/// the decode thread simply has not caught up.
fn fill_output(shared: &SinkShared, data: &mut [f32]) {
    if !shared.playing.load(Ordering::Acquire) {
        data.fill(0.0);
        return;
    }

    let mut queue = match shared.queue.lock() {
        Ok(queue) => queue,
        Err(_) => {
            data.fill(0.0);
            return;
        }
    };
    for slot in data.iter_mut() {
        *slot = match queue.pop_front() {
            Some(sample) => f32::from(sample) / 32768.0,
            None => 0.0,
        };
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, samples: &[i16]) -> aura_core::Result<usize> {
        let mut queue = self
            .shared
            .queue
            .lock()
            .map_err(|_| aura_core::AuraError::sink("queue poisoned"))?;
        let available = self.capacity.saturating_sub(queue.len());
        let accepted = available.min(samples.len());
        queue.extend(&samples[..accepted]);
        Ok(accepted)
    }

    fn play(&mut self) -> aura_core::Result<()> {
        self.shared.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) -> aura_core::Result<()> {
        self.shared.playing.store(false, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) -> aura_core::Result<()> {
        self.shared.playing.store(false, Ordering::Release);
        self.flush()
    }

    fn flush(&mut self) -> aura_core::Result<()> {
        let mut queue = self
            .shared
            .queue
            .lock()
            .map_err(|_| aura_core::AuraError::sink("queue poisoned"))?;
        queue.clear();
        Ok(())
    }

    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn buffered(&self) -> usize {
        self.shared.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SinkCommand::Shutdown);
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
    }
}
