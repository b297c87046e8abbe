//! Aura Player - Audio Engine
//!
//! Streaming decode pipeline for the Aura playback core.
//!
//! This crate provides:
//! - [`SymphoniaDecoder`]: demux + decode of one compressed audio
//!   elementary stream per file into interleaved stereo 16-bit PCM
//! - [`HaasEffect`]: real-time-safe stereo widening (right-channel delay)
//! - [`DecodePipeline`]: the worker-thread loop that streams decoded PCM
//!   through the effect into an [`aura_core::AudioSink`] under
//!   backpressure, honoring stop/pause/seek requests
//! - `CpalSink` (feature `desktop`): CPAL-backed output sink
//!
//! The pipeline never assumes a UI thread exists; readiness, completion
//! and failure are reported over a channel of [`PipelineEvent`]s that the
//! owning session drains on its own thread.

#![forbid(unsafe_code)]

pub mod decoder;
pub mod effects;
pub mod error;
pub mod pipeline;

#[cfg(feature = "desktop")]
pub mod sink;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use decoder::SymphoniaDecoder;
pub use effects::{HaasEffect, MAX_HAAS_DELAY_MS};
pub use error::{AudioError, Result};
pub use pipeline::{DecodePipeline, PipelineControl, PipelineEvent, SinkFactory};

#[cfg(feature = "desktop")]
pub use sink::CpalSink;
