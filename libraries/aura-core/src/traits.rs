//! Core traits for the Aura playback engine

use crate::error::Result;
use crate::types::AudioSpec;

/// Output sink for interleaved 16-bit PCM
///
/// A sink accepts frames at a fixed spec for the life of a playback
/// session. `write` is the backpressure point of the whole pipeline: a
/// slow or full device accepts fewer samples than offered (possibly zero)
/// and the decode loop retries the remainder. Partial acceptance is flow
/// control, not an error.
pub trait AudioSink: Send {
    /// Offer interleaved samples to the sink
    ///
    /// Returns how many samples were accepted, `0..=samples.len()`.
    ///
    /// # Errors
    /// Returns an error only when the device is unusable, never for a
    /// full buffer.
    fn write(&mut self, samples: &[i16]) -> Result<usize>;

    /// Start or resume audible output
    fn play(&mut self) -> Result<()>;

    /// Pause audible output, retaining buffered samples
    fn pause(&mut self) -> Result<()>;

    /// Stop output and release device resources
    fn stop(&mut self) -> Result<()>;

    /// Discard all buffered but not yet played samples
    fn flush(&mut self) -> Result<()>;

    /// The spec this sink was opened with
    fn spec(&self) -> AudioSpec;

    /// Samples accepted but not yet played (best effort; used for tests
    /// and diagnostics, not for position tracking)
    fn buffered(&self) -> usize {
        0
    }
}
