//! Wall-clock-referenced playback position
//!
//! The output sink buffers ahead of what has been heard, so "frames
//! consumed by the decoder" runs early by the sink's buffer depth.
//! Elapsed wall-clock time since the last transition is the closer
//! estimate of audible position, so that is what this clock measures:
//! each play/pause/seek records a reference instant and the accumulated
//! offset at that instant.

use std::time::Instant;

/// Playback position estimator
///
/// Invariants: `position_ms()` is monotonically non-decreasing between
/// two reads with no intervening pause/seek, exactly stable while
/// paused, and clamped to `0..=duration_ms` once the duration is known.
#[derive(Debug, Clone)]
pub struct PositionClock {
    /// Anchor instant; `Some` while the clock is advancing
    reference: Option<Instant>,

    /// Position at the anchor (or the frozen position while paused)
    offset_ms: u64,

    /// Upper clamp; 0 means the duration is not known yet
    duration_ms: u64,
}

impl PositionClock {
    /// Create a stopped clock at position 0
    pub fn new() -> Self {
        Self {
            reference: None,
            offset_ms: 0,
            duration_ms: 0,
        }
    }

    /// Record the duration once the container reports it
    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    /// Known duration (0 = unknown)
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Anchor the clock and start advancing
    ///
    /// Idempotent while already running: the existing anchor stands.
    pub fn start(&mut self) {
        if self.reference.is_none() {
            self.reference = Some(Instant::now());
        }
    }

    /// Freeze the position at its current value
    pub fn pause(&mut self) {
        self.offset_ms = self.position_ms();
        self.reference = None;
    }

    /// Jump to `target_ms`, re-anchoring if currently advancing
    pub fn seek(&mut self, target_ms: u64) {
        self.offset_ms = self.clamp(target_ms);
        if self.reference.is_some() {
            self.reference = Some(Instant::now());
        }
    }

    /// Current position estimate in milliseconds
    pub fn position_ms(&self) -> u64 {
        let raw = match self.reference {
            Some(anchor) => self.offset_ms + anchor.elapsed().as_millis() as u64,
            None => self.offset_ms,
        };
        self.clamp(raw)
    }

    /// Whether the clock is currently advancing
    pub fn is_running(&self) -> bool {
        self.reference.is_some()
    }

    fn clamp(&self, position_ms: u64) -> u64 {
        if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        }
    }
}

impl Default for PositionClock {
    fn default() -> Self {
        Self::new()
    }
}
