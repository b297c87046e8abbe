//! Haas (precedence) stereo widening effect
//!
//! Delays the right channel by a few tens of milliseconds relative to the
//! left, which the ear reads as a wider stereo image rather than an echo.
//! The left channel always passes through untouched.

/// Upper bound for the configurable delay, in milliseconds
pub const MAX_HAAS_DELAY_MS: u32 = 100;

/// Stereo widening via a delayed right channel
///
/// Both channels are written into fixed-capacity circular buffers sized
/// for [`MAX_HAAS_DELAY_MS`] at the stream's sample rate. The buffers are
/// allocated once at construction and never grow, so `process` is safe to
/// call from the real-time decode thread; changing the delay merely
/// reinterprets the read offset into the existing buffer.
#[derive(Debug)]
pub struct HaasEffect {
    /// Sample rate the buffers were sized for
    sample_rate: u32,

    /// Requested delay in milliseconds, clamped to `0..=MAX_HAAS_DELAY_MS`
    delay_ms: u32,

    /// Delay converted to samples per channel
    delay_samples: usize,

    /// History of left-channel input (kept for symmetry and future
    /// left-delay modes; reads currently come from the right buffer only)
    buffer_left: Vec<i16>,

    /// History of right-channel input
    buffer_right: Vec<i16>,

    /// Next write position in both circular buffers
    write_index: usize,
}

impl HaasEffect {
    /// Create an effect for the given stream sample rate with no delay
    pub fn new(sample_rate: u32) -> Self {
        let capacity = Self::capacity_for(sample_rate);
        Self {
            sample_rate,
            delay_ms: 0,
            delay_samples: 0,
            buffer_left: vec![0; capacity],
            buffer_right: vec![0; capacity],
            write_index: 0,
        }
    }

    /// Buffer capacity for the maximum delay at `sample_rate`
    ///
    /// At least 1 so the modular arithmetic stays valid for degenerate
    /// sample rates.
    fn capacity_for(sample_rate: u32) -> usize {
        ((MAX_HAAS_DELAY_MS * sample_rate) / 1000).max(1) as usize
    }

    /// Set the right-channel delay in milliseconds
    ///
    /// Values outside `0..=MAX_HAAS_DELAY_MS` are clamped. A delay of 0
    /// makes `process` the identity transform.
    pub fn set_delay_ms(&mut self, delay_ms: u32) {
        let clamped = delay_ms.min(MAX_HAAS_DELAY_MS);
        self.delay_ms = clamped;
        self.delay_samples = ((clamped * self.sample_rate) / 1000) as usize;
    }

    /// Current delay in milliseconds
    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Zero the delay history
    ///
    /// Called when a new track is prepared or after a reposition so that
    /// stale audio never bleeds into the new content.
    pub fn reset(&mut self) {
        self.buffer_left.fill(0);
        self.buffer_right.fill(0);
        self.write_index = 0;
    }

    /// Process interleaved stereo samples in place
    ///
    /// Left passes through; right is replaced by the right-channel input
    /// from `delay_ms` earlier. A trailing unpaired sample (odd-length
    /// slice) is left untouched.
    pub fn process(&mut self, samples: &mut [i16]) {
        if self.delay_samples == 0 || samples.len() < 2 {
            return;
        }

        let capacity = self.buffer_left.len();
        let delay = self.delay_samples.min(capacity);

        for frame in samples.chunks_exact_mut(2) {
            // Read before writing: at the maximum delay the read slot is
            // the write slot, and it must still hold the sample from a
            // full buffer ago.
            let read_index = (self.write_index + capacity - delay) % capacity;
            let delayed = self.buffer_right[read_index];

            self.buffer_left[self.write_index] = frame[0];
            self.buffer_right[self.write_index] = frame[1];
            frame[1] = delayed;

            self.write_index = (self.write_index + 1) % capacity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 48_000;

    /// Interleave an impulse on both channels at frame `at`
    fn impulse(frames: usize, at: usize) -> Vec<i16> {
        let mut samples = vec![0i16; frames * 2];
        samples[at * 2] = 10_000;
        samples[at * 2 + 1] = 10_000;
        samples
    }

    #[test]
    fn zero_delay_is_identity() {
        let mut effect = HaasEffect::new(SAMPLE_RATE);
        effect.set_delay_ms(0);

        let original = impulse(256, 17);
        let mut processed = original.clone();
        effect.process(&mut processed);
        assert_eq!(processed, original);
    }

    #[test]
    fn right_channel_is_delayed_by_configured_ms() {
        let mut effect = HaasEffect::new(SAMPLE_RATE);
        effect.set_delay_ms(10);
        let delay_samples = (10 * SAMPLE_RATE / 1000) as usize;

        let frames = delay_samples + 64;
        let mut samples = impulse(frames, 0);
        effect.process(&mut samples);

        // Left untouched
        assert_eq!(samples[0], 10_000);
        // Right impulse moved exactly delay_samples frames later
        assert_eq!(samples[1], 0);
        assert_eq!(samples[delay_samples * 2 + 1], 10_000);
        for (i, frame) in samples.chunks_exact(2).enumerate() {
            if i != delay_samples {
                assert_eq!(frame[1], 0, "unexpected right-channel energy at frame {i}");
            }
        }
    }

    #[test]
    fn delay_spans_process_calls() {
        let mut effect = HaasEffect::new(SAMPLE_RATE);
        effect.set_delay_ms(10);
        let delay_samples = (10 * SAMPLE_RATE / 1000) as usize;

        // Impulse at the end of the first block, read back in the second
        let block = delay_samples / 2;
        let mut first = impulse(block, block - 1);
        effect.process(&mut first);
        assert!(first.chunks_exact(2).all(|f| f[1] == 0));

        let mut second = vec![0i16; delay_samples * 2];
        effect.process(&mut second);
        // Impulse was written at frame block-1; it surfaces delay_samples
        // frames later, which lands at index delay-1 of the second block.
        let expected_frame = delay_samples - 1;
        assert_eq!(second[expected_frame * 2 + 1], 10_000);
    }

    #[test]
    fn maximum_delay_uses_the_full_buffer() {
        // At 100 ms the delay equals the buffer capacity, so the read
        // position coincides with the write position. The impulse must
        // still come back a full buffer later, not immediately.
        let sample_rate = 8_000;
        let mut effect = HaasEffect::new(sample_rate);
        effect.set_delay_ms(MAX_HAAS_DELAY_MS);
        let delay_samples = (MAX_HAAS_DELAY_MS * sample_rate / 1000) as usize;

        let mut samples = impulse(delay_samples + 64, 0);
        effect.process(&mut samples);

        assert_eq!(samples[0], 10_000);
        assert_eq!(samples[1], 0, "impulse passed through undelayed");
        assert_eq!(samples[delay_samples * 2 + 1], 10_000);
    }

    #[test]
    fn set_delay_clamps_to_maximum() {
        let mut effect = HaasEffect::new(SAMPLE_RATE);
        effect.set_delay_ms(5_000);
        assert_eq!(effect.delay_ms(), MAX_HAAS_DELAY_MS);
    }

    #[test]
    fn reset_clears_history() {
        let mut effect = HaasEffect::new(SAMPLE_RATE);
        effect.set_delay_ms(20);

        let mut loud = vec![i16::MAX; 2048];
        effect.process(&mut loud);
        effect.reset();

        let mut silence = vec![0i16; 2048];
        effect.process(&mut silence);
        assert!(silence.iter().all(|&s| s == 0), "stale audio bled through");
    }

    #[test]
    fn changing_delay_does_not_reallocate() {
        let mut effect = HaasEffect::new(SAMPLE_RATE);
        let capacity = effect.buffer_right.len();
        effect.set_delay_ms(100);
        effect.set_delay_ms(1);
        effect.set_delay_ms(73);
        assert_eq!(effect.buffer_right.len(), capacity);
        assert_eq!(effect.buffer_left.len(), capacity);
    }
}
