//! Property-based tests for the audio engine
//!
//! These tests use proptest to verify invariants across many random inputs.

use aura_audio::effects::{HaasEffect, MAX_HAAS_DELAY_MS};
use proptest::prelude::*;

proptest! {
    /// The left channel passes through untouched for any input and delay
    #[test]
    fn haas_left_channel_is_never_modified(
        delay_ms in 0u32..=MAX_HAAS_DELAY_MS,
        samples in prop::collection::vec(any::<i16>(), 2..4096)
    ) {
        let mut effect = HaasEffect::new(44_100);
        effect.set_delay_ms(delay_ms);

        let original = samples.clone();
        let mut processed = samples;
        effect.process(&mut processed);

        for (i, (before, after)) in original
            .chunks_exact(2)
            .zip(processed.chunks_exact(2))
            .enumerate()
        {
            prop_assert_eq!(before[0], after[0], "left sample changed at frame {}", i);
        }
    }

    /// Every right-channel output sample is either silence from the
    /// still-filling delay line or an exact right-channel input sample
    #[test]
    fn haas_right_channel_only_replays_input(
        delay_ms in 1u32..=MAX_HAAS_DELAY_MS,
        samples in prop::collection::vec(1i16..=i16::MAX, 2..4096)
    ) {
        let mut effect = HaasEffect::new(8_000);
        effect.set_delay_ms(delay_ms);
        let delay_samples = (delay_ms * 8_000 / 1000) as usize;

        let original = samples.clone();
        let mut processed = samples;
        effect.process(&mut processed);

        for (i, frame) in processed.chunks_exact(2).enumerate() {
            if i < delay_samples {
                prop_assert_eq!(frame[1], 0, "delay line leaked at frame {}", i);
            } else {
                let source = original[(i - delay_samples) * 2 + 1];
                prop_assert_eq!(frame[1], source, "wrong history at frame {}", i);
            }
        }
    }

    /// Splitting the input into arbitrary blocks never changes the output
    #[test]
    fn haas_is_block_size_invariant(
        delay_ms in 0u32..=MAX_HAAS_DELAY_MS,
        split in 1usize..512,
        samples in prop::collection::vec(any::<i16>(), 64..2048)
    ) {
        let mut whole = HaasEffect::new(16_000);
        whole.set_delay_ms(delay_ms);
        let mut one_pass = samples.clone();
        whole.process(&mut one_pass);

        let mut chunked = HaasEffect::new(16_000);
        chunked.set_delay_ms(delay_ms);
        let mut many_passes = samples;
        for block in many_passes.chunks_mut(split * 2) {
            chunked.process(block);
        }

        prop_assert_eq!(one_pass, many_passes);
    }

    /// After a reset, silence in means silence out regardless of history
    #[test]
    fn haas_reset_forgets_all_history(
        delay_ms in 1u32..=MAX_HAAS_DELAY_MS,
        noise in prop::collection::vec(any::<i16>(), 2..2048)
    ) {
        let mut effect = HaasEffect::new(44_100);
        effect.set_delay_ms(delay_ms);

        let mut warmup = noise;
        effect.process(&mut warmup);
        effect.reset();

        let mut silence = vec![0i16; 2048];
        effect.process(&mut silence);
        prop_assert!(silence.iter().all(|&s| s == 0));
    }
}
