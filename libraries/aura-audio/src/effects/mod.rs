//! Audio effects processing
//!
//! Effects operate in place on interleaved stereo i16 PCM, on the decode
//! thread, between the decoder and the output sink. They must be
//! real-time safe: no allocation inside `process`.

mod haas;

pub use haas::{HaasEffect, MAX_HAAS_DELAY_MS};
