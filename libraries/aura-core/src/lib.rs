//! Aura Player Core
//!
//! Platform-agnostic core types, traits, and error handling for the Aura
//! playback engine.
//!
//! This crate defines:
//! - **Domain Types**: `Track`, `AudioSpec`, `StreamInfo`, `Tags`
//! - **The output seam**: the [`AudioSink`] trait that decouples the decode
//!   pipeline from the platform audio device
//! - **Error Handling**: unified [`AuraError`] and [`Result`] types
//!
//! # Example
//!
//! ```rust
//! use aura_core::Track;
//! use std::path::PathBuf;
//!
//! // A track starts out with nothing but its path; metadata arrives
//! // once the container has been opened.
//! let track = Track::new(PathBuf::from("/music/song.mp3"));
//! assert_eq!(track.duration_ms, 0);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{AuraError, Result};
pub use traits::AudioSink;
pub use types::{AudioSpec, StreamInfo, Tags, Track};
