//! Wavecut Core - Foundation types for the sample editor engine
//!
//! This crate provides the fundamental types used throughout Wavecut:
//! - Sound data (interleaved buffer + format)
//! - Selection regions
//! - Playback-head state
//! - Engine configuration and errors

pub mod config;
pub mod error;
pub mod head;
pub mod selection;
pub mod sound;

pub use config::{EngineConfig, MixerConfig, ScrubTuning};
pub use error::{Result, WavecutError};
pub use head::{AtomicF64, HeadState};
pub use selection::{Region, SelectionList};
pub use sound::SoundData;
