//! Engine configuration.
//!
//! Behavioral tuning lives here rather than as scattered constants so
//! hosts can load it from JSON. The scrub blend coefficients are
//! empirically tuned feel constants carried over from long use; change
//! them and scrubbing stops feeling like a needle drag.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum registered operations kept per sample. `None` = unbounded.
    pub history_limit: Option<usize>,
    pub mixer: MixerConfig,
    pub scrub: ScrubTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: Some(200),
            mixer: MixerConfig::default(),
            scrub: ScrubTuning::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| crate::error::WavecutError::InvalidParameter(e.to_string()))
    }
}

/// Mixer / playback-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Frames per mixer iteration.
    pub buffer_frames: usize,
    /// Output channel count requested from the device.
    pub channels: u16,
    /// Sample rate requested from the device.
    pub sample_rate: u32,
    /// Consecutive all-silent iterations before the mixer thread exits.
    pub silent_iterations: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            buffer_frames: 1024,
            channels: 2,
            sample_rate: 44100,
            silent_iterations: 16,
        }
    }
}

/// Scrub-feel tuning.
///
/// `active_keep`/`release_keep` are the fraction of the previous delta
/// kept per frame while converging on the user target: 0.9 while the
/// user is dragging (fast rubber band), 0.99 once released (slow
/// deceleration). Preserved exactly for behavioral parity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubTuning {
    pub active_keep: f64,
    pub release_keep: f64,
    /// Time constant, in frames, dividing the distance to the target.
    pub time_constant_frames: f64,
    /// Free-run pre/post-roll around restricted playback, in seconds.
    pub preview_roll_secs: f64,
}

impl Default for ScrubTuning {
    fn default() -> Self {
        Self {
            active_keep: 0.9,
            release_keep: 0.99,
            time_constant_frames: 2048.0,
            preview_roll_secs: 1.0,
        }
    }
}
