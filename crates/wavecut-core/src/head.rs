//! Playback-head state.
//!
//! `HeadState` is plain data, always mutated under its sample's play
//! lock. The read/interpolation algorithm itself lives in the audio
//! crate; this type only carries the cursor, rate and mode flags.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-head playback state.
#[derive(Debug, Clone)]
pub struct HeadState {
    /// Floating-point read position in frames.
    pub offset: f64,
    /// Target position while scrubbing (user-driven).
    pub user_offset: f64,
    /// Rate multiplier (1.0 = native speed).
    pub rate: f64,
    /// Linear gain applied to every emitted sample.
    pub gain: f32,
    /// Smoothed per-frame advance. Converges toward the rate target
    /// with an exponential ease rather than stepping, to avoid clicks.
    pub delta: f64,

    pub going: bool,
    pub looping: bool,
    pub reverse: bool,
    pub mute: bool,
    pub monitor: bool,
    pub scrubbing: bool,
    /// True while the user is actively dragging the scrub target;
    /// false once released (the head then decelerates onto the target).
    pub scrub_dragging: bool,
    pub previewing: bool,
    pub restricted: bool,

    /// Optional frame at which the head stops by itself.
    pub stop_offset: Option<usize>,
    /// Whether an alloc-class edit paused a head that was going.
    pub resume_after_edit: bool,
    /// Offset as last corrected against the device's reported position.
    pub reported_offset: f64,
    /// Remaining free-run frames for preview pre/post-roll.
    pub roll_frames_left: f64,
    /// Last two output samples per channel, for the scrub smoothing blend.
    pub smooth: Vec<[f32; 2]>,
}

impl HeadState {
    pub fn new() -> Self {
        Self {
            offset: 0.0,
            user_offset: 0.0,
            rate: 1.0,
            gain: 1.0,
            delta: 0.0,
            going: false,
            looping: false,
            reverse: false,
            mute: false,
            monitor: false,
            scrubbing: false,
            scrub_dragging: false,
            previewing: false,
            restricted: false,
            stop_offset: None,
            resume_after_edit: false,
            reported_offset: 0.0,
            roll_frames_left: 0.0,
            smooth: Vec::new(),
        }
    }

    /// Force playback off for an alloc-class edit, remembering whether
    /// it should resume afterwards.
    pub fn pause_for_edit(&mut self) {
        if self.going {
            self.resume_after_edit = true;
            self.going = false;
        }
    }

    /// Restore playback paused by [`pause_for_edit`](Self::pause_for_edit).
    pub fn resume_after_edit(&mut self) {
        if self.resume_after_edit {
            self.resume_after_edit = false;
            self.going = true;
        }
    }

    /// Reset the smoothing memory for `channels` channels.
    pub fn reset_smoothing(&mut self, channels: u16) {
        self.smooth.clear();
        self.smooth.resize(channels as usize, [0.0; 2]);
    }
}

impl Default for HeadState {
    fn default() -> Self {
        Self::new()
    }
}

/// `f64` stored in an atomic, for lock-free tempo reads from the audio
/// thread. Relaxed ordering: visibility only, no synchronization.
#[derive(Debug)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}
