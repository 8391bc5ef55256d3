//! Sound data — the mutable audio buffer plus its format.
//!
//! Frames are interleaved `f32` samples. All span arguments are in
//! frames; a span of `len` frames covers `len * channels` samples.

use crate::error::{Result, WavecutError};

/// Interleaved audio buffer with format metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundData {
    data: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SoundData {
    /// Create a silent buffer of `frames` frames.
    pub fn silence(frames: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            data: vec![0.0; frames * channels as usize],
            channels,
            sample_rate,
        }
    }

    /// Create a buffer from existing interleaved samples.
    ///
    /// The sample count must be a whole number of frames.
    pub fn from_interleaved(data: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(WavecutError::InvalidParameter(
                "channel count must be non-zero".into(),
            ));
        }
        if data.len() % channels as usize != 0 {
            return Err(WavecutError::InvalidParameter(format!(
                "{} samples is not a whole number of {}-channel frames",
                data.len(),
                channels
            )));
        }
        Ok(Self {
            data,
            channels,
            sample_rate,
        })
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Native sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Change the declared native rate without touching the samples.
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
    }

    /// One sample, by frame and channel. Out-of-bounds reads are silence.
    #[inline]
    pub fn sample(&self, frame: usize, channel: u16) -> f32 {
        if frame >= self.frames() || channel >= self.channels {
            return 0.0;
        }
        self.data[frame * self.channels as usize + channel as usize]
    }

    /// The whole interleaved buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the whole interleaved buffer.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Interleaved view of a frame span.
    pub fn span(&self, start: usize, len: usize) -> Result<&[f32]> {
        self.check_span(start, len)?;
        let ch = self.channels as usize;
        Ok(&self.data[start * ch..(start + len) * ch])
    }

    /// Mutable interleaved view of a frame span.
    pub fn span_mut(&mut self, start: usize, len: usize) -> Result<&mut [f32]> {
        self.check_span(start, len)?;
        let ch = self.channels as usize;
        Ok(&mut self.data[start * ch..(start + len) * ch])
    }

    /// Copy a frame span out of the buffer.
    pub fn copy_span(&self, start: usize, len: usize) -> Result<Vec<f32>> {
        Ok(self.span(start, len)?.to_vec())
    }

    /// Remove a frame span, returning the removed samples.
    ///
    /// This reallocates and is therefore an alloc-class mutation.
    pub fn delete_span(&mut self, start: usize, len: usize) -> Result<Vec<f32>> {
        self.check_span(start, len)?;
        let ch = self.channels as usize;
        Ok(self.data.drain(start * ch..(start + len) * ch).collect())
    }

    /// Insert interleaved samples before frame `at`.
    ///
    /// This reallocates and is therefore an alloc-class mutation.
    pub fn insert_span(&mut self, at: usize, samples: &[f32]) -> Result<()> {
        if at > self.frames() {
            return Err(WavecutError::OutOfRange(format!(
                "insert at frame {} of {}",
                at,
                self.frames()
            )));
        }
        if samples.len() % self.channels as usize != 0 {
            return Err(WavecutError::InvalidParameter(
                "inserted data is not a whole number of frames".into(),
            ));
        }
        let ch = self.channels as usize;
        self.data.splice(at * ch..at * ch, samples.iter().copied());
        Ok(())
    }

    fn check_span(&self, start: usize, len: usize) -> Result<()> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| WavecutError::OutOfRange("span overflows".into()))?;
        if end > self.frames() {
            return Err(WavecutError::OutOfRange(format!(
                "span {}..{} of {} frames",
                start,
                end,
                self.frames()
            )));
        }
        Ok(())
    }
}
