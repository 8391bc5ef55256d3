//! Concrete edit operations.
//!
//! Each operation keeps the payload it needs to undo itself as owned
//! fields. Filter-class operations work in chunks, re-taking the data
//! lock per chunk so playback can interleave, and checking the
//! cancellation token between chunks.

use wavecut_core::{Region, Result, WavecutError};

use crate::op::{CancellationToken, MutabilityClass, Operation};
use crate::sample::Sample;

/// Frames processed per unit of work in chunked operations.
const CHUNK_FRAMES: usize = 8192;

fn resolve_region(sample: &Sample, region: Option<Region>) -> Result<(usize, usize)> {
    let frames = sample.frames();
    match region {
        Some(r) => {
            if r.end > frames {
                return Err(WavecutError::OutOfRange(format!(
                    "region {}..{} of {} frames",
                    r.start, r.end, frames
                )));
            }
            Ok((r.start, r.len()))
        }
        None => Ok((0, frames)),
    }
}

// ── Delete ──────────────────────────────────────────────────────

/// Remove a frame span ("cut"). Alloc-class: the buffer shrinks.
pub struct DeleteRange {
    start: usize,
    len: usize,
    removed: Option<Vec<f32>>,
}

impl DeleteRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self {
            start,
            len,
            removed: None,
        }
    }
}

impl Operation for DeleteRange {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Alloc
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        token.check()?;
        sample.set_status_text("Deleting");
        sample.set_progress(0);
        let mut content = sample.content();
        self.removed = Some(content.sound.delete_span(self.start, self.len)?);
        drop(content);
        sample.set_modified(true);
        sample.set_progress(100);
        Ok(())
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        let Some(removed) = &self.removed else {
            return Ok(()); // nothing was applied
        };
        sample.content().sound.insert_span(self.start, removed)?;
        sample.set_modified(true);
        Ok(())
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        sample.content().sound.delete_span(self.start, self.len)?;
        sample.set_modified(true);
        Ok(())
    }
}

// ── Insert ──────────────────────────────────────────────────────

/// Insert interleaved audio before a frame ("paste"). Alloc-class.
pub struct InsertAudio {
    at: usize,
    samples: Vec<f32>,
}

impl InsertAudio {
    pub fn new(at: usize, samples: Vec<f32>) -> Self {
        Self { at, samples }
    }

    fn frames(&self, sample: &Sample) -> usize {
        self.samples.len() / sample.channels() as usize
    }
}

impl Operation for InsertAudio {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Alloc
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        token.check()?;
        sample.set_status_text("Inserting");
        sample.set_progress(0);
        sample.content().sound.insert_span(self.at, &self.samples)?;
        sample.set_modified(true);
        sample.set_progress(100);
        Ok(())
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        let frames = self.frames(sample);
        sample.content().sound.delete_span(self.at, frames)?;
        sample.set_modified(true);
        Ok(())
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        sample.content().sound.insert_span(self.at, &self.samples)?;
        sample.set_modified(true);
        Ok(())
    }
}

// ── Normalise ───────────────────────────────────────────────────

/// Scale the region so its peak hits `target_peak`. Filter-class:
/// rewritten in place, chunked with progress and cancellation checks.
pub struct Normalise {
    region: Option<Region>,
    target_peak: f32,
    saved: Option<Vec<f32>>,
    span: Option<(usize, usize)>,
    gain: f32,
}

impl Normalise {
    pub fn new(region: Option<Region>, target_peak: f32) -> Self {
        Self {
            region,
            target_peak,
            saved: None,
            span: None,
            gain: 1.0,
        }
    }
}

impl Operation for Normalise {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Filter
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        sample.set_status_text("Normalising");
        sample.set_progress(0);
        let (start, len) = resolve_region(sample, self.region)?;
        self.span = Some((start, len));

        // Snapshot for undo before any mutation.
        self.saved = Some(sample.content().sound.copy_span(start, len)?);

        // Pass 1: peak scan.
        let mut peak = 0.0f32;
        let mut done = 0;
        while done < len {
            token.check()?;
            let n = CHUNK_FRAMES.min(len - done);
            let content = sample.content();
            for &s in content.sound.span(start + done, n)? {
                peak = peak.max(s.abs());
            }
            drop(content);
            done += n;
            sample.set_progress((done * 50 / len.max(1)) as u8);
        }

        if peak <= f32::EPSILON {
            // Silent region; nothing to scale.
            self.gain = 1.0;
            sample.set_progress(100);
            return Ok(());
        }
        self.gain = self.target_peak / peak;

        // Pass 2: scale in place.
        let mut done = 0;
        while done < len {
            token.check()?;
            let n = CHUNK_FRAMES.min(len - done);
            let mut content = sample.content();
            for s in content.sound.span_mut(start + done, n)? {
                *s *= self.gain;
            }
            drop(content);
            done += n;
            sample.set_progress((50 + done * 50 / len.max(1)) as u8);
        }

        sample.set_modified(true);
        sample.set_progress(100);
        Ok(())
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        let (Some((start, len)), Some(saved)) = (self.span, &self.saved) else {
            return Ok(());
        };
        sample
            .content()
            .sound
            .span_mut(start, len)?
            .copy_from_slice(saved);
        sample.set_modified(true);
        Ok(())
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        let Some((start, len)) = self.span else {
            return Ok(());
        };
        let mut content = sample.content();
        for s in content.sound.span_mut(start, len)? {
            *s *= self.gain;
        }
        drop(content);
        sample.set_modified(true);
        Ok(())
    }
}

// ── Fade ────────────────────────────────────────────────────────

/// Linear gain ramp over a span. Filter-class.
pub struct FadeRange {
    start: usize,
    len: usize,
    from: f32,
    to: f32,
    saved: Option<Vec<f32>>,
}

impl FadeRange {
    pub fn new(start: usize, len: usize, from: f32, to: f32) -> Self {
        Self {
            start,
            len,
            from,
            to,
            saved: None,
        }
    }

    fn scale(&self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        let channels = sample.channels() as usize;
        let mut done = 0;
        while done < self.len {
            token.check()?;
            let n = CHUNK_FRAMES.min(self.len - done);
            let mut content = sample.content();
            let span = content.sound.span_mut(self.start + done, n)?;
            for frame in 0..n {
                let t = (done + frame) as f32 / self.len.max(1) as f32;
                let g = self.from + (self.to - self.from) * t;
                for ch in 0..channels {
                    span[frame * channels + ch] *= g;
                }
            }
            drop(content);
            done += n;
            sample.set_progress((done * 100 / self.len.max(1)) as u8);
        }
        Ok(())
    }
}

impl Operation for FadeRange {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Filter
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        sample.set_status_text("Fading");
        sample.set_progress(0);
        self.saved = Some(sample.content().sound.copy_span(self.start, self.len)?);
        self.scale(sample, token)?;
        sample.set_modified(true);
        sample.set_progress(100);
        Ok(())
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        let Some(saved) = &self.saved else {
            return Ok(());
        };
        sample
            .content()
            .sound
            .span_mut(self.start, self.len)?
            .copy_from_slice(saved);
        sample.set_modified(true);
        Ok(())
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        let token = CancellationToken::new();
        self.scale(sample, &token)?;
        sample.set_modified(true);
        Ok(())
    }
}

// ── Reverse ─────────────────────────────────────────────────────

/// Reverse the frame order of a span. Filter-class and self-inverse.
pub struct ReverseRange {
    start: usize,
    len: usize,
}

impl ReverseRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    fn flip(&self, sample: &Sample) -> Result<()> {
        let channels = sample.channels() as usize;
        let mut content = sample.content();
        let span = content.sound.span_mut(self.start, self.len)?;
        let mut lo = 0;
        let mut hi = self.len.saturating_sub(1);
        while lo < hi {
            for ch in 0..channels {
                span.swap(lo * channels + ch, hi * channels + ch);
            }
            lo += 1;
            hi -= 1;
        }
        drop(content);
        sample.set_modified(true);
        Ok(())
    }
}

impl Operation for ReverseRange {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Filter
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        token.check()?;
        sample.set_status_text("Reversing");
        sample.set_progress(0);
        self.flip(sample)?;
        sample.set_progress(100);
        Ok(())
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        self.flip(sample)
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        self.flip(sample)
    }
}

// ── Native rate ─────────────────────────────────────────────────

/// Change the declared native sample rate. Meta-class: no buffer
/// mutation, playback pitch shifts accordingly.
pub struct SetNativeRate {
    rate: u32,
    previous: Option<u32>,
}

impl SetNativeRate {
    pub fn new(rate: u32) -> Self {
        Self {
            rate,
            previous: None,
        }
    }
}

impl Operation for SetNativeRate {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Meta
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        token.check()?;
        let mut content = sample.content();
        self.previous = Some(content.sound.sample_rate());
        content.sound.set_sample_rate(self.rate);
        drop(content);
        sample.set_modified(true);
        Ok(())
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        if let Some(previous) = self.previous {
            sample.content().sound.set_sample_rate(previous);
            sample.set_modified(true);
        }
        Ok(())
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        sample.content().sound.set_sample_rate(self.rate);
        sample.set_modified(true);
        Ok(())
    }
}
