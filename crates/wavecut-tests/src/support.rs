//! Shared fixtures for the integration tests.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use wavecut_core::{Result, SoundData, WavecutError};
use wavecut_edit::{CancellationToken, MutabilityClass, Operation, Sample};

/// A sample filled with a low-amplitude sine, so edits change bytes
/// and byte comparisons are meaningful.
pub fn sine_sample(frames: usize, channels: u16) -> Arc<Sample> {
    let data: Vec<f32> = (0..frames * channels as usize)
        .map(|i| (i as f32 * 0.01).sin() * 0.5)
        .collect();
    Arc::new(Sample::new(
        SoundData::from_interleaved(data, channels, 44100).unwrap(),
    ))
}

pub fn snapshot(sample: &Sample) -> Vec<f32> {
    sample.content().sound.as_slice().to_vec()
}

/// Pump the scheduler until a gated operation signals `started`.
/// `schedule` alone only moves the state to Ready; admitting the job is
/// the pump's job, so waiting on `started` without pumping would hang.
pub fn pump_until_started(
    sample: &Arc<Sample>,
    started_rx: &Receiver<()>,
    timeout: Duration,
) {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        wavecut_edit::scheduler::pump(sample);
        if started_rx.recv_timeout(Duration::from_millis(1)).is_ok() {
            return;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "operation never started"
        );
    }
}

/// Execution-order log shared between test operations.
#[derive(Default)]
pub struct ExecLog {
    entries: std::sync::Mutex<Vec<usize>>,
}

impl ExecLog {
    pub fn push(&self, tag: usize) {
        self.entries.lock().unwrap().push(tag);
    }

    pub fn entries(&self) -> Vec<usize> {
        self.entries.lock().unwrap().clone()
    }
}

/// Meta operation that records its execution order in a shared log.
pub struct TagOp {
    pub tag: usize,
    pub log: Arc<ExecLog>,
}

impl Operation for TagOp {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Meta
    }

    fn apply(&mut self, _: &Sample, _: &CancellationToken) -> Result<()> {
        self.log.push(self.tag);
        Ok(())
    }

    fn revert(&mut self, _: &Sample) -> Result<()> {
        Ok(())
    }

    fn reapply(&mut self, _: &Sample) -> Result<()> {
        Ok(())
    }
}

/// An alloc-class delete that performs its mutation and then holds the
/// worker hostage: it signals `started`, then spins until either the
/// cancellation token trips or `release` fires. Makes cancel-while-busy
/// deterministic.
pub struct GatedDelete {
    start: usize,
    len: usize,
    removed: Option<Vec<f32>>,
    started: Sender<()>,
    release: Receiver<()>,
}

impl GatedDelete {
    pub fn new(
        start: usize,
        len: usize,
        started: Sender<()>,
        release: Receiver<()>,
    ) -> Self {
        Self {
            start,
            len,
            removed: None,
            started,
            release,
        }
    }
}

impl Operation for GatedDelete {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Alloc
    }

    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()> {
        self.removed = Some(sample.content().sound.delete_span(self.start, self.len)?);
        sample.set_modified(true);
        let _ = self.started.send(());

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        loop {
            if token.is_cancelled() {
                return Err(WavecutError::Cancelled);
            }
            match self.release.recv_timeout(Duration::from_millis(1)) {
                Ok(()) => return Ok(()),
                Err(_) if std::time::Instant::now() >= deadline => {
                    return Err(WavecutError::Internal("gate never released".into()));
                }
                Err(_) => {}
            }
        }
    }

    fn revert(&mut self, sample: &Sample) -> Result<()> {
        let Some(removed) = &self.removed else {
            return Ok(());
        };
        sample.content().sound.insert_span(self.start, removed)?;
        Ok(())
    }

    fn reapply(&mut self, sample: &Sample) -> Result<()> {
        sample.content().sound.delete_span(self.start, self.len)?;
        Ok(())
    }
}

/// A meta operation whose revert blocks until `release` fires, so a
/// test can cancel while an undo is in flight. Applying is instant.
pub struct GatedRevert {
    started: Sender<()>,
    release: Receiver<()>,
}

impl GatedRevert {
    pub fn new(started: Sender<()>, release: Receiver<()>) -> Self {
        Self { started, release }
    }
}

impl Operation for GatedRevert {
    fn class(&self) -> MutabilityClass {
        MutabilityClass::Meta
    }

    fn apply(&mut self, _: &Sample, _: &CancellationToken) -> Result<()> {
        Ok(())
    }

    fn revert(&mut self, _: &Sample) -> Result<()> {
        let _ = self.started.send(());
        self.release
            .recv_timeout(Duration::from_secs(10))
            .map_err(|_| WavecutError::Internal("gate never released".into()))
    }

    fn reapply(&mut self, _: &Sample) -> Result<()> {
        Ok(())
    }
}
