//! The sample registry.
//!
//! Samples are owned by exactly one registry; everything else holds
//! short-lived `Arc` clones (the mixer keeps one per iteration, so
//! removing a playing sample is safe).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::sample::Sample;

#[derive(Default)]
pub struct SampleRegistry {
    samples: Mutex<Vec<Arc<Sample>>>,
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sample, returning its shared handle.
    pub fn add(&self, sample: Sample) -> Arc<Sample> {
        let sample = Arc::new(sample);
        debug!(sample = %sample.id(), "registering sample");
        self.samples.lock().push(Arc::clone(&sample));
        sample
    }

    /// Remove a sample by id. Playback and pending edits on a removed
    /// sample wind down on their own through the Arcs still out there.
    pub fn remove(&self, id: Uuid) -> Option<Arc<Sample>> {
        let mut samples = self.samples.lock();
        let index = samples.iter().position(|s| s.id() == id)?;
        debug!(sample = %id, "removing sample");
        Some(samples.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Sample>> {
        self.samples.lock().iter().find(|s| s.id() == id).cloned()
    }

    /// Snapshot of all registered samples, for iteration without
    /// holding the registry lock.
    pub fn snapshot(&self) -> Vec<Arc<Sample>> {
        self.samples.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}
