//! The reversible-operation interface.
//!
//! Every edit is an [`Operation`]: it applies itself to a sample,
//! keeps whatever payload it needs to undo that application, and can
//! revert or reapply on demand. Payloads are owned fields of the
//! concrete type, so cleanup is ordinary `Drop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wavecut_core::{Result, WavecutError};

use crate::sample::Sample;

/// How an operation mutates the sample buffer.
///
/// Alloc-class operations may reallocate or resize the buffer and must
/// never run concurrently with playback; the scheduler pauses the play
/// head around them. Meta and Filter operations leave the allocation
/// in place and may overlap playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutabilityClass {
    /// No buffer mutation (format fields, markers).
    Meta,
    /// Buffer rewritten in place, same size.
    Filter,
    /// Buffer reallocated or resized.
    Alloc,
}

/// Cooperative cancellation token.
///
/// Long-running operations must call [`check`](Self::check) between
/// reasonably small units of work; there is no forced preemption.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Bail out with [`WavecutError::Cancelled`] if cancellation was
    /// requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(WavecutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A reversible edit applied to one sample.
pub trait Operation: Send {
    /// Mutability classification, fixed per operation type.
    fn class(&self) -> MutabilityClass;

    /// Apply the edit. Must either complete fully or return an error
    /// leaving enough payload behind for `revert` to restore the
    /// pre-apply state (the scheduler reverts on cancellation).
    fn apply(&mut self, sample: &Sample, token: &CancellationToken) -> Result<()>;

    /// Undo a previous `apply`/`reapply`.
    fn revert(&mut self, sample: &Sample) -> Result<()>;

    /// Redo after a `revert`.
    fn reapply(&mut self, sample: &Sample) -> Result<()>;
}

/// One scheduled application of an operation, with its description as
/// shown in the undo menu.
pub struct OpInstance {
    description: String,
    op: Box<dyn Operation>,
}

impl OpInstance {
    pub fn new(description: impl Into<String>, op: Box<dyn Operation>) -> Self {
        Self {
            description: description.into(),
            op,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn class(&self) -> MutabilityClass {
        self.op.class()
    }

    pub(crate) fn op_mut(&mut self) -> &mut dyn Operation {
        self.op.as_mut()
    }
}

impl std::fmt::Debug for OpInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpInstance")
            .field("description", &self.description)
            .field("class", &self.class())
            .finish()
    }
}
