//! Wavecut Edit - Asynchronous edit engine
//!
//! The per-sample edit machinery:
//! - `Sample`: owns the buffer, selection list, lock family and play head
//! - `Operation`: reversible-edit trait with concrete edits in `ops`
//! - `History`: cursor-split undo/redo list
//! - `scheduler`: pending queue, worker thread and pump
//! - `SampleRegistry`: the application-wide sample list

pub mod history;
pub mod op;
pub mod ops;
pub mod registry;
pub mod sample;
pub mod scheduler;

pub use history::History;
pub use op::{CancellationToken, MutabilityClass, OpInstance, Operation};
pub use registry::SampleRegistry;
pub use sample::{EditEvent, EditState, OpStatus, Sample, SampleContent};
