//! The per-sample operation scheduler.
//!
//! `schedule` appends work to a sample's pending queue and makes sure a
//! worker thread exists; it never blocks the caller. The worker only
//! executes; all state-machine driving — admitting the next job,
//! registering a finished instance into the history, idling the sample
//! when the queue drains — happens in [`pump`], which the host calls
//! from its UI tick. That split keeps exactly one thread mutating the
//! buffer while the UI observes progress through cheap reads.
//!
//! Undo and redo travel through the same queue as ordinary edits, so
//! FIFO ordering and the single-worker invariant hold for them too.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use wavecut_core::WavecutError;

use crate::history::History;
use crate::op::{CancellationToken, MutabilityClass, OpInstance, Operation};
use crate::sample::{EditEvent, EditState, OpStatus, Sample};

/// One queued unit of work.
#[derive(Debug)]
pub(crate) enum Job {
    Do(OpInstance),
    Undo,
    Redo,
}

/// Everything guarded by the edit lock.
pub(crate) struct EditShared {
    pub state: EditState,
    pub queue: VecDeque<Job>,
    pub worker_alive: bool,
    /// Instance that finished its do-function, awaiting registration.
    pub completed: Option<OpInstance>,
    pub last_status: Option<OpStatus>,
    pub history: History,
    pub token: CancellationToken,
}

impl EditShared {
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            state: EditState::Idle,
            queue: VecDeque::new(),
            worker_alive: false,
            completed: None,
            last_status: None,
            history: History::new(history_limit),
            token: CancellationToken::new(),
        }
    }
}

/// Complete a cancellation whose worker has already exited: reset the
/// token and return to Idle so newly enqueued work is not swallowed by
/// the stale Cancel state.
fn resolve_dead_cancel(sample: &Sample, shared: &mut EditShared) {
    if shared.state == EditState::Cancel && !shared.worker_alive {
        shared.token = CancellationToken::new();
        shared.state = EditState::Idle;
        sample.emit(EditEvent::Cancelled {
            sample: sample.id(),
        });
    }
}

/// Enqueue an operation for asynchronous execution. Never blocks.
pub fn schedule(sample: &Arc<Sample>, description: impl Into<String>, op: Box<dyn Operation>) {
    let description = description.into();
    let mut shared = sample.edit.lock();
    debug!(sample = %sample.id(), op = %description, "scheduling operation");
    resolve_dead_cancel(sample, &mut shared);
    shared
        .queue
        .push_back(Job::Do(OpInstance::new(description, op)));
    if shared.state == EditState::Idle {
        shared.state = EditState::Ready;
    }
    ensure_worker(sample, &mut shared);
}

/// Enqueue a rollback of the most recent registered operation.
/// Quietly does nothing if, when executed, there is nothing to undo.
pub fn undo_current(sample: &Arc<Sample>) {
    let mut shared = sample.edit.lock();
    resolve_dead_cancel(sample, &mut shared);
    shared.queue.push_back(Job::Undo);
    if shared.state == EditState::Idle {
        shared.state = EditState::Ready;
    }
    ensure_worker(sample, &mut shared);
}

/// Enqueue a re-application of the most recently undone operation.
pub fn redo_current(sample: &Arc<Sample>) {
    let mut shared = sample.edit.lock();
    resolve_dead_cancel(sample, &mut shared);
    shared.queue.push_back(Job::Redo);
    if shared.state == EditState::Idle {
        shared.state = EditState::Ready;
    }
    ensure_worker(sample, &mut shared);
}

/// Cancel editing on this sample.
///
/// A running operation is asked to stop through its cancellation token
/// and is rolled back by the worker before it exits, so it is either
/// fully applied or fully undone. Queued-but-not-started jobs are
/// discarded without side effects. Returns whether anything was there
/// to cancel.
pub fn cancel_active(sample: &Sample) -> bool {
    let mut shared = sample.edit.lock();
    match shared.state {
        EditState::Busy => {
            info!(sample = %sample.id(), "cancelling running operation");
            // Only jobs already queued at this point are discarded;
            // work scheduled after the cancel must still run.
            shared.queue.clear();
            shared.token.cancel();
            true
        }
        EditState::Pending | EditState::Ready => {
            info!(sample = %sample.id(), "discarding pending operations");
            shared.queue.clear();
            shared.state = EditState::Cancel;
            sample.edit_cv.notify_all();
            true
        }
        _ => false,
    }
}

/// Drive the state machine one step. Re-entrant; intended to be called
/// from a periodic UI tick (or after a completion event). Returns the
/// state after pumping.
pub fn pump(sample: &Arc<Sample>) -> EditState {
    let mut shared = sample.edit.lock();
    match shared.state {
        EditState::Ready => {
            if shared.queue.is_empty() {
                shared.state = EditState::Idle;
            } else {
                shared.state = EditState::Pending;
                ensure_worker(sample, &mut shared);
                sample.edit_cv.notify_all();
            }
        }
        EditState::Pending => {
            // A worker that drained and exited earlier needs restarting.
            ensure_worker(sample, &mut shared);
            sample.edit_cv.notify_all();
        }
        EditState::Busy | EditState::Idle => {}
        EditState::Done => {
            if let Some(instance) = shared.completed.take() {
                let description = instance.description().to_string();
                shared.history.register(instance);
                sample.emit(EditEvent::Registered {
                    sample: sample.id(),
                    description,
                });
            }
            if let Some(OpStatus::Failed(message)) = shared.last_status.clone() {
                sample.emit(EditEvent::Failed {
                    sample: sample.id(),
                    message,
                });
            }
            if shared.queue.is_empty() {
                shared.state = EditState::Idle;
                sample.emit(EditEvent::Drained {
                    sample: sample.id(),
                });
            } else {
                shared.state = EditState::Pending;
                ensure_worker(sample, &mut shared);
                sample.edit_cv.notify_all();
            }
        }
        EditState::Cancel => {
            if shared.worker_alive {
                // Let the worker observe the cancel and exit first.
                sample.edit_cv.notify_all();
            } else {
                shared.token = CancellationToken::new();
                sample.emit(EditEvent::Cancelled {
                    sample: sample.id(),
                });
                // Jobs enqueued after the cancel was requested survive.
                if shared.queue.is_empty() {
                    shared.state = EditState::Idle;
                } else {
                    shared.state = EditState::Pending;
                    ensure_worker(sample, &mut shared);
                    sample.edit_cv.notify_all();
                }
            }
        }
    }
    shared.state
}

/// Pump until the sample goes idle or the timeout elapses.
pub fn wait_idle(sample: &Arc<Sample>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pump(sample) == EditState::Idle {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// Current edit state, under a short-lived lock.
pub fn edit_state(sample: &Sample) -> EditState {
    sample.edit.lock().state
}

/// Final status of the most recently finished operation.
pub fn last_status(sample: &Sample) -> Option<OpStatus> {
    sample.edit.lock().last_status.clone()
}

/// Keep at most `keep` registered operations.
pub fn trim_history(sample: &Sample, keep: usize) {
    sample.edit.lock().history.trim(keep);
}

pub fn can_undo(sample: &Sample) -> bool {
    sample.edit.lock().history.can_undo()
}

pub fn can_redo(sample: &Sample) -> bool {
    sample.edit.lock().history.can_redo()
}

pub fn history_len(sample: &Sample) -> usize {
    sample.edit.lock().history.len()
}

pub fn history_cursor(sample: &Sample) -> usize {
    sample.edit.lock().history.cursor()
}

pub fn undo_description(sample: &Sample) -> Option<String> {
    sample
        .edit
        .lock()
        .history
        .undo_description()
        .map(str::to_string)
}

pub fn redo_description(sample: &Sample) -> Option<String> {
    sample
        .edit
        .lock()
        .history
        .redo_description()
        .map(str::to_string)
}

fn ensure_worker(sample: &Arc<Sample>, shared: &mut EditShared) {
    if shared.worker_alive {
        return;
    }
    shared.worker_alive = true;
    let sample = Arc::clone(sample);
    let spawned = thread::Builder::new()
        .name(format!("wavecut-edit-{}", sample.id().simple()))
        .spawn(move || worker(sample));
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn edit worker");
        shared.worker_alive = false;
    }
}

/// Worker thread body. Executes jobs; never drives state transitions
/// other than Pending→Busy→Done (and Cancel on rollback).
fn worker(sample: Arc<Sample>) {
    debug!(sample = %sample.id(), "edit worker started");
    let mut shared = sample.edit.lock();
    loop {
        while shared.state != EditState::Pending && shared.state != EditState::Cancel {
            sample.edit_cv.wait(&mut shared);
        }
        if shared.state == EditState::Cancel {
            // The queue was already emptied when the cancel was
            // requested; the pump finishes the transition back to Idle.
            shared.worker_alive = false;
            debug!(sample = %sample.id(), "edit worker exiting on cancel");
            return;
        }

        shared.state = EditState::Busy;
        let job = shared.queue.pop_front();
        if job.is_some() {
            // Each job gets a fresh token, so a cancel aimed at an
            // earlier job cannot trip this one. The previous job's
            // status goes with it.
            shared.token = CancellationToken::new();
            shared.last_status = None;
        }
        let token = shared.token.clone();
        drop(shared);

        match job {
            None => {
                shared = sample.edit.lock();
                shared.state = EditState::Done;
            }
            Some(Job::Do(mut instance)) => {
                let alloc = instance.class() == MutabilityClass::Alloc;
                if alloc {
                    sample.play_head().pause_for_edit();
                }

                let result = instance.op_mut().apply(&sample, &token);
                let cancelled =
                    token.is_cancelled() || matches!(result, Err(WavecutError::Cancelled));

                if cancelled {
                    if let Err(e) = instance.op_mut().revert(&sample) {
                        warn!(sample = %sample.id(), error = %e,
                              "rollback of cancelled operation failed");
                    }
                    if alloc {
                        sample.play_head().resume_after_edit();
                    }
                    shared = sample.edit.lock();
                    shared.last_status = Some(OpStatus::Cancelled);
                    shared.state = EditState::Cancel;
                    shared.worker_alive = false;
                    info!(sample = %sample.id(), op = instance.description(),
                          "operation cancelled and rolled back");
                    return;
                }

                if alloc {
                    sample.play_head().resume_after_edit();
                }
                shared = sample.edit.lock();
                match &result {
                    Ok(()) => {
                        shared.last_status = Some(OpStatus::Ok);
                        // Only successful operations enter the history.
                        shared.completed = Some(instance);
                    }
                    Err(e) => {
                        shared.last_status = Some(OpStatus::Failed(e.to_string()));
                    }
                }
                shared.state = EditState::Done;
            }
            Some(Job::Undo) => {
                shared = sample.edit.lock();
                match shared.history.begin_undo() {
                    None => shared.state = EditState::Done,
                    Some(mut instance) => {
                        let alloc = instance.class() == MutabilityClass::Alloc;
                        drop(shared);
                        if alloc {
                            sample.play_head().pause_for_edit();
                        }
                        let result = instance.op_mut().revert(&sample);
                        if alloc {
                            sample.play_head().resume_after_edit();
                        }
                        shared = sample.edit.lock();
                        shared.history.finish_undo(instance);
                        shared.last_status = Some(match result {
                            Ok(()) => OpStatus::Ok,
                            Err(e) => OpStatus::Failed(e.to_string()),
                        });
                        shared.state = EditState::Done;
                    }
                }
            }
            Some(Job::Redo) => {
                shared = sample.edit.lock();
                match shared.history.begin_redo() {
                    None => shared.state = EditState::Done,
                    Some(mut instance) => {
                        let alloc = instance.class() == MutabilityClass::Alloc;
                        drop(shared);
                        if alloc {
                            sample.play_head().pause_for_edit();
                        }
                        let result = instance.op_mut().reapply(&sample);
                        if alloc {
                            sample.play_head().resume_after_edit();
                        }
                        shared = sample.edit.lock();
                        shared.history.finish_redo(instance);
                        shared.last_status = Some(match result {
                            Ok(()) => OpStatus::Ok,
                            Err(e) => OpStatus::Failed(e.to_string()),
                        });
                        shared.state = EditState::Done;
                    }
                }
            }
        }

        if shared.state == EditState::Done && shared.queue.is_empty() {
            shared.worker_alive = false;
            debug!(sample = %sample.id(), "edit worker drained");
            return;
        }
        // Otherwise wait for the pump to admit the next job.
    }
}
