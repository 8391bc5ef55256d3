//! Scheduler behavior across crates: ordering, cancellation, events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use wavecut_edit::ops::DeleteRange;
use wavecut_edit::{scheduler, EditEvent, EditState, OpStatus};

use crate::support::{pump_until_started, sine_sample, snapshot, ExecLog, GatedDelete, GatedRevert, TagOp};

const WAIT: Duration = Duration::from_secs(10);

#[test]
fn test_operations_run_in_schedule_order() {
    let sample = sine_sample(64, 1);
    let log = Arc::new(ExecLog::default());

    for tag in 0..5 {
        scheduler::schedule(
            &sample,
            format!("op {tag}"),
            Box::new(TagOp {
                tag,
                log: Arc::clone(&log),
            }),
        );
    }
    assert!(scheduler::wait_idle(&sample, WAIT));

    assert_eq!(log.entries(), vec![0, 1, 2, 3, 4]);
    assert_eq!(scheduler::history_len(&sample), 5);
    assert_eq!(scheduler::history_cursor(&sample), 5);
    assert_eq!(scheduler::undo_description(&sample).as_deref(), Some("op 4"));
}

#[test]
fn test_undo_then_schedule_discards_redo_branch() {
    let sample = sine_sample(64, 1);
    let log = Arc::new(ExecLog::default());
    let tag_op = |tag| {
        Box::new(TagOp {
            tag,
            log: Arc::clone(&log),
        })
    };

    scheduler::schedule(&sample, "a", tag_op(0));
    scheduler::schedule(&sample, "b", tag_op(1));
    assert!(scheduler::wait_idle(&sample, WAIT));

    scheduler::undo_current(&sample);
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert!(scheduler::can_redo(&sample));

    scheduler::schedule(&sample, "c", tag_op(2));
    assert!(scheduler::wait_idle(&sample, WAIT));

    // "b" is gone; the new branch is a, c.
    assert!(!scheduler::can_redo(&sample));
    assert_eq!(scheduler::history_len(&sample), 2);
    assert_eq!(scheduler::undo_description(&sample).as_deref(), Some("c"));
}

#[test]
fn test_cancel_busy_alloc_rolls_back_to_identical_bytes() {
    let sample = sine_sample(44100, 2);
    let before = snapshot(&sample);
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (_release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);

    scheduler::schedule(
        &sample,
        "gated cut",
        Box::new(GatedDelete::new(1000, 22050, started_tx, release_rx)),
    );
    pump_until_started(&sample, &started_rx, WAIT);
    assert_eq!(scheduler::edit_state(&sample), EditState::Busy);
    assert_eq!(sample.frames(), 44100 - 22050);

    assert!(scheduler::cancel_active(&sample));
    assert!(scheduler::wait_idle(&sample, WAIT));

    assert_eq!(scheduler::edit_state(&sample), EditState::Idle);
    assert_eq!(scheduler::last_status(&sample), Some(OpStatus::Cancelled));
    assert_eq!(snapshot(&sample), before);
    // A rolled-back operation is never registered.
    assert_eq!(scheduler::history_len(&sample), 0);
}

#[test]
fn test_cancel_discards_queued_jobs_behind_the_running_one() {
    let sample = sine_sample(4096, 1);
    let log = Arc::new(ExecLog::default());
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (_release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);

    scheduler::schedule(
        &sample,
        "gated cut",
        Box::new(GatedDelete::new(0, 100, started_tx, release_rx)),
    );
    scheduler::schedule(
        &sample,
        "never runs",
        Box::new(TagOp {
            tag: 9,
            log: Arc::clone(&log),
        }),
    );
    pump_until_started(&sample, &started_rx, WAIT);

    assert!(scheduler::cancel_active(&sample));
    assert!(scheduler::wait_idle(&sample, WAIT));

    assert!(log.entries().is_empty());
    assert_eq!(scheduler::history_len(&sample), 0);
}

#[test]
fn test_schedule_after_cancel_still_runs() {
    let sample = sine_sample(4096, 1);
    let log = Arc::new(ExecLog::default());
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (_release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);

    scheduler::schedule(
        &sample,
        "gated cut",
        Box::new(GatedDelete::new(0, 100, started_tx, release_rx)),
    );
    pump_until_started(&sample, &started_rx, WAIT);
    assert!(scheduler::cancel_active(&sample));

    // Cancellation discards what was queued when it was requested,
    // not work scheduled afterwards.
    scheduler::schedule(
        &sample,
        "after cancel",
        Box::new(TagOp {
            tag: 7,
            log: Arc::clone(&log),
        }),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));

    assert_eq!(log.entries(), vec![7]);
    assert_eq!(scheduler::history_len(&sample), 1);
    assert_eq!(
        scheduler::undo_description(&sample).as_deref(),
        Some("after cancel")
    );
}

#[test]
fn test_cancel_during_undo_does_not_poison_later_edits() {
    let sample = sine_sample(64, 1);
    let log = Arc::new(ExecLog::default());
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);

    scheduler::schedule(
        &sample,
        "gated",
        Box::new(GatedRevert::new(started_tx, release_rx)),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));

    scheduler::undo_current(&sample);
    let deadline = Instant::now() + WAIT;
    loop {
        scheduler::pump(&sample);
        if started_rx.recv_timeout(Duration::from_millis(1)).is_ok() {
            break;
        }
        assert!(Instant::now() < deadline, "undo never started");
    }

    // Cancel lands while the rollback is running; the undo finishes
    // anyway and must not leave a tripped token behind.
    scheduler::cancel_active(&sample);
    release_tx.send(()).unwrap();
    assert!(scheduler::wait_idle(&sample, WAIT));

    scheduler::schedule(
        &sample,
        "after",
        Box::new(TagOp {
            tag: 3,
            log: Arc::clone(&log),
        }),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));

    assert_eq!(scheduler::last_status(&sample), Some(OpStatus::Ok));
    assert_eq!(log.entries(), vec![3]);
    assert_eq!(scheduler::undo_description(&sample).as_deref(), Some("after"));
}

#[test]
fn test_failed_event_is_not_replayed_by_later_jobs() {
    let sample = sine_sample(100, 1);
    let (tx, rx) = crossbeam_channel::unbounded();
    sample.set_event_sender(tx);

    scheduler::schedule(&sample, "bad cut", Box::new(DeleteRange::new(50, 500)));
    assert!(scheduler::wait_idle(&sample, WAIT));

    // Nothing was registered, so this undo is a no-op. It must not
    // re-announce the earlier failure.
    scheduler::undo_current(&sample);
    assert!(scheduler::wait_idle(&sample, WAIT));

    let failures = rx
        .try_iter()
        .filter(|e| matches!(e, EditEvent::Failed { .. }))
        .count();
    assert_eq!(failures, 1);
}

#[test]
fn test_completion_events_reach_the_channel() {
    let sample = sine_sample(64, 1);
    let (tx, rx) = crossbeam_channel::unbounded();
    sample.set_event_sender(tx);

    let log = Arc::new(ExecLog::default());
    scheduler::schedule(
        &sample,
        "tagged",
        Box::new(TagOp {
            tag: 0,
            log: Arc::clone(&log),
        }),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));

    let events: Vec<EditEvent> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        EditEvent::Registered { description, .. } if description == "tagged"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, EditEvent::Drained { .. })));
}

#[test]
fn test_worker_restarts_for_work_scheduled_after_drain() {
    let sample = sine_sample(64, 1);
    let log = Arc::new(ExecLog::default());

    scheduler::schedule(
        &sample,
        "first",
        Box::new(TagOp {
            tag: 0,
            log: Arc::clone(&log),
        }),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));

    // The first worker has exited by now; this must spawn a new one.
    scheduler::schedule(
        &sample,
        "second",
        Box::new(TagOp {
            tag: 1,
            log: Arc::clone(&log),
        }),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(log.entries(), vec![0, 1]);
}
