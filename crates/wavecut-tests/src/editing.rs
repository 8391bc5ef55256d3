//! Edit round trips through the full scheduler/history stack.

use std::time::Duration;

use wavecut_core::Region;
use wavecut_edit::ops::{DeleteRange, FadeRange, InsertAudio, Normalise, ReverseRange};
use wavecut_edit::{scheduler, OpStatus};

use crate::support::{sine_sample, snapshot};

const WAIT: Duration = Duration::from_secs(30);

#[test]
fn test_cut_one_second_then_undo_restores_bytes() {
    let sample = sine_sample(88200, 2);
    let before = snapshot(&sample);

    scheduler::schedule(&sample, "Cut 1s", Box::new(DeleteRange::new(22050, 44100)));
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(sample.frames(), 44100);
    assert!(sample.is_modified());

    scheduler::undo_current(&sample);
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(sample.frames(), 88200);
    assert_eq!(snapshot(&sample), before);
}

#[test]
fn test_filter_undo_redo_is_bit_identical() {
    let sample = sine_sample(30000, 2);
    let before = snapshot(&sample);

    scheduler::schedule(
        &sample,
        "Normalise",
        Box::new(Normalise::new(Some(Region::new(100, 20000)), 0.95)),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));
    let after = snapshot(&sample);
    assert_ne!(after, before);

    scheduler::undo_current(&sample);
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(snapshot(&sample), before);

    scheduler::redo_current(&sample);
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(snapshot(&sample), after);
}

#[test]
fn test_mixed_class_pipeline_unwinds_completely() {
    let sample = sine_sample(10000, 1);
    let before = snapshot(&sample);

    scheduler::schedule(&sample, "Cut", Box::new(DeleteRange::new(2000, 1000)));
    scheduler::schedule(&sample, "Reverse", Box::new(ReverseRange::new(0, 5000)));
    scheduler::schedule(
        &sample,
        "Fade in",
        Box::new(FadeRange::new(0, 4000, 0.0, 1.0)),
    );
    scheduler::schedule(
        &sample,
        "Paste",
        Box::new(InsertAudio::new(100, vec![0.5; 64])),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(scheduler::history_len(&sample), 4);
    assert_eq!(sample.frames(), 10000 - 1000 + 64);

    for _ in 0..4 {
        scheduler::undo_current(&sample);
    }
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(scheduler::history_cursor(&sample), 0);
    assert_eq!(snapshot(&sample), before);
}

#[test]
fn test_failed_operation_reaches_done_with_status() {
    let sample = sine_sample(100, 1);

    // Range beyond the buffer: the apply fails, but the queue keeps
    // moving and the failure lands in last_status.
    scheduler::schedule(
        &sample,
        "Bad cut",
        Box::new(DeleteRange::new(50, 500)),
    );
    assert!(scheduler::wait_idle(&sample, WAIT));

    assert!(matches!(
        scheduler::last_status(&sample),
        Some(OpStatus::Failed(_))
    ));
    assert_eq!(sample.frames(), 100);
    // A failed operation is never registered, so there is nothing
    // to undo.
    assert_eq!(scheduler::history_len(&sample), 0);
    assert!(!scheduler::can_undo(&sample));
}

#[test]
fn test_history_trim_keeps_newest() {
    let sample = sine_sample(1000, 1);
    for i in 0..6 {
        scheduler::schedule(
            &sample,
            format!("Fade {i}"),
            Box::new(FadeRange::new(0, 100, 1.0, 0.9)),
        );
    }
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert_eq!(scheduler::history_len(&sample), 6);

    scheduler::trim_history(&sample, 2);
    assert_eq!(scheduler::history_len(&sample), 2);
    assert_eq!(
        scheduler::undo_description(&sample).as_deref(),
        Some("Fade 5")
    );
}
