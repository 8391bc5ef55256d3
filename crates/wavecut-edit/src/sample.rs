//! The `Sample`: owner of the sound buffer, selection list, edit state
//! and play head.
//!
//! Three independent locks guard a sample, and they are never taken
//! for long:
//! - the *data lock* (`content`) over the buffer and selection list;
//! - the *edit lock* (`edit` + condvar) over the edit-state machine,
//!   pending queue and history;
//! - the *play lock* (`play`) over the head cursor and mode flags.
//!
//! Progress is exposed through atomics so the UI can poll without
//! taking any of the three.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex, MutexGuard};
use uuid::Uuid;

use wavecut_core::{AtomicF64, EngineConfig, HeadState, SelectionList, SoundData};

use crate::scheduler::EditShared;

/// Edit-state machine value. Exactly one worker may be `Busy` per
/// sample; `Cancel` dominates `Pending` and `Busy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Ready,
    Pending,
    Busy,
    Done,
    Cancel,
    Idle,
}

/// Final status of the most recent operation. Success or failure of an
/// I/O-bound edit is read here, not inferred from the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpStatus {
    Ok,
    Failed(String),
    Cancelled,
}

/// Completion notifications emitted by the pump.
#[derive(Debug, Clone)]
pub enum EditEvent {
    /// An operation finished and was registered in the history.
    Registered { sample: Uuid, description: String },
    /// The pending queue drained; the sample is idle again.
    Drained { sample: Uuid },
    /// A cancellation completed; the buffer is back to its pre-op state.
    Cancelled { sample: Uuid },
    /// An operation reached Done with a failure status.
    Failed { sample: Uuid, message: String },
}

/// Buffer and selection list, guarded together by the data lock.
#[derive(Debug)]
pub struct SampleContent {
    pub sound: SoundData,
    pub selections: SelectionList,
}

/// A loaded sample.
pub struct Sample {
    id: Uuid,
    pathname: Mutex<Option<PathBuf>>,

    content: Mutex<SampleContent>,
    pub(crate) edit: Mutex<EditShared>,
    pub(crate) edit_cv: Condvar,
    play: Mutex<HeadState>,

    tempo: AtomicF64,
    modified: AtomicBool,
    progress_percent: AtomicU8,
    progress_status: Mutex<String>,
    events: Mutex<Option<Sender<EditEvent>>>,
}

impl Sample {
    /// Create a sample with default engine configuration.
    pub fn new(sound: SoundData) -> Self {
        Self::with_config(sound, &EngineConfig::default())
    }

    pub fn with_config(sound: SoundData, config: &EngineConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            pathname: Mutex::new(None),
            content: Mutex::new(SampleContent {
                sound,
                selections: SelectionList::new(),
            }),
            edit: Mutex::new(EditShared::new(config.history_limit)),
            edit_cv: Condvar::new(),
            play: Mutex::new(HeadState::new()),
            tempo: AtomicF64::new(1.0),
            modified: AtomicBool::new(false),
            progress_percent: AtomicU8::new(0),
            progress_status: Mutex::new(String::new()),
            events: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pathname(&self) -> Option<PathBuf> {
        self.pathname.lock().clone()
    }

    pub fn set_pathname(&self, path: Option<PathBuf>) {
        *self.pathname.lock() = path;
    }

    /// Take the data lock.
    pub fn content(&self) -> MutexGuard<'_, SampleContent> {
        self.content.lock()
    }

    /// Take the play lock.
    pub fn play_head(&self) -> MutexGuard<'_, HeadState> {
        self.play.lock()
    }

    /// Frame count, under a short-lived data lock.
    pub fn frames(&self) -> usize {
        self.content.lock().sound.frames()
    }

    /// Channel count, under a short-lived data lock.
    pub fn channels(&self) -> u16 {
        self.content.lock().sound.channels()
    }

    /// Native sample rate, under a short-lived data lock.
    pub fn sample_rate(&self) -> u32 {
        self.content.lock().sound.sample_rate()
    }

    /// Global rate multiplier applied on top of the head rate.
    pub fn tempo(&self) -> f64 {
        self.tempo.load()
    }

    pub fn set_tempo(&self, tempo: f64) {
        self.tempo.store(tempo);
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Relaxed)
    }

    pub fn set_modified(&self, modified: bool) {
        self.modified.store(modified, Ordering::Relaxed);
    }

    /// Progress percentage of the running operation (lock-free read).
    pub fn progress(&self) -> u8 {
        self.progress_percent.load(Ordering::Relaxed)
    }

    /// Written by running operations between units of work.
    pub fn set_progress(&self, percent: u8) {
        self.progress_percent.store(percent.min(100), Ordering::Relaxed);
    }

    pub fn status_text(&self) -> String {
        self.progress_status.lock().clone()
    }

    pub fn set_status_text(&self, text: impl Into<String>) {
        *self.progress_status.lock() = text.into();
    }

    /// Install a completion-event channel; the pump sends into it.
    pub fn set_event_sender(&self, sender: Sender<EditEvent>) {
        *self.events.lock() = Some(sender);
    }

    pub(crate) fn emit(&self, event: EditEvent) {
        if let Some(sender) = self.events.lock().as_ref() {
            // A full or disconnected receiver must not stall editing.
            let _ = sender.try_send(event);
        }
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("id", &self.id)
            .field("frames", &self.frames())
            .finish()
    }
}
