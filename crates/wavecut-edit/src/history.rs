//! Undo/redo history.
//!
//! An ordered list of registered operation instances split by a single
//! cursor: everything left of the cursor is undoable, everything at or
//! right of it is redoable. Registering a new operation while redoable
//! instances exist discards them permanently.

use crate::op::OpInstance;

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<OpInstance>,
    /// Number of undoable entries; the split point.
    cursor: usize,
    /// Cap on registered entries. `None` = unbounded.
    limit: Option<usize>,
}

impl History {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit,
        }
    }

    /// Register a successfully applied instance.
    ///
    /// Truncates the redo branch, appends, re-points the cursor at the
    /// new entry, and trims the oldest entries past the cap. Discarded
    /// instances release their payloads on drop.
    pub fn register(&mut self, instance: OpInstance) {
        self.entries.truncate(self.cursor);
        self.entries.push(instance);
        self.cursor = self.entries.len();

        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
                self.cursor = self.cursor.saturating_sub(excess);
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Remove and return the instance the cursor points at for undo.
    /// The cursor does not move until [`finish_undo`](Self::finish_undo).
    pub fn begin_undo(&mut self) -> Option<OpInstance> {
        if self.cursor == 0 {
            return None;
        }
        Some(self.entries.remove(self.cursor - 1))
    }

    /// Reinsert an undone instance and move the cursor left.
    pub fn finish_undo(&mut self, instance: OpInstance) {
        self.entries.insert(self.cursor - 1, instance);
        self.cursor -= 1;
    }

    /// Remove and return the next redoable instance.
    pub fn begin_redo(&mut self) -> Option<OpInstance> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        Some(self.entries.remove(self.cursor))
    }

    /// Reinsert a redone instance and move the cursor right.
    pub fn finish_redo(&mut self, instance: OpInstance) {
        self.entries.insert(self.cursor, instance);
        self.cursor += 1;
    }

    /// Keep at most the `keep` most recent entries, trimming from the
    /// oldest. Trimming everything resets undo availability.
    pub fn trim(&mut self, keep: usize) {
        if self.entries.len() > keep {
            let excess = self.entries.len() - keep;
            self.entries.drain(..excess);
            self.cursor = self.cursor.saturating_sub(excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the split point: entries `0..cursor()` are undoable.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Description of the instance `undo` would target next.
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.description())
    }

    /// Description of the instance `redo` would target next.
    pub fn redo_description(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|e| e.description())
    }
}
