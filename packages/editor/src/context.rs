//! Editing-mode context.
//!
//! Replaces ambient "is loading" / "skip history" flags with one explicit
//! mode machine passed by reference into every mutation entry point. Single
//! writer: the session owns the context and is the only thing that moves it
//! between modes.

use serde::{Deserialize, Serialize};

/// What the editing session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorMode {
    /// Normal interactive editing.
    Idle,
    /// Bulk data load in progress; no history, no change records.
    Loading,
    /// A multi-edit gesture (drag, multi-field form) is being collapsed into
    /// one history entry.
    Batching,
    /// A persistence flush is running.
    Saving,
    /// A prior version is being restored wholesale.
    RestoringVersion,
}

/// Mode holder threaded through mutation entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncContext {
    mode: EditorMode,
}

impl SyncContext {
    pub fn new() -> Self {
        Self {
            mode: EditorMode::Idle,
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    /// True while commits must not produce history entries.
    pub fn skips_history(&self) -> bool {
        matches!(self.mode, EditorMode::Loading | EditorMode::RestoringVersion)
    }

    /// True while entity deltas must not be recorded for persistence
    /// (loaded/restored data is already persisted).
    pub fn skips_tracking(&self) -> bool {
        self.skips_history()
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}
