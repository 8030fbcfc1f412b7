//! # History Timeline
//!
//! Capacity-bounded undo/redo timeline over whole-document snapshots.
//!
//! ## Design
//!
//! - Every committed mutation pushes an immutable snapshot of the document
//! - Undo/redo move an index over the timeline instead of applying inverses
//! - Committing while not at the tail discards the abandoned future
//! - Batch mode collapses a run of commits into at most one entry
//! - A save marker tracks which snapshot matches persisted storage
//!
//! All index operations are bounds-checked; an out-of-range request logs a
//! warning and returns a neutral result. History corruption must never
//! crash the editing session.

use crate::context::SyncContext;
use crate::labels::{OperationKind, OperationLabel};
use planwheel_model::PlanDocument;
use tracing::warn;

/// One immutable recorded value of the whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub value: PlanDocument,
    pub label: OperationLabel,
    /// Position in the timeline; renumbered when capacity trimming evicts
    /// older entries.
    pub index: usize,
}

/// Timeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct HistoryOptions {
    /// Maximum number of snapshots kept. Pushing past this evicts the
    /// oldest entries.
    pub capacity: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// In-flight batch state: the document as it looked when the batch started,
/// and the latest value committed during the batch.
#[derive(Debug)]
struct Batch {
    label: OperationLabel,
    before: PlanDocument,
    latest: Option<PlanDocument>,
}

/// Undo/redo timeline of document snapshots.
#[derive(Debug)]
pub struct History {
    entries: Vec<Snapshot>,
    current_index: usize,
    save_index: usize,
    capacity: usize,
    batch: Option<Batch>,
}

impl History {
    /// Timeline seeded with the initial document as its only snapshot.
    pub fn new(initial: PlanDocument, options: HistoryOptions) -> Self {
        let capacity = options.capacity.max(1);
        Self {
            entries: vec![Snapshot {
                value: initial,
                label: OperationLabel::new(OperationKind::Change),
                index: 0,
            }],
            current_index: 0,
            save_index: 0,
            capacity,
            batch: None,
        }
    }

    /// Record the document after a committed mutation.
    ///
    /// No-op while the context suppresses history (bulk loads, version
    /// restores). While a batch is active the value is held instead of
    /// pushed; `end_batch` decides whether it becomes a timeline entry.
    pub fn commit(&mut self, ctx: &SyncContext, document: PlanDocument, label: OperationLabel) {
        if ctx.skips_history() {
            return;
        }
        if let Some(batch) = &mut self.batch {
            batch.latest = Some(document);
            return;
        }
        self.push(document, label);
    }

    fn push(&mut self, document: PlanDocument, label: OperationLabel) {
        // New edits truncate a previously undone future.
        if self.current_index + 1 < self.entries.len() {
            self.entries.truncate(self.current_index + 1);
            if self.save_index > self.current_index {
                // The save point lived on the discarded branch.
                self.save_index = self.current_index;
            }
        }

        self.entries.push(Snapshot {
            value: document,
            label,
            index: self.entries.len(),
        });
        self.current_index = self.entries.len() - 1;

        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(..overflow);
            self.current_index -= overflow;
            self.save_index = self.save_index.saturating_sub(overflow);
            self.renumber();
        }
    }

    fn renumber(&mut self) {
        for (i, snapshot) in self.entries.iter_mut().enumerate() {
            snapshot.index = i;
        }
    }

    /// Step back one snapshot. Returns the label of the entry moved *to*,
    /// or `None` at the origin.
    pub fn undo(&mut self) -> Option<OperationLabel> {
        if self.current_index == 0 {
            return None;
        }
        self.current_index -= 1;
        Some(self.entries[self.current_index].label.clone())
    }

    /// Step forward one snapshot. Returns the label of the entry moved to,
    /// or `None` at the tail.
    pub fn redo(&mut self) -> Option<OperationLabel> {
        if self.current_index + 1 >= self.entries.len() {
            return None;
        }
        self.current_index += 1;
        Some(self.entries[self.current_index].label.clone())
    }

    /// Move directly to an arbitrary snapshot (history scrubber).
    pub fn jump_to(&mut self, index: usize) -> Option<OperationLabel> {
        if index >= self.entries.len() {
            warn!(index, len = self.entries.len(), "history jump out of range");
            return None;
        }
        self.current_index = index;
        Some(self.entries[self.current_index].label.clone())
    }

    /// Begin collapsing subsequent commits into one entry.
    ///
    /// Captures the current document as the "before" reference the batch
    /// will be compared against on `end_batch`.
    pub fn start_batch(&mut self, label: OperationLabel) {
        if self.batch.is_some() {
            warn!("start_batch while a batch is already active; replacing it");
        }
        self.batch = Some(Batch {
            label,
            before: self.current().value.clone(),
            latest: None,
        });
    }

    /// Close the active batch.
    ///
    /// If any commit landed during the batch and the final value differs
    /// structurally from the "before" reference, exactly one snapshot is
    /// pushed and its index returned (so the caller can mark it saved once
    /// persistence confirms). An unchanged or empty batch is discarded.
    pub fn end_batch(&mut self) -> Option<usize> {
        let Some(batch) = self.batch.take() else {
            warn!("end_batch with no active batch");
            return None;
        };
        let latest = batch.latest?;
        if latest == batch.before {
            return None;
        }
        self.push(latest, batch.label);
        Some(self.current_index)
    }

    /// Discard the active batch and everything committed during it.
    pub fn cancel_batch(&mut self) {
        self.batch = None;
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// Record that the given snapshot (or the current one) now matches
    /// persisted storage.
    pub fn mark_saved(&mut self, index: Option<usize>) {
        let target = index.unwrap_or(self.current_index);
        if target >= self.entries.len() {
            warn!(index = target, len = self.entries.len(), "mark_saved out of range");
            return;
        }
        self.save_index = target;
    }

    /// Jump straight back to the last saved snapshot. Returns true if the
    /// position changed.
    pub fn undo_to_save(&mut self) -> bool {
        if self.save_index >= self.entries.len() {
            // Save point was evicted by capacity trimming.
            warn!(
                save_index = self.save_index,
                len = self.entries.len(),
                "save point no longer in timeline; clamping to origin"
            );
            self.save_index = 0;
        }
        let moved = self.current_index != self.save_index;
        self.current_index = self.save_index;
        moved
    }

    /// Collapse the timeline to a single snapshot of the *current* document
    /// and mark it saved. Used after a full reload makes prior history
    /// meaningless.
    pub fn clear(&mut self) {
        let current = self.current().value.clone();
        self.entries = vec![Snapshot {
            value: current,
            label: OperationLabel::new(OperationKind::Change),
            index: 0,
        }];
        self.current_index = 0;
        self.save_index = 0;
        self.batch = None;
    }

    /// Snapshot the timeline currently points at.
    pub fn current(&self) -> &Snapshot {
        &self.entries[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index + 1 < self.entries.len()
    }

    /// True while the timeline position differs from the save marker.
    pub fn has_unsaved_changes(&self) -> bool {
        self.current_index != self.save_index
    }

    /// Steps between the timeline position and the save marker.
    pub fn unsaved_changes_count(&self) -> usize {
        self.current_index.abs_diff(self.save_index)
    }

    /// Label of the entry `undo` would move to, without moving.
    pub fn undo_label(&self) -> Option<&OperationLabel> {
        if self.current_index == 0 {
            return None;
        }
        Some(&self.entries[self.current_index - 1].label)
    }

    /// Label of the entry `redo` would move to, without moving.
    pub fn redo_label(&self) -> Option<&OperationLabel> {
        self.entries.get(self.current_index + 1).map(|s| &s.label)
    }

    /// All snapshots, oldest first (history scrubber display).
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.entries
    }
}
