//! # Planwheel Editor
//!
//! Editing-state engine for the planner document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: PlanDocument + entity payloads       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: history + change tracking           │
//! │  - History: snapshot timeline, undo/redo,   │
//! │    batches, save marker                     │
//! │  - ChangeTracker: minimal per-entity deltas │
//! │  - OperationLabel: undo/redo descriptions   │
//! │  - SyncContext: editing-mode state machine  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: optimistic sync + persistence    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are immutable**: every committed edit pushes an
//!    independently owned copy of the document; nothing hands out a mutable
//!    reference into the timeline.
//! 2. **History never panics**: out-of-range requests log and return a
//!    neutral result — history corruption must not crash an editing session.
//! 3. **Change tracking is minimal**: the tracker coalesces any number of
//!    intermediate edits down to the smallest add/modify/delete set that
//!    brings storage in line with the document.

mod change_tracker;
mod context;
mod history;
mod labels;

pub use change_tracker::{
    ActionCounts, CategoryChanges, ChangeSet, ChangeSummary, ChangeTracker, TrackedChanges,
};
pub use context::{EditorMode, SyncContext};
pub use history::{History, HistoryOptions, Snapshot};
pub use labels::{detect_structure_change, OperationKind, OperationLabel};
