//! # Planwheel Workspace
//!
//! Optimistic synchronization between local edits and remote collaborators.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editor: history + change tracking           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: sync coordination                │
//! │  - SyncCoordinator: dirty state, debounced  │
//! │    saves, remote-update gate, conflicts     │
//! │  - WheelSession: document + history +       │
//! │    tracker + schedule behind one facade     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ persistence / realtime transport (external) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Local edits win until persisted**: the document is dirty from the
//!    first edit until a save round-trip completes; remote updates observed
//!    in that window are queued, never applied over local state.
//! 2. **One save in flight**: debounce firings and immediate-save requests
//!    that overlap an active save reschedule or fail — they never race it.
//! 3. **Conflicts are data**: a queued remote update colliding with a
//!    just-saved local change surfaces as a [`ConflictRecord`] list for the
//!    caller to resolve; nothing is merged automatically.

mod conflict;
mod coordinator;
mod errors;
mod pending;
mod remote;
mod session;

pub use conflict::{ConflictRecord, ConflictResolution};
pub use coordinator::{DirtyState, SaveOutcome, SyncCoordinator, SyncOptions};
pub use errors::{SaveError, SessionError};
pub use pending::{
    ChangeScope, EntityDelta, ItemRef, ItemsDelta, PendingChange, PendingSnapshot, PendingSummary,
    StructureKind,
};
pub use remote::{RemoteEventType, RemotePayload, RemoteUpdate};
pub use session::{RemoteDisposition, WheelSession};
