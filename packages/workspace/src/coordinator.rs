//! # Sync Coordinator
//!
//! Decides, at any instant, whether it is safe to apply an inbound remote
//! update, and drives debounced persistence of local edits without losing
//! or duplicating work.
//!
//! ## State machine (per document)
//!
//! ```text
//! Clean ──mark_change──► Dirty ──save ok──► Clean
//!                          │  ▲
//!              mark_change └──┘
//!
//! Dirty ──save ok, queued remote collides──► Conflicted ──resolve──► Clean
//! ```
//!
//! Remote updates are blocked throughout `Dirty`, while a save is in
//! flight, and for a grace window after a save completes. At most one save
//! runs at a time: a debounce firing that overlaps an active save
//! reschedules itself; an immediate-save request fails instead of racing.

use crate::conflict::{ConflictRecord, ConflictResolution};
use crate::errors::SaveError;
use crate::pending::{ChangeScope, PendingChanges, PendingSnapshot, PendingSummary};
use crate::remote::{RemoteEventType, RemotePayload, RemoteUpdate};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use planwheel_model::{ChangeAction, EntityPayload};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timing knobs for the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Delay between the last local edit and the save firing.
    pub debounce: Duration,
    /// Window after a completed save during which remote updates stay
    /// blocked, to avoid racing the echo of our own write.
    pub save_grace: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            save_grace: Duration::from_secs(1),
        }
    }
}

/// Dirty/version bookkeeping, readable as one snapshot.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirtyState {
    pub is_dirty: bool,
    pub dirty_since: Option<DateTime<Utc>>,
    pub local_version: u64,
    pub last_saved_version: u64,
    pub last_save_at: Option<DateTime<Utc>>,
}

/// What a completed save cycle reported.
#[derive(Debug)]
pub enum SaveOutcome {
    /// The callback resolved; pending changes were cleared. Carries any
    /// conflicts promoted from the remote-update queue.
    Saved {
        conflicts: Option<Vec<ConflictRecord>>,
    },
    /// Nothing was pending; no callback was invoked.
    NoChanges,
}

type SaveCallback = Arc<dyn Fn(PendingSnapshot) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct Inner {
    dirty: DirtyState,
    /// Monotonic clock twin of `dirty.last_save_at`, for grace-window math.
    last_save_instant: Option<Instant>,
    pending: PendingChanges,
    /// The change set most recently handed to a successful save; conflict
    /// detection compares queued remote updates against this.
    last_persisted: PendingChanges,
    queued_remote: Vec<RemoteUpdate>,
    conflicts: Option<Vec<ConflictRecord>>,
    is_saving: bool,
    /// Bumped on every (re)arm; a sleeping debounce task only fires if its
    /// generation is still current.
    debounce_generation: u64,
    save_callback: Option<SaveCallback>,
}

/// Shared handle to the coordinator. Clones observe the same state.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Mutex<Inner>>,
    options: SyncOptions,
}

impl SyncCoordinator {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                dirty: DirtyState::default(),
                last_save_instant: None,
                pending: PendingChanges::default(),
                last_persisted: PendingChanges::default(),
                queued_remote: Vec::new(),
                conflicts: None,
                is_saving: false,
                debounce_generation: 0,
                save_callback: None,
            })),
            options,
        }
    }

    /// Register the async function the scheduler and `save_immediately`
    /// invoke. Re-registration replaces the previous callback.
    pub fn set_save_callback<F, Fut>(&self, callback: F)
    where
        F: Fn(PendingSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.save_callback = Some(Arc::new(move |snapshot| callback(snapshot).boxed()));
    }

    /// Record one local entity change: bumps the local version, marks the
    /// document dirty, and coalesces into the pending accumulator.
    pub fn mark_change(
        &self,
        scope: ChangeScope,
        action: ChangeAction,
        id: &str,
        payload: Option<EntityPayload>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.dirty.local_version += 1;
        let version = inner.dirty.local_version;
        if !inner.dirty.is_dirty {
            inner.dirty.is_dirty = true;
            inner.dirty.dirty_since = Some(Utc::now());
        }
        inner.pending.record(&scope, action, id, payload, version);
    }

    /// Record a document-level field change (title, year, colors…),
    /// last write wins.
    pub fn mark_metadata_change(&self, field: &str, value: serde_json::Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.dirty.local_version += 1;
        let version = inner.dirty.local_version;
        if !inner.dirty.is_dirty {
            inner.dirty.is_dirty = true;
            inner.dirty.dirty_since = Some(Utc::now());
        }
        inner.pending.record_metadata(field, value, version);
    }

    /// Gate the realtime handler must consult before applying anything.
    pub fn should_block_remote_updates(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        if inner.dirty.is_dirty || inner.is_saving {
            return true;
        }
        match inner.last_save_instant {
            Some(at) => at.elapsed() < self.options.save_grace,
            None => false,
        }
    }

    /// Hold back a remote update for conflict checking after the current
    /// edit window resolves.
    pub fn queue_remote_update(&self, table: &str, event_type: RemoteEventType, payload: RemotePayload) {
        let mut inner = self.inner.lock().unwrap();
        let local_version_at_queue = inner.dirty.local_version;
        inner.queued_remote.push(RemoteUpdate {
            table: table.to_string(),
            event_type,
            payload,
            queued_at: Utc::now(),
            local_version_at_queue,
        });
    }

    /// Queued remote updates, in arrival order. Callers intending to
    /// resolve a conflict with [`ConflictResolution::Remote`] must retain
    /// this list before running a conflict check, which drains the queue.
    pub fn queued_remote_updates(&self) -> Vec<RemoteUpdate> {
        self.inner.lock().unwrap().queued_remote.clone()
    }

    pub fn get_pending_changes(&self) -> PendingSnapshot {
        let inner = self.inner.lock().unwrap();
        inner.pending.snapshot(inner.dirty.local_version)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.inner.lock().unwrap().pending.is_empty()
    }

    pub fn pending_summary(&self) -> PendingSummary {
        self.inner.lock().unwrap().pending.summary()
    }

    /// Reset the accumulator after a save round-trip completes. The cleared
    /// set is kept aside as the reference for conflict detection, the saved
    /// version and timestamps advance, and the document is clean again.
    pub fn clear_pending_changes(&self) {
        let version = self.inner.lock().unwrap().dirty.local_version;
        self.clear_pending_through(version);
    }

    /// Clear only the entries the just-completed save actually covered.
    /// Edits that landed while the callback was in flight stay pending (and
    /// keep the document dirty) for the next cycle.
    fn clear_pending_through(&self, saved_version: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_persisted = inner.pending.take_through(saved_version);
        inner.dirty.last_saved_version = saved_version;
        inner.dirty.last_save_at = Some(Utc::now());
        inner.last_save_instant = Some(Instant::now());
        if inner.pending.is_empty() {
            inner.dirty.is_dirty = false;
            inner.dirty.dirty_since = None;
        }
    }

    /// Promote queued remote updates that collide with the just-persisted
    /// change set into conflict records.
    ///
    /// The queue is drained either way: colliding updates become conflicts,
    /// the rest are stale echoes of state our save just overwrote and are
    /// discarded rather than applied.
    pub fn check_for_conflicts(&self) -> Option<Vec<ConflictRecord>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.queued_remote.is_empty() {
            return None;
        }
        let queued = std::mem::take(&mut inner.queued_remote);
        let mut conflicts = Vec::new();

        for update in &queued {
            let Some(entity_id) = update.payload.entity_id() else {
                continue;
            };
            let Some(local) = inner.last_persisted.change_for_table(&update.table, &entity_id)
            else {
                continue;
            };
            conflicts.push(ConflictRecord {
                source_table: update.table.clone(),
                entity_id,
                local_action: local.action,
                remote_action: update.event_type,
                local_payload: local.payload.clone(),
                remote_payload: update.payload.newest().cloned(),
                detected_at: Utc::now(),
            });
        }

        if conflicts.is_empty() {
            debug!(
                discarded = queued.len(),
                "queued remote updates were stale; discarded after save"
            );
            return None;
        }
        inner.conflicts = Some(conflicts.clone());
        Some(conflicts)
    }

    /// Resolve a surfaced conflict set.
    ///
    /// `Remote` replays `retained` (the queue contents captured before the
    /// conflict check drained it) through `apply_remote`; `Local` performs
    /// no further action — the local save has already won. Either path
    /// clears conflict state.
    pub fn resolve_conflict<F>(
        &self,
        resolution: ConflictResolution,
        retained: &[RemoteUpdate],
        mut apply_remote: F,
    ) where
        F: FnMut(&RemoteUpdate),
    {
        if resolution == ConflictResolution::Remote {
            for update in retained {
                apply_remote(update);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        inner.conflicts = None;
        inner.queued_remote.clear();
    }

    /// (Re)arm the debounced save. Each call supersedes any timer already
    /// armed; when the delay elapses the registered callback runs with the
    /// pending snapshot, unless a save is already in flight, in which case
    /// the firing re-arms itself instead of running concurrently.
    pub fn schedule_save(&self) {
        let generation = {
            let mut inner = self.inner.lock().unwrap();
            inner.debounce_generation += 1;
            inner.debounce_generation
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("schedule_save called outside a tokio runtime; debounce not armed");
            return;
        };
        let coordinator = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(coordinator.options.debounce).await;
            {
                let inner = coordinator.inner.lock().unwrap();
                if inner.debounce_generation != generation {
                    return; // superseded by a later schedule_save
                }
                if inner.pending.is_empty() {
                    return;
                }
                if inner.save_callback.is_none() {
                    warn!("debounced save fired with no save callback registered");
                    return;
                }
                if inner.is_saving {
                    drop(inner);
                    coordinator.schedule_save();
                    return;
                }
            }
            match coordinator.run_save_cycle().await {
                Ok(_) => {}
                Err(SaveError::InProgress) => coordinator.schedule_save(),
                Err(error) => {
                    warn!(%error, "debounced save failed; pending changes retained for retry");
                }
            }
        });
    }

    /// Bypass the debounce and save now. If a save is already in flight,
    /// waits briefly and fails rather than racing it.
    pub async fn save_immediately(&self) -> Result<SaveOutcome, SaveError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.debounce_generation += 1; // cancel any armed debounce
            if inner.pending.is_empty() {
                return Ok(SaveOutcome::NoChanges);
            }
            if inner.save_callback.is_none() {
                return Err(SaveError::NoCallback);
            }
        }

        if self.is_saving() {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.is_saving() {
                return Err(SaveError::InProgress);
            }
        }

        self.run_save_cycle().await
    }

    /// One full save cycle: snapshot pending, invoke the callback, then on
    /// success clear pending state and run the conflict check. On failure
    /// dirty state and pending changes are left intact so the next edit or
    /// manual retry re-attempts the same delta.
    async fn run_save_cycle(&self) -> Result<SaveOutcome, SaveError> {
        let (callback, snapshot) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.is_saving {
                return Err(SaveError::InProgress);
            }
            if inner.pending.is_empty() {
                return Ok(SaveOutcome::NoChanges);
            }
            let callback = inner.save_callback.clone().ok_or(SaveError::NoCallback)?;
            inner.is_saving = true;
            (callback, inner.pending.snapshot(inner.dirty.local_version))
        };
        let snapshot_version = snapshot.local_version;

        debug!(local_version = snapshot_version, "save cycle starting");
        let result = callback(snapshot).await;

        match result {
            Ok(()) => {
                self.clear_pending_through(snapshot_version);
                let conflicts = self.check_for_conflicts();
                self.inner.lock().unwrap().is_saving = false;
                debug!("save cycle completed");
                Ok(SaveOutcome::Saved { conflicts })
            }
            Err(error) => {
                self.inner.lock().unwrap().is_saving = false;
                warn!(%error, "save callback failed; dirty state preserved");
                Err(SaveError::Failed(error.to_string()))
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().unwrap().dirty.is_dirty
    }

    pub fn is_saving(&self) -> bool {
        self.inner.lock().unwrap().is_saving
    }

    pub fn has_conflict(&self) -> bool {
        self.inner.lock().unwrap().conflicts.is_some()
    }

    pub fn conflict_details(&self) -> Option<Vec<ConflictRecord>> {
        self.inner.lock().unwrap().conflicts.clone()
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.inner.lock().unwrap().dirty.clone()
    }

    pub fn local_version(&self) -> u64 {
        self.inner.lock().unwrap().dirty.local_version
    }

    pub fn last_saved_version(&self) -> u64 {
        self.inner.lock().unwrap().dirty.last_saved_version
    }
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}
