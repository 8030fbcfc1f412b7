//! # Wheel Session
//!
//! One editing session over a plan document.
//!
//! The session owns the document and threads every mutation through the
//! same three paths: the history timeline (undo/redo), the change tracker
//! (minimal persistence delta), and the sync coordinator (dirty state and
//! debounced save). Date edits additionally consult the schedule engine so
//! dependent items cascade through the identical paths.

use crate::coordinator::{SaveOutcome, SyncCoordinator, SyncOptions};
use crate::errors::SessionError;
use crate::pending::{ChangeScope, PendingSnapshot, StructureKind};
use crate::remote::{RemoteEventType, RemotePayload};
use planwheel_editor::{
    ChangeTracker, EditorMode, History, HistoryOptions, OperationKind, OperationLabel, SyncContext,
};
use planwheel_model::{
    ActivityGroup, ChangeAction, DateSpan, DependencyKind, EntityCategory, EntityPayload, Item,
    ItemDependency, Label, PlanDocument, Ring,
};
use planwheel_schedule::{
    cascade_update_dependents, validate_date_change, would_create_circular_dependency,
    ConstraintError, DateShift,
};
use std::future::Future;

/// What the realtime handler should do with an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDisposition {
    /// Safe to apply directly.
    Apply,
    /// Local edits are outstanding; the update was queued for conflict
    /// checking after the next save.
    Queued,
}

/// Document + history + tracker + coordinator behind one facade.
pub struct WheelSession {
    document: PlanDocument,
    history: History,
    history_options: HistoryOptions,
    tracker: ChangeTracker,
    context: SyncContext,
    coordinator: SyncCoordinator,
}

impl WheelSession {
    pub fn new(
        document: PlanDocument,
        history_options: HistoryOptions,
        sync_options: SyncOptions,
    ) -> Self {
        Self {
            history: History::new(document.clone(), history_options),
            history_options,
            document,
            tracker: ChangeTracker::new(),
            context: SyncContext::new(),
            coordinator: SyncCoordinator::new(sync_options),
        }
    }

    pub fn document(&self) -> &PlanDocument {
        &self.document
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Register the persistence callback on the underlying coordinator.
    pub fn set_save_callback<F, Fut>(&self, callback: F)
    where
        F: Fn(PendingSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.coordinator.set_save_callback(callback);
    }

    // ------------------------------------------------------------------
    // Mutation plumbing
    // ------------------------------------------------------------------

    fn commit(&mut self, label: OperationLabel) {
        self.history
            .commit(&self.context, self.document.clone(), label);
    }

    fn record(
        &mut self,
        category: EntityCategory,
        scope: ChangeScope,
        action: ChangeAction,
        id: &str,
        payload: EntityPayload,
    ) {
        if self.context.skips_tracking() {
            return;
        }
        self.tracker.track(category, action, id, payload.clone());
        self.coordinator.mark_change(scope, action, id, Some(payload));
        self.coordinator.schedule_save();
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.metadata.title = title.into();
        self.commit(OperationLabel::new(OperationKind::ChangeTitle));
        if !self.context.skips_tracking() {
            self.coordinator
                .mark_metadata_change("title", serde_json::json!(self.document.metadata.title));
            self.coordinator.schedule_save();
        }
    }

    pub fn set_year(&mut self, year: impl Into<String>) {
        self.document.metadata.year = year.into();
        self.commit(OperationLabel::new(OperationKind::ChangeYear));
        if !self.context.skips_tracking() {
            self.coordinator
                .mark_metadata_change("year", serde_json::json!(self.document.metadata.year));
            self.coordinator.schedule_save();
        }
    }

    pub fn set_colors(&mut self, colors: Vec<String>) {
        self.document.metadata.colors = colors;
        self.commit(OperationLabel::new(OperationKind::ChangeColors));
        if !self.context.skips_tracking() {
            self.coordinator
                .mark_metadata_change("colors", serde_json::json!(self.document.metadata.colors));
            self.coordinator.schedule_save();
        }
    }

    // ------------------------------------------------------------------
    // Structure entities
    // ------------------------------------------------------------------

    pub fn add_ring(&mut self, ring: Ring) {
        let ring_id = ring.id.clone();
        self.document.structure.rings.push(ring.clone());
        self.commit(OperationLabel::new(OperationKind::AddRing));
        self.record(
            EntityCategory::Rings,
            ChangeScope::Structure(StructureKind::Rings),
            ChangeAction::Add,
            &ring_id,
            EntityPayload::Ring(ring),
        );
    }

    pub fn update_ring(&mut self, ring: Ring) -> Result<(), SessionError> {
        let before = self.document.clone();
        let existing = self
            .document
            .structure
            .rings
            .iter_mut()
            .find(|r| r.id == ring.id)
            .ok_or_else(|| SessionError::UnknownEntity(ring.id.clone()))?;
        *existing = ring.clone();

        // Classify the edit (rename vs recolor vs visibility) from the diff.
        let kind = planwheel_editor::detect_structure_change(&before, &self.document);
        let ring_id = ring.id.clone();
        self.commit(OperationLabel::new(kind));
        self.record(
            EntityCategory::Rings,
            ChangeScope::Structure(StructureKind::Rings),
            ChangeAction::Modify,
            &ring_id,
            EntityPayload::Ring(ring),
        );
        Ok(())
    }

    pub fn remove_ring(&mut self, ring_id: &str) -> Result<(), SessionError> {
        let position = self
            .document
            .structure
            .rings
            .iter()
            .position(|r| r.id == ring_id)
            .ok_or_else(|| SessionError::UnknownEntity(ring_id.to_string()))?;
        let removed = self.document.structure.rings.remove(position);
        self.commit(OperationLabel::new(OperationKind::RemoveRing));
        self.record(
            EntityCategory::Rings,
            ChangeScope::Structure(StructureKind::Rings),
            ChangeAction::Delete,
            ring_id,
            EntityPayload::Ring(removed),
        );
        Ok(())
    }

    pub fn add_activity_group(&mut self, group: ActivityGroup) {
        let group_id = group.id.clone();
        self.document.structure.activity_groups.push(group.clone());
        self.commit(OperationLabel::new(OperationKind::AddActivityGroup));
        self.record(
            EntityCategory::ActivityGroups,
            ChangeScope::Structure(StructureKind::ActivityGroups),
            ChangeAction::Add,
            &group_id,
            EntityPayload::ActivityGroup(group),
        );
    }

    pub fn add_label(&mut self, label: Label) {
        let label_id = label.id.clone();
        self.document.structure.labels.push(label.clone());
        self.commit(OperationLabel::new(OperationKind::AddLabel));
        self.record(
            EntityCategory::Labels,
            ChangeScope::Structure(StructureKind::Labels),
            ChangeAction::Add,
            &label_id,
            EntityPayload::Label(label),
        );
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    pub fn add_item(&mut self, page_id: &str, item: Item) -> Result<(), SessionError> {
        let item_id = item.id.clone();
        let page = self
            .document
            .page_mut(page_id)
            .ok_or_else(|| SessionError::UnknownEntity(page_id.to_string()))?;
        page.items.push(item.clone());
        self.commit(OperationLabel::new(OperationKind::AddActivity));
        self.record(
            EntityCategory::Items,
            ChangeScope::Items {
                page_id: page_id.to_string(),
            },
            ChangeAction::Add,
            &item_id,
            EntityPayload::Item(item),
        );
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<(), SessionError> {
        let page_id = self
            .document
            .page_of_item(item_id)
            .map(|p| p.id.clone())
            .ok_or_else(|| SessionError::UnknownEntity(item_id.to_string()))?;
        let Some(page) = self.document.page_mut(&page_id) else {
            return Err(SessionError::UnknownEntity(page_id));
        };
        let Some(position) = page.items.iter().position(|i| i.id == item_id) else {
            return Err(SessionError::UnknownEntity(item_id.to_string()));
        };
        let removed = page.items.remove(position);
        self.commit(OperationLabel::named(
            OperationKind::RemoveActivity,
            removed.name.clone(),
        ));
        self.record(
            EntityCategory::Items,
            ChangeScope::Items { page_id },
            ChangeAction::Delete,
            item_id,
            EntityPayload::Item(removed),
        );
        Ok(())
    }

    /// Move an item's dates, cascading to its dependents.
    ///
    /// The proposal is validated against the item's own predecessor
    /// constraint first; a rejection leaves the document untouched. On
    /// success the item and every shifted dependent are applied, committed
    /// as one history entry, and recorded in both change accumulators. The
    /// applied shifts are returned for the caller's UI.
    pub fn update_item_dates(
        &mut self,
        item_id: &str,
        proposed: DateSpan,
    ) -> Result<Vec<DateShift>, SessionError> {
        let items: Vec<Item> = self.document.all_items().cloned().collect();
        validate_date_change(&items, item_id, proposed)?;
        let shifts = cascade_update_dependents(&items, item_id, proposed);

        let name = self
            .document
            .find_item(item_id)
            .map(|i| i.name.clone())
            .ok_or_else(|| SessionError::UnknownEntity(item_id.to_string()))?;

        self.history
            .start_batch(OperationLabel::named(OperationKind::ChangeDates, name));
        self.context.set_mode(EditorMode::Batching);

        self.apply_item_span(item_id, proposed);
        for shift in &shifts {
            self.apply_item_span(&shift.id, shift.new_dates);
        }

        self.context.set_mode(EditorMode::Idle);
        self.history.end_batch();
        Ok(shifts)
    }

    fn apply_item_span(&mut self, item_id: &str, span: DateSpan) {
        if !self.document.set_item_span(item_id, span) {
            return;
        }
        let (page_id, item) = match self.document.page_of_item(item_id) {
            Some(page) => match page.items.iter().find(|i| i.id == item_id) {
                Some(item) => (page.id.clone(), item.clone()),
                None => return,
            },
            None => return,
        };
        self.commit(OperationLabel::named(
            OperationKind::ChangeDates,
            item.name.clone(),
        ));
        self.record(
            EntityCategory::Items,
            ChangeScope::Items { page_id },
            ChangeAction::Modify,
            item_id,
            EntityPayload::Item(item),
        );
    }

    /// Declare `item_id` dependent on `predecessor_id`. Rejected before any
    /// state changes if the edge would close a cycle.
    pub fn link_dependency(
        &mut self,
        item_id: &str,
        predecessor_id: &str,
        kind: DependencyKind,
        lag_days: i32,
    ) -> Result<(), SessionError> {
        let items: Vec<Item> = self.document.all_items().cloned().collect();
        if would_create_circular_dependency(&items, item_id, predecessor_id) {
            return Err(ConstraintError::CircularDependency {
                item: item_id.to_string(),
                predecessor: predecessor_id.to_string(),
            }
            .into());
        }

        let item = self
            .document
            .find_item_mut(item_id)
            .ok_or_else(|| SessionError::UnknownEntity(item_id.to_string()))?;
        item.dependency = Some(ItemDependency {
            predecessor_id: predecessor_id.to_string(),
            kind,
            lag_days,
        });
        let (name, updated) = (item.name.clone(), item.clone());

        self.commit(OperationLabel::named(OperationKind::EditItem, name));
        let page_id = self
            .document
            .page_of_item(item_id)
            .map(|p| p.id.clone())
            .unwrap_or_default();
        self.record(
            EntityCategory::Items,
            ChangeScope::Items { page_id },
            ChangeAction::Modify,
            item_id,
            EntityPayload::Item(updated),
        );
        Ok(())
    }

    pub fn unlink_dependency(&mut self, item_id: &str) -> Result<(), SessionError> {
        let item = self
            .document
            .find_item_mut(item_id)
            .ok_or_else(|| SessionError::UnknownEntity(item_id.to_string()))?;
        item.dependency = None;
        let (name, updated) = (item.name.clone(), item.clone());

        self.commit(OperationLabel::named(OperationKind::EditItem, name));
        let page_id = self
            .document
            .page_of_item(item_id)
            .map(|p| p.id.clone())
            .unwrap_or_default();
        self.record(
            EntityCategory::Items,
            ChangeScope::Items { page_id },
            ChangeAction::Modify,
            item_id,
            EntityPayload::Item(updated),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Gestures (batched edits)
    // ------------------------------------------------------------------

    /// Begin collapsing subsequent edits (a drag, a multi-field form) into
    /// one history entry.
    pub fn begin_gesture(&mut self, label: OperationLabel) {
        self.history.start_batch(label);
        self.context.set_mode(EditorMode::Batching);
    }

    /// Close the gesture. Returns the new history index if the gesture
    /// actually changed the document.
    pub fn end_gesture(&mut self) -> Option<usize> {
        self.context.set_mode(EditorMode::Idle);
        self.history.end_batch()
    }

    pub fn cancel_gesture(&mut self) {
        self.context.set_mode(EditorMode::Idle);
        self.history.cancel_batch();
        // Roll the document back to the timeline's current value.
        self.document = self.history.current().value.clone();
    }

    // ------------------------------------------------------------------
    // History navigation
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> Option<OperationLabel> {
        let label = self.history.undo()?;
        self.restore_current();
        Some(label)
    }

    pub fn redo(&mut self) -> Option<OperationLabel> {
        let label = self.history.redo()?;
        self.restore_current();
        Some(label)
    }

    pub fn jump_to(&mut self, index: usize) -> Option<OperationLabel> {
        let label = self.history.jump_to(index)?;
        self.restore_current();
        Some(label)
    }

    pub fn undo_to_save(&mut self) -> bool {
        let moved = self.history.undo_to_save();
        if moved {
            self.restore_current();
        }
        moved
    }

    fn restore_current(&mut self) {
        self.context.set_mode(EditorMode::RestoringVersion);
        self.document = self.history.current().value.clone();
        self.context.set_mode(EditorMode::Idle);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&OperationLabel> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&OperationLabel> {
        self.history.redo_label()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.history.has_unsaved_changes()
    }

    pub fn unsaved_changes_count(&self) -> usize {
        self.history.unsaved_changes_count()
    }

    // ------------------------------------------------------------------
    // Loading & persistence
    // ------------------------------------------------------------------

    /// Replace the document wholesale (initial load, page switch, version
    /// restore). No history entries or change records are produced, and the
    /// timeline collapses to the loaded value.
    pub fn load_document(&mut self, document: PlanDocument) {
        self.context.set_mode(EditorMode::Loading);
        self.document = document;
        self.history = History::new(self.document.clone(), self.history_options);
        self.tracker.clear();
        self.context.set_mode(EditorMode::Idle);
    }

    /// Flush pending changes now, bypassing the debounce. On success the
    /// history save marker advances and the tracker resets.
    pub async fn save_now(&mut self) -> Result<SaveOutcome, SessionError> {
        self.context.set_mode(EditorMode::Saving);
        let outcome = self.coordinator.save_immediately().await;
        self.context.set_mode(EditorMode::Idle);
        match outcome {
            Ok(SaveOutcome::Saved { conflicts }) => {
                self.history.mark_saved(None);
                self.tracker.clear();
                Ok(SaveOutcome::Saved { conflicts })
            }
            Ok(SaveOutcome::NoChanges) => Ok(SaveOutcome::NoChanges),
            Err(error) => Err(error.into()),
        }
    }

    // ------------------------------------------------------------------
    // Realtime gate
    // ------------------------------------------------------------------

    /// Offer an inbound realtime event to the coordinator's gate. Either
    /// the caller may apply it directly, or it has been queued for conflict
    /// checking after the next save.
    pub fn offer_remote_update(
        &self,
        table: &str,
        event_type: RemoteEventType,
        payload: RemotePayload,
    ) -> RemoteDisposition {
        if self.coordinator.should_block_remote_updates() {
            self.coordinator.queue_remote_update(table, event_type, payload);
            RemoteDisposition::Queued
        } else {
            RemoteDisposition::Apply
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.coordinator.is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.coordinator.is_saving()
    }

    pub fn has_conflict(&self) -> bool {
        self.coordinator.has_conflict()
    }
}
