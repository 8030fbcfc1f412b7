//! # Change Tracker
//!
//! Tracks entity-level deltas for efficient saves.
//!
//! Instead of persisting the entire document on every change, the tracker
//! accumulates what was added, modified, and deleted per category since the
//! last successful flush. Any number of intermediate edits coalesce down to
//! the minimal operation set:
//!
//! - add then modify stays an add (with the latest payload)
//! - add then delete cancels out entirely
//! - modify then delete becomes just a delete
//! - an id is never in more than one of the three collections
//!
//! The mechanism is generic over the payload: it knows categories, ids and
//! actions, nothing about document shape.

use planwheel_model::{ChangeAction, EntityCategory, EntityPayload};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Added/modified/deleted collections for one category.
#[derive(Debug, Clone)]
pub struct ChangeSet<P> {
    added: BTreeMap<String, P>,
    modified: BTreeMap<String, P>,
    deleted: BTreeSet<String>,
}

impl<P> Default for ChangeSet<P> {
    fn default() -> Self {
        Self {
            added: BTreeMap::new(),
            modified: BTreeMap::new(),
            deleted: BTreeSet::new(),
        }
    }
}

impl<P: Clone> ChangeSet<P> {
    /// Apply one action for an id, coalescing against what is already
    /// recorded.
    pub fn apply(&mut self, action: ChangeAction, id: &str, payload: P) {
        match action {
            ChangeAction::Add => {
                self.added.insert(id.to_string(), payload);
                self.modified.remove(id);
                self.deleted.remove(id);
            }
            ChangeAction::Delete => {
                if self.added.remove(id).is_some() {
                    // Added and deleted within the same window: storage
                    // never saw it, so nothing to persist.
                    self.modified.remove(id);
                } else {
                    self.modified.remove(id);
                    self.deleted.insert(id.to_string());
                }
            }
            ChangeAction::Modify => {
                if let Some(existing) = self.added.get_mut(id) {
                    *existing = payload;
                } else {
                    self.modified.insert(id.to_string(), payload);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    fn counts(&self) -> ActionCounts {
        ActionCounts {
            added: self.added.len(),
            modified: self.modified.len(),
            deleted: self.deleted.len(),
        }
    }

    fn materialize(&self) -> CategoryChanges<P> {
        CategoryChanges {
            added: self.added.values().cloned().collect(),
            modified: self.modified.values().cloned().collect(),
            deleted: self.deleted.iter().cloned().collect(),
        }
    }

    fn clear(&mut self) {
        self.added.clear();
        self.modified.clear();
        self.deleted.clear();
    }
}

/// Materialized per-category lists, ready for transport.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryChanges<P> {
    pub added: Vec<P>,
    pub modified: Vec<P>,
    pub deleted: Vec<String>,
}

/// Per-category, per-action counts for UI badges and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

/// All categories, materialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedChanges {
    pub items: CategoryChanges<EntityPayload>,
    pub rings: CategoryChanges<EntityPayload>,
    pub activity_groups: CategoryChanges<EntityPayload>,
    pub labels: CategoryChanges<EntityPayload>,
    pub pages: CategoryChanges<EntityPayload>,
}

/// Counts for all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub items: ActionCounts,
    pub rings: ActionCounts,
    pub activity_groups: ActionCounts,
    pub labels: ActionCounts,
    pub pages: ActionCounts,
}

/// Delta accumulator across all entity categories.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    categories: BTreeMap<EntityCategory, ChangeSet<EntityPayload>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entity-level change.
    pub fn track(
        &mut self,
        category: EntityCategory,
        action: ChangeAction,
        id: &str,
        payload: EntityPayload,
    ) {
        self.categories
            .entry(category)
            .or_default()
            .apply(action, id, payload);
    }

    fn category(&self, category: EntityCategory) -> CategoryChanges<EntityPayload> {
        self.categories
            .get(&category)
            .map(ChangeSet::materialize)
            .unwrap_or_else(|| CategoryChanges {
                added: Vec::new(),
                modified: Vec::new(),
                deleted: Vec::new(),
            })
    }

    /// Materialize every category's collections for transport.
    pub fn get_changes(&self) -> TrackedChanges {
        TrackedChanges {
            items: self.category(EntityCategory::Items),
            rings: self.category(EntityCategory::Rings),
            activity_groups: self.category(EntityCategory::ActivityGroups),
            labels: self.category(EntityCategory::Labels),
            pages: self.category(EntityCategory::Pages),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.categories.values().any(|set| !set.is_empty())
    }

    /// Reset every category. Called only after persistence confirms the
    /// flush succeeded.
    pub fn clear(&mut self) {
        for set in self.categories.values_mut() {
            set.clear();
        }
    }

    pub fn summary(&self) -> ChangeSummary {
        let counts = |category| {
            self.categories
                .get(&category)
                .map(ChangeSet::counts)
                .unwrap_or(ActionCounts {
                    added: 0,
                    modified: 0,
                    deleted: 0,
                })
        };
        ChangeSummary {
            items: counts(EntityCategory::Items),
            rings: counts(EntityCategory::Rings),
            activity_groups: counts(EntityCategory::ActivityGroups),
            labels: counts(EntityCategory::Labels),
            pages: counts(EntityCategory::Pages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planwheel_model::{ActivityGroup, Label, Ring, RingKind, Orientation};

    fn ring_payload(id: &str) -> EntityPayload {
        EntityPayload::Ring(Ring {
            id: id.to_string(),
            name: format!("Ring {id}"),
            kind: RingKind::Inner,
            color: "#408cfb".to_string(),
            visible: true,
            orientation: Orientation::Vertical,
        })
    }

    fn label_payload(id: &str, name: &str) -> EntityPayload {
        EntityPayload::Label(Label {
            id: id.to_string(),
            name: name.to_string(),
            color: "#999999".to_string(),
            visible: true,
        })
    }

    #[test]
    fn test_add_then_modify_stays_added() {
        let mut tracker = ChangeTracker::new();
        tracker.track(EntityCategory::Labels, ChangeAction::Add, "l1", label_payload("l1", "Draft"));
        tracker.track(
            EntityCategory::Labels,
            ChangeAction::Modify,
            "l1",
            label_payload("l1", "Final"),
        );

        let changes = tracker.get_changes();
        assert_eq!(changes.labels.added.len(), 1);
        assert!(changes.labels.modified.is_empty());
        // Latest payload wins inside `added`.
        match &changes.labels.added[0] {
            EntityPayload::Label(l) => assert_eq!(l.name, "Final"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_add_then_delete_cancels_out() {
        let mut tracker = ChangeTracker::new();
        tracker.track(EntityCategory::Rings, ChangeAction::Add, "r1", ring_payload("r1"));
        tracker.track(EntityCategory::Rings, ChangeAction::Delete, "r1", ring_payload("r1"));

        let changes = tracker.get_changes();
        assert!(changes.rings.added.is_empty());
        assert!(changes.rings.deleted.is_empty());
        assert!(!tracker.has_changes());
    }

    #[test]
    fn test_modify_then_delete_becomes_delete() {
        let mut tracker = ChangeTracker::new();
        tracker.track(EntityCategory::Rings, ChangeAction::Modify, "r1", ring_payload("r1"));
        tracker.track(EntityCategory::Rings, ChangeAction::Delete, "r1", ring_payload("r1"));

        let changes = tracker.get_changes();
        assert!(changes.rings.modified.is_empty());
        assert_eq!(changes.rings.deleted, vec!["r1".to_string()]);
    }

    #[test]
    fn test_has_changes_iff_any_collection_nonempty() {
        let mut tracker = ChangeTracker::new();
        assert!(!tracker.has_changes());

        tracker.track(
            EntityCategory::ActivityGroups,
            ChangeAction::Modify,
            "ag-1",
            EntityPayload::ActivityGroup(ActivityGroup {
                id: "ag-1".to_string(),
                name: "Planning".to_string(),
                color: "#3B82F6".to_string(),
                visible: true,
            }),
        );
        assert!(tracker.has_changes());

        tracker.clear();
        assert!(!tracker.has_changes());
        let changes = tracker.get_changes();
        assert!(changes.activity_groups.modified.is_empty());
    }

    #[test]
    fn test_summary_matches_materialized_cardinalities() {
        let mut tracker = ChangeTracker::new();
        tracker.track(EntityCategory::Rings, ChangeAction::Add, "r1", ring_payload("r1"));
        tracker.track(EntityCategory::Rings, ChangeAction::Add, "r2", ring_payload("r2"));
        tracker.track(EntityCategory::Rings, ChangeAction::Modify, "r3", ring_payload("r3"));
        tracker.track(EntityCategory::Rings, ChangeAction::Delete, "r4", ring_payload("r4"));

        let summary = tracker.summary();
        let changes = tracker.get_changes();
        assert_eq!(summary.rings.added, changes.rings.added.len());
        assert_eq!(summary.rings.modified, changes.rings.modified.len());
        assert_eq!(summary.rings.deleted, changes.rings.deleted.len());
        assert_eq!(summary.items.added, 0);
    }
}
