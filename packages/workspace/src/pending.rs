//! # Pending Changes
//!
//! The sync coordinator's own change accumulator.
//!
//! Same coalescing law as the editor's change tracker, but every entry is
//! stamped with the local version at its most recent edit so conflict
//! detection can reason about which save cycle a change belongs to. Item
//! changes additionally carry the page they live on; metadata fields are
//! simple last-write-wins values.

use planwheel_model::{ChangeAction, EntityPayload};
use serde::Serialize;
use std::collections::BTreeMap;

/// Structural sub-scope of the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StructureKind {
    Rings,
    ActivityGroups,
    Labels,
}

/// Where a local change lands in the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    Structure(StructureKind),
    Items { page_id: String },
}

/// One coalesced local edit awaiting persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub action: ChangeAction,
    pub payload: Option<EntityPayload>,
    /// Page the item lives on; absent for structure changes.
    pub page_id: Option<String>,
    /// Local version at the most recent edit of this entity.
    pub local_version: u64,
}

#[derive(Debug, Clone, Serialize)]
struct MetadataChange {
    value: serde_json::Value,
    local_version: u64,
}

/// Versioned accumulator of everything edited since the last clean save.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingChanges {
    structure: BTreeMap<StructureKind, BTreeMap<String, PendingChange>>,
    items: BTreeMap<String, PendingChange>,
    metadata: BTreeMap<String, MetadataChange>,
}

impl PendingChanges {
    /// Record one entity change, coalescing against the existing entry.
    pub(crate) fn record(
        &mut self,
        scope: &ChangeScope,
        action: ChangeAction,
        id: &str,
        payload: Option<EntityPayload>,
        local_version: u64,
    ) {
        let (map, page_id) = match scope {
            ChangeScope::Structure(kind) => (self.structure.entry(*kind).or_default(), None),
            ChangeScope::Items { page_id } => (&mut self.items, Some(page_id.clone())),
        };

        match action {
            ChangeAction::Delete => {
                // Added and deleted within the same window cancel out:
                // storage never saw the entity.
                if map.get(id).is_some_and(|c| c.action == ChangeAction::Add) {
                    map.remove(id);
                    return;
                }
                map.insert(
                    id.to_string(),
                    PendingChange {
                        action,
                        payload,
                        page_id,
                        local_version,
                    },
                );
            }
            ChangeAction::Add | ChangeAction::Modify => {
                // A modify after an add stays an add with the latest data.
                let action = if action == ChangeAction::Modify
                    && map.get(id).is_some_and(|c| c.action == ChangeAction::Add)
                {
                    ChangeAction::Add
                } else {
                    action
                };
                map.insert(
                    id.to_string(),
                    PendingChange {
                        action,
                        payload,
                        page_id,
                        local_version,
                    },
                );
            }
        }
    }

    /// Record a document-level field change, last write wins.
    pub(crate) fn record_metadata(&mut self, field: &str, value: serde_json::Value, local_version: u64) {
        self.metadata.insert(
            field.to_string(),
            MetadataChange {
                value,
                local_version,
            },
        );
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.structure.values().all(BTreeMap::is_empty)
            && self.items.is_empty()
            && self.metadata.is_empty()
    }

    /// Split off every entry recorded at or before `version`, leaving edits
    /// that landed after the save snapshot was taken. The removed set is
    /// what the save actually persisted.
    pub(crate) fn take_through(&mut self, version: u64) -> PendingChanges {
        let mut persisted = PendingChanges::default();
        for (kind, map) in &mut self.structure {
            let (take, keep): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(map)
                .into_iter()
                .partition(|(_, change)| change.local_version <= version);
            persisted.structure.insert(*kind, take);
            *map = keep;
        }
        let (take, keep): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|(_, change)| change.local_version <= version);
        persisted.items = take;
        self.items = keep;
        let (take, keep): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.metadata)
            .into_iter()
            .partition(|(_, change)| change.local_version <= version);
        persisted.metadata = take;
        self.metadata = keep;
        persisted
    }

    /// Pending entry for an entity, addressed by its realtime source table.
    pub(crate) fn change_for_table(&self, table: &str, entity_id: &str) -> Option<&PendingChange> {
        match table {
            "wheel_rings" => self
                .structure
                .get(&StructureKind::Rings)
                .and_then(|m| m.get(entity_id)),
            "activity_groups" => self
                .structure
                .get(&StructureKind::ActivityGroups)
                .and_then(|m| m.get(entity_id)),
            "labels" => self
                .structure
                .get(&StructureKind::Labels)
                .and_then(|m| m.get(entity_id)),
            "items" => self.items.get(entity_id),
            _ => None,
        }
    }

    fn structure_delta(&self, kind: StructureKind) -> EntityDelta {
        let mut delta = EntityDelta::default();
        if let Some(map) = self.structure.get(&kind) {
            for (id, change) in map {
                match change.action {
                    ChangeAction::Add => delta.added.extend(change.payload.clone()),
                    ChangeAction::Modify => delta.modified.extend(change.payload.clone()),
                    ChangeAction::Delete => delta.deleted.push(id.clone()),
                }
            }
        }
        delta
    }

    /// Materialize the accumulator for the save callback.
    pub(crate) fn snapshot(&self, local_version: u64) -> PendingSnapshot {
        let mut items = ItemsDelta::default();
        for (id, change) in &self.items {
            match change.action {
                ChangeAction::Add => items.added.extend(change.payload.clone()),
                ChangeAction::Modify => items.modified.extend(change.payload.clone()),
                ChangeAction::Delete => items.deleted.push(ItemRef {
                    id: id.clone(),
                    page_id: change.page_id.clone(),
                }),
            }
        }

        PendingSnapshot {
            rings: self.structure_delta(StructureKind::Rings),
            activity_groups: self.structure_delta(StructureKind::ActivityGroups),
            labels: self.structure_delta(StructureKind::Labels),
            items,
            metadata: self
                .metadata
                .iter()
                .map(|(field, change)| (field.clone(), change.value.clone()))
                .collect(),
            local_version,
        }
    }

    pub(crate) fn summary(&self) -> PendingSummary {
        let count = |kind| self.structure.get(&kind).map_or(0, BTreeMap::len);
        let rings = count(StructureKind::Rings);
        let activity_groups = count(StructureKind::ActivityGroups);
        let labels = count(StructureKind::Labels);
        PendingSummary {
            rings,
            activity_groups,
            labels,
            items: self.items.len(),
            metadata: self.metadata.len(),
            total: rings + activity_groups + labels + self.items.len() + self.metadata.len(),
        }
    }
}

/// Added/modified/deleted lists for one structural category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityDelta {
    pub added: Vec<EntityPayload>,
    pub modified: Vec<EntityPayload>,
    pub deleted: Vec<String>,
}

/// Deleted item reference, scoped to the page it lived on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub id: String,
    pub page_id: Option<String>,
}

/// Item deltas, page-scoped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemsDelta {
    pub added: Vec<EntityPayload>,
    pub modified: Vec<EntityPayload>,
    pub deleted: Vec<ItemRef>,
}

/// Structured snapshot of everything pending, handed to the save callback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSnapshot {
    pub rings: EntityDelta,
    pub activity_groups: EntityDelta,
    pub labels: EntityDelta,
    pub items: ItemsDelta,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub local_version: u64,
}

impl PendingSnapshot {
    pub fn is_empty(&self) -> bool {
        let delta_empty = |d: &EntityDelta| d.added.is_empty() && d.modified.is_empty() && d.deleted.is_empty();
        delta_empty(&self.rings)
            && delta_empty(&self.activity_groups)
            && delta_empty(&self.labels)
            && self.items.added.is_empty()
            && self.items.modified.is_empty()
            && self.items.deleted.is_empty()
            && self.metadata.is_empty()
    }
}

/// Per-scope entry counts for UI badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummary {
    pub rings: usize,
    pub activity_groups: usize,
    pub labels: usize,
    pub items: usize,
    pub metadata: usize,
    pub total: usize,
}
