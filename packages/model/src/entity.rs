//! Closed entity category set and typed change payloads.
//!
//! Change records carry one of the known entity structs rather than an
//! untyped blob; the category set is closed, so the payload is an enum.

use crate::document::{ActivityGroup, Item, Label, Page, Ring};
use serde::{Deserialize, Serialize};

/// The five persistable entity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityCategory {
    Items,
    Rings,
    ActivityGroups,
    Labels,
    Pages,
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityCategory::Items => "items",
            EntityCategory::Rings => "rings",
            EntityCategory::ActivityGroups => "activityGroups",
            EntityCategory::Labels => "labels",
            EntityCategory::Pages => "pages",
        };
        f.write_str(name)
    }
}

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Modify,
    Delete,
}

/// Relation between a dependent item and its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    FinishToStart,
    StartToStart,
    FinishToFinish,
}

impl Default for DependencyKind {
    fn default() -> Self {
        DependencyKind::FinishToStart
    }
}

/// A concrete changed entity, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityPayload {
    Item(Item),
    Ring(Ring),
    ActivityGroup(ActivityGroup),
    Label(Label),
    Page(Page),
}

impl EntityPayload {
    pub fn id(&self) -> &str {
        match self {
            EntityPayload::Item(i) => &i.id,
            EntityPayload::Ring(r) => &r.id,
            EntityPayload::ActivityGroup(g) => &g.id,
            EntityPayload::Label(l) => &l.id,
            EntityPayload::Page(p) => &p.id,
        }
    }

    pub fn category(&self) -> EntityCategory {
        match self {
            EntityPayload::Item(_) => EntityCategory::Items,
            EntityPayload::Ring(_) => EntityCategory::Rings,
            EntityPayload::ActivityGroup(_) => EntityCategory::ActivityGroups,
            EntityPayload::Label(_) => EntityCategory::Labels,
            EntityPayload::Page(_) => EntityCategory::Pages,
        }
    }
}
