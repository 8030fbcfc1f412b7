//! # Operation Labels
//!
//! Human-readable descriptions for undo/redo history entries.
//!
//! Labels are tagged operation kinds plus interpolation parameters, never
//! free text — except for a legacy variant kept so old persisted history
//! labels still render. The kind decides the template; parameters (usually
//! the entity name) fill the `{{…}}` placeholders.

use planwheel_model::PlanDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything an undo/redo entry can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    // Title and year
    ChangeTitle,
    ChangeYear,
    ChangeColors,

    // Rings
    AddRing,
    RemoveRing,
    ChangeRingName,
    ChangeRingColor,
    ToggleRingVisibility,

    // Activity groups
    AddActivityGroup,
    RemoveActivityGroup,
    ChangeActivityGroupName,
    ChangeActivityGroupColor,
    ToggleActivityVisibility,

    // Labels
    AddLabel,
    RemoveLabel,
    ChangeLabelName,
    ChangeLabelColor,

    // Items
    AddActivity,
    RemoveActivity,
    UpdateActivity,
    DragItem,
    MoveActivity,
    ChangeDates,
    EditItem,

    // Generic fallbacks
    ChangeOrganization,
    Change,
}

impl OperationKind {
    /// Description template for this kind. `{{name}}` is replaced from the
    /// label's parameters.
    fn template(&self) -> &'static str {
        match self {
            OperationKind::ChangeTitle => "Change title",
            OperationKind::ChangeYear => "Change year",
            OperationKind::ChangeColors => "Change colors",
            OperationKind::AddRing => "Add ring",
            OperationKind::RemoveRing => "Remove ring",
            OperationKind::ChangeRingName => "Change ring name",
            OperationKind::ChangeRingColor => "Change ring color",
            OperationKind::ToggleRingVisibility => "Toggle ring visibility",
            OperationKind::AddActivityGroup => "Add activity group",
            OperationKind::RemoveActivityGroup => "Remove activity group",
            OperationKind::ChangeActivityGroupName => "Change activity group name",
            OperationKind::ChangeActivityGroupColor => "Change activity group color",
            OperationKind::ToggleActivityVisibility => "Toggle activity visibility",
            OperationKind::AddLabel => "Add label",
            OperationKind::RemoveLabel => "Remove label",
            OperationKind::ChangeLabelName => "Change label name",
            OperationKind::ChangeLabelColor => "Change label color",
            OperationKind::AddActivity => "Add activity",
            OperationKind::RemoveActivity => "Remove activity",
            OperationKind::UpdateActivity => "Update activity",
            OperationKind::DragItem => "Drag {{name}}",
            OperationKind::MoveActivity => "Move {{name}}",
            OperationKind::ChangeDates => "Change dates for {{name}}",
            OperationKind::EditItem => "Edit {{name}}",
            OperationKind::ChangeOrganization => "Change organization data",
            OperationKind::Change => "Change",
        }
    }
}

/// Label attached to one history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationLabel {
    /// Tagged kind with interpolation parameters.
    Tagged {
        kind: OperationKind,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, String>,
    },
    /// Free text carried over from history entries recorded before labels
    /// were structured.
    LegacyText { text: String },
}

impl OperationLabel {
    pub fn new(kind: OperationKind) -> Self {
        OperationLabel::Tagged {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Label with a `name` parameter, for item-level templates.
    pub fn named(kind: OperationKind, name: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert("name".to_string(), name.into());
        OperationLabel::Tagged { kind, params }
    }

    pub fn legacy(text: impl Into<String>) -> Self {
        OperationLabel::LegacyText { text: text.into() }
    }

    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            OperationLabel::Tagged { kind, .. } => Some(*kind),
            OperationLabel::LegacyText { .. } => None,
        }
    }

    /// Rendered description with parameters interpolated.
    pub fn describe(&self) -> String {
        match self {
            OperationLabel::LegacyText { text } => text.clone(),
            OperationLabel::Tagged { kind, params } => {
                let mut out = kind.template().to_string();
                for (key, value) in params {
                    out = out.replace(&format!("{{{{{key}}}}}"), value);
                }
                out
            }
        }
    }
}

impl std::fmt::Display for OperationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Classify an organization-data edit by diffing the documents around it.
///
/// Checks are ordered from most to least specific: entity count changes
/// first (add/remove), then item property edits, then visibility, name and
/// color changes. Falls through to the generic organization label.
pub fn detect_structure_change(old: &PlanDocument, new: &PlanDocument) -> OperationKind {
    let (os, ns) = (&old.structure, &new.structure);

    if ns.rings.len() != os.rings.len() {
        return if ns.rings.len() > os.rings.len() {
            OperationKind::AddRing
        } else {
            OperationKind::RemoveRing
        };
    }
    if ns.activity_groups.len() != os.activity_groups.len() {
        return if ns.activity_groups.len() > os.activity_groups.len() {
            OperationKind::AddActivityGroup
        } else {
            OperationKind::RemoveActivityGroup
        };
    }
    if ns.labels.len() != os.labels.len() {
        return if ns.labels.len() > os.labels.len() {
            OperationKind::AddLabel
        } else {
            OperationKind::RemoveLabel
        };
    }

    let old_items: Vec<_> = old.all_items().collect();
    let new_items: Vec<_> = new.all_items().collect();
    if new_items.len() != old_items.len() {
        return if new_items.len() > old_items.len() {
            OperationKind::AddActivity
        } else {
            OperationKind::RemoveActivity
        };
    }

    let item_changed = new_items.iter().any(|item| {
        match old_items.iter().find(|o| o.id == item.id) {
            None => true,
            Some(o) => {
                item.name != o.name
                    || item.span != o.span
                    || item.ring_id != o.ring_id
                    || item.activity_group_id != o.activity_group_id
            }
        }
    });
    if item_changed {
        return OperationKind::UpdateActivity;
    }

    if ns
        .rings
        .iter()
        .zip(&os.rings)
        .any(|(n, o)| n.visible != o.visible)
    {
        return OperationKind::ToggleRingVisibility;
    }
    if ns
        .activity_groups
        .iter()
        .zip(&os.activity_groups)
        .any(|(n, o)| n.visible != o.visible)
    {
        return OperationKind::ToggleActivityVisibility;
    }

    if ns.rings.iter().any(|n| {
        os.rings
            .iter()
            .find(|o| o.id == n.id)
            .is_some_and(|o| n.name != o.name)
    }) {
        return OperationKind::ChangeRingName;
    }
    if ns.activity_groups.iter().any(|n| {
        os.activity_groups
            .iter()
            .find(|o| o.id == n.id)
            .is_some_and(|o| n.name != o.name)
    }) {
        return OperationKind::ChangeActivityGroupName;
    }
    if ns.labels.iter().any(|n| {
        os.labels
            .iter()
            .find(|o| o.id == n.id)
            .is_some_and(|o| n.name != o.name)
    }) {
        return OperationKind::ChangeLabelName;
    }

    if ns.rings.iter().any(|n| {
        os.rings
            .iter()
            .find(|o| o.id == n.id)
            .is_some_and(|o| n.color != o.color)
    }) {
        return OperationKind::ChangeRingColor;
    }
    if ns.activity_groups.iter().any(|n| {
        os.activity_groups
            .iter()
            .find(|o| o.id == n.id)
            .is_some_and(|o| n.color != o.color)
    }) {
        return OperationKind::ChangeActivityGroupColor;
    }

    OperationKind::ChangeOrganization
}

#[cfg(test)]
mod tests {
    use super::*;
    use planwheel_model::{ActivityGroup, Orientation, Ring, RingKind};

    fn ring(id: &str, name: &str, color: &str, visible: bool) -> Ring {
        Ring {
            id: id.to_string(),
            name: name.to_string(),
            kind: RingKind::Inner,
            color: color.to_string(),
            visible,
            orientation: Orientation::Vertical,
        }
    }

    #[test]
    fn test_describe_interpolates_name() {
        let label = OperationLabel::named(OperationKind::MoveActivity, "Sprint review");
        assert_eq!(label.describe(), "Move Sprint review");
    }

    #[test]
    fn test_describe_plain_kind() {
        let label = OperationLabel::new(OperationKind::AddRing);
        assert_eq!(label.describe(), "Add ring");
    }

    #[test]
    fn test_legacy_text_renders_verbatim() {
        let label = OperationLabel::legacy("Flytta aktivitet");
        assert_eq!(label.describe(), "Flytta aktivitet");
        assert_eq!(label.kind(), None);
    }

    #[test]
    fn test_detect_add_ring() {
        let old = PlanDocument::default();
        let mut new = old.clone();
        new.structure.rings.push(ring("ring-1", "Ring 1", "#408cfb", true));
        assert_eq!(detect_structure_change(&old, &new), OperationKind::AddRing);
    }

    #[test]
    fn test_detect_rename_before_color() {
        let mut old = PlanDocument::default();
        old.structure.rings.push(ring("ring-1", "Ring 1", "#408cfb", true));
        let mut new = old.clone();
        new.structure.rings[0].name = "Marketing".to_string();
        new.structure.rings[0].color = "#ff0000".to_string();
        // Name changes win over color changes in the classification order.
        assert_eq!(
            detect_structure_change(&old, &new),
            OperationKind::ChangeRingName
        );
    }

    #[test]
    fn test_detect_visibility_toggle() {
        let mut old = PlanDocument::default();
        old.structure
            .activity_groups
            .push(ActivityGroup {
                id: "ag-1".to_string(),
                name: "Planning".to_string(),
                color: "#3B82F6".to_string(),
                visible: true,
            });
        let mut new = old.clone();
        new.structure.activity_groups[0].visible = false;
        assert_eq!(
            detect_structure_change(&old, &new),
            OperationKind::ToggleActivityVisibility
        );
    }

    #[test]
    fn test_detect_falls_back_to_organization() {
        let old = PlanDocument::default();
        let new = old.clone();
        assert_eq!(
            detect_structure_change(&old, &new),
            OperationKind::ChangeOrganization
        );
    }
}
