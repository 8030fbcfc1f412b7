//! # Plan Document
//!
//! The whole editable document: wheel metadata, structural entities shared
//! by every page (rings, activity groups, labels), and the pages themselves,
//! each holding the dated items for one year.
//!
//! The document has no behavior beyond lookups and field-level mutation
//! helpers. History, change tracking, and sync all operate on it from the
//! outside; none of them ever hand out a mutable reference to a snapshot
//! they own.

use crate::dates::DateSpan;
use crate::entity::DependencyKind;
use serde::{Deserialize, Serialize};

/// Document-level settings and display flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelMetadata {
    /// Persistence id, absent until first saved.
    pub wheel_id: Option<String>,
    pub title: String,
    pub year: String,
    pub colors: Vec<String>,
    pub show_week_ring: bool,
    pub show_month_ring: bool,
    pub show_ring_names: bool,
    pub show_labels: bool,
    pub week_ring_display_mode: String,
}

impl Default for WheelMetadata {
    fn default() -> Self {
        Self {
            wheel_id: None,
            title: "Untitled wheel".to_string(),
            year: "2025".to_string(),
            colors: vec![
                "#F5E6D3".to_string(),
                "#A8DCD1".to_string(),
                "#F4A896".to_string(),
                "#B8D4E8".to_string(),
            ],
            show_week_ring: true,
            show_month_ring: true,
            show_ring_names: true,
            show_labels: false,
            week_ring_display_mode: "week-numbers".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingKind {
    Inner,
    Outer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// A concentric band of the wheel that items are placed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ring {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RingKind,
    pub color: String,
    pub visible: bool,
    pub orientation: Orientation,
}

/// Grouping of items by activity, shared across pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityGroup {
    pub id: String,
    pub name: String,
    pub color: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    pub visible: bool,
}

/// Temporal constraint tying an item to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDependency {
    pub predecessor_id: String,
    #[serde(rename = "dependencyType")]
    pub kind: DependencyKind,
    pub lag_days: i32,
}

/// A dated entry on the wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub ring_id: String,
    pub activity_group_id: String,
    pub label_id: Option<String>,
    #[serde(flatten)]
    pub span: DateSpan,
    pub dependency: Option<ItemDependency>,
}

impl Item {
    /// Id of the predecessor this item depends on, if any.
    pub fn depends_on(&self) -> Option<&str> {
        self.dependency.as_ref().map(|d| d.predecessor_id.as_str())
    }
}

/// Entities shared by every page of the wheel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelStructure {
    pub rings: Vec<Ring>,
    pub activity_groups: Vec<ActivityGroup>,
    pub labels: Vec<Label>,
}

/// One year view of the wheel and the items placed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub year: i32,
    pub items: Vec<Item>,
}

/// The whole editable document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub metadata: WheelMetadata,
    pub structure: WheelStructure,
    pub pages: Vec<Page>,
}

impl PlanDocument {
    pub fn new(metadata: WheelMetadata) -> Self {
        Self {
            metadata,
            structure: WheelStructure::default(),
            pages: Vec::new(),
        }
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    pub fn page_mut(&mut self, page_id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == page_id)
    }

    /// All items across all pages.
    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.all_items().find(|i| i.id == item_id)
    }

    pub fn find_item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.pages
            .iter_mut()
            .flat_map(|p| p.items.iter_mut())
            .find(|i| i.id == item_id)
    }

    /// Page holding the given item.
    pub fn page_of_item(&self, item_id: &str) -> Option<&Page> {
        self.pages
            .iter()
            .find(|p| p.items.iter().any(|i| i.id == item_id))
    }

    /// Re-anchor one item's dates. Returns false if the item is unknown.
    pub fn set_item_span(&mut self, item_id: &str, span: DateSpan) -> bool {
        match self.find_item_mut(item_id) {
            Some(item) => {
                item.span = span;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_item_lookup_across_pages() {
        let mut doc = PlanDocument::default();
        doc.pages.push(Page {
            id: "page-1".to_string(),
            year: 2025,
            items: vec![Item {
                id: "item-1".to_string(),
                name: "Kickoff".to_string(),
                ring_id: "ring-1".to_string(),
                activity_group_id: "ag-1".to_string(),
                label_id: None,
                span: DateSpan::new(date(2025, 3, 1), date(2025, 3, 5)),
                dependency: None,
            }],
        });

        assert!(doc.find_item("item-1").is_some());
        assert!(doc.find_item("missing").is_none());
        assert_eq!(doc.page_of_item("item-1").map(|p| p.id.as_str()), Some("page-1"));
    }

    #[test]
    fn test_set_item_span() {
        let mut doc = PlanDocument::default();
        doc.pages.push(Page {
            id: "page-1".to_string(),
            year: 2025,
            items: vec![Item {
                id: "item-1".to_string(),
                name: "Kickoff".to_string(),
                ring_id: "ring-1".to_string(),
                activity_group_id: "ag-1".to_string(),
                label_id: None,
                span: DateSpan::new(date(2025, 3, 1), date(2025, 3, 5)),
                dependency: None,
            }],
        });

        let moved = DateSpan::new(date(2025, 4, 1), date(2025, 4, 5));
        assert!(doc.set_item_span("item-1", moved));
        assert_eq!(doc.find_item("item-1").unwrap().span, moved);
        assert!(!doc.set_item_span("missing", moved));
    }

    #[test]
    fn test_duration_days() {
        let span = DateSpan::new(date(2025, 6, 12), date(2025, 6, 14));
        assert_eq!(span.duration_days(), 2);
    }
}
