//! # Planwheel Model
//!
//! Data model for the planner document: the wheel metadata, its structural
//! entities (rings, activity groups, labels), and pages of dated items.
//!
//! Everything here is plain data. The document is owned and mutated by the
//! editing layer; history snapshots hold independently owned clones, so all
//! types are `Clone + PartialEq` (structural equality is what decides
//! whether a batched edit actually changed anything).

mod dates;
mod document;
mod entity;

pub use dates::DateSpan;
pub use document::{
    ActivityGroup, Item, ItemDependency, Label, Orientation, Page, PlanDocument, Ring, RingKind,
    WheelMetadata, WheelStructure,
};
pub use entity::{ChangeAction, DependencyKind, EntityCategory, EntityPayload};
