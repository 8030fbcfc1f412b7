//! # Planwheel Schedule
//!
//! Temporal dependency propagation between dated items.
//!
//! Items may declare a predecessor with a relation type (finish-to-start,
//! start-to-start, finish-to-finish) and a lag in days. When a predecessor's
//! dates move, every transitively dependent item is re-anchored while
//! keeping its own duration. Edits that would introduce a dependency cycle
//! or violate a predecessor constraint are rejected before any state
//! changes.

mod dependencies;

pub use dependencies::{
    calculate_dependent_dates, cascade_update_dependents, find_dependents, get_dependency_chain,
    validate_date_change, would_create_circular_dependency, ConstraintError, DateShift,
};
