//! Cascading date updates for dependent items.

use chrono::Duration;
use planwheel_model::{DateSpan, DependencyKind, Item};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Typed rejection for edits that would violate the dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("\"{item}\" depending on \"{predecessor}\" would create a circular dependency")]
    CircularDependency { item: String, predecessor: String },

    #[error("Cannot start before predecessor \"{predecessor}\" allows (earliest start {min_start})")]
    StartsBeforePredecessor {
        predecessor: String,
        min_start: chrono::NaiveDate,
    },
}

/// One recomputed dependent produced by a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateShift {
    pub id: String,
    pub old_dates: DateSpan,
    pub new_dates: DateSpan,
}

/// Effective lag for a relation. A finish-to-start dependent may never
/// start on the exact day its predecessor ends, so the lag floors at one
/// day; the other relations take the configured lag as-is (zero and
/// negative included).
fn effective_lag(kind: DependencyKind, lag_days: i32) -> i64 {
    match kind {
        DependencyKind::FinishToStart => i64::from(lag_days.max(1)),
        DependencyKind::StartToStart | DependencyKind::FinishToFinish => i64::from(lag_days),
    }
}

/// New dates for `dependent` given its predecessor's (possibly already
/// shifted) span, preserving the dependent's own duration.
pub fn calculate_dependent_dates(predecessor: DateSpan, dependent: &Item) -> DateSpan {
    let Some(dep) = &dependent.dependency else {
        return dependent.span;
    };
    let lag = Duration::days(effective_lag(dep.kind, dep.lag_days));
    let duration = Duration::days(dependent.span.duration_days());

    match dep.kind {
        DependencyKind::FinishToStart => {
            let start = predecessor.end + lag;
            DateSpan::new(start, start + duration)
        }
        DependencyKind::StartToStart => {
            let start = predecessor.start + lag;
            DateSpan::new(start, start + duration)
        }
        DependencyKind::FinishToFinish => {
            let end = predecessor.end + lag;
            DateSpan::new(end - duration, end)
        }
    }
}

/// Items that declare `item_id` as their predecessor.
pub fn find_dependents<'a>(items: &'a [Item], item_id: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| item.depends_on() == Some(item_id))
        .collect()
}

/// Recompute every transitive dependent of a changed item.
///
/// Walks dependents depth-first, feeding each newly computed span into the
/// next level. Dependents whose recomputed dates equal their current dates
/// are skipped (and not walked into), and no node is visited twice — a
/// guard against residual cyclical data in loaded documents.
///
/// The input slice is not modified; the returned shifts are for the caller
/// to apply through its own mutation path.
pub fn cascade_update_dependents(
    items: &[Item],
    changed_id: &str,
    new_dates: DateSpan,
) -> Vec<DateShift> {
    let by_id: HashMap<&str, &Item> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut shifts = Vec::new();
    let mut visited = HashSet::new();

    fn walk(
        items: &[Item],
        by_id: &HashMap<&str, &Item>,
        item_id: &str,
        current_dates: DateSpan,
        visited: &mut HashSet<String>,
        shifts: &mut Vec<DateShift>,
    ) {
        if !visited.insert(item_id.to_string()) {
            return;
        }
        if !by_id.contains_key(item_id) {
            return;
        }

        for dependent in find_dependents(items, item_id) {
            let new_span = calculate_dependent_dates(current_dates, dependent);
            if new_span == dependent.span {
                continue;
            }
            shifts.push(DateShift {
                id: dependent.id.clone(),
                old_dates: dependent.span,
                new_dates: new_span,
            });
            walk(items, by_id, &dependent.id, new_span, visited, shifts);
        }
    }

    walk(items, &by_id, changed_id, new_dates, &mut visited, &mut shifts);
    shifts
}

/// Would making `proposed_predecessor_id` the predecessor of `item_id`
/// close a loop?
///
/// Rejects self-dependency outright, then follows the proposed
/// predecessor's own chain upward: reaching `item_id` means a cycle;
/// terminating (or running into an unrelated existing loop) means the edge
/// is safe.
pub fn would_create_circular_dependency(
    items: &[Item],
    item_id: &str,
    proposed_predecessor_id: &str,
) -> bool {
    if item_id == proposed_predecessor_id {
        return true;
    }

    let by_id: HashMap<&str, &Item> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut visited = HashSet::new();
    let mut current = Some(proposed_predecessor_id);

    while let Some(id) = current {
        if id == item_id {
            return true;
        }
        if !visited.insert(id) {
            // Existing loop elsewhere in the data; it does not involve us.
            return false;
        }
        current = by_id.get(id).and_then(|item| item.depends_on());
    }

    false
}

/// Ancestor chain of an item, root first.
pub fn get_dependency_chain<'a>(items: &'a [Item], item_id: &str) -> Vec<&'a Item> {
    let by_id: HashMap<&str, &Item> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = item_id.to_string();

    loop {
        let Some(item) = by_id.get(current.as_str()) else {
            break;
        };
        if !visited.insert(current.clone()) {
            break;
        }
        match item.depends_on() {
            Some(pred_id) => {
                if let Some(pred) = by_id.get(pred_id) {
                    chain.push(*pred);
                }
                current = pred_id.to_string();
            }
            None => break,
        }
    }

    chain.reverse();
    chain
}

/// Check a proposed date edit against the item's own predecessor
/// constraint.
///
/// Only the finish-to-start relation constrains proposals: the dependent
/// may not start before its predecessor's end plus the effective lag.
/// Items that merely *have* dependents are never blocked — their dependents
/// cascade instead.
pub fn validate_date_change(
    items: &[Item],
    item_id: &str,
    proposed: DateSpan,
) -> Result<(), ConstraintError> {
    let item = items
        .iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| ConstraintError::ItemNotFound(item_id.to_string()))?;

    let Some(dep) = &item.dependency else {
        return Ok(());
    };
    let Some(predecessor) = items.iter().find(|i| i.id == dep.predecessor_id) else {
        return Ok(());
    };

    if dep.kind == DependencyKind::FinishToStart {
        let min_start =
            predecessor.span.end + Duration::days(effective_lag(dep.kind, dep.lag_days));
        if proposed.start < min_start {
            return Err(ConstraintError::StartsBeforePredecessor {
                predecessor: predecessor.name.clone(),
                min_start,
            });
        }
    }

    Ok(())
}
