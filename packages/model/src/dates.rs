//! Calendar date spans for items.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive start/end span of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    #[serde(rename = "startDate")]
    pub start: NaiveDate,
    #[serde(rename = "endDate")]
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whole days between start and end. An item spanning a single day has
    /// duration 0, matching the end-minus-start arithmetic used when a
    /// cascaded item is re-anchored but keeps its length.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for DateSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
