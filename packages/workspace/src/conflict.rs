//! Conflict records and resolution choices.

use crate::remote::RemoteEventType;
use chrono::{DateTime, Utc};
use planwheel_model::{ChangeAction, EntityPayload};
use serde::Serialize;

/// A local change and a remote change that targeted the same entity within
/// an overlapping window. Surfaced as data; resolution is an explicit
/// caller decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub source_table: String,
    pub entity_id: String,
    pub local_action: ChangeAction,
    pub remote_action: RemoteEventType,
    pub local_payload: Option<EntityPayload>,
    pub remote_payload: Option<serde_json::Value>,
    pub detected_at: DateTime<Utc>,
}

/// How the caller chose to resolve a conflict set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// The just-completed local save stands; queued remote updates are
    /// dropped.
    Local,
    /// Replay the retained remote updates over local state.
    Remote,
}
