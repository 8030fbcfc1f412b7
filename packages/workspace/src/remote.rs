//! Remote update queue types.
//!
//! Realtime events arrive from the transport collaborator as
//! `(table, event type, payload)` tuples. While local edits are
//! outstanding they are queued, annotated with the local version at
//! enqueue time, and resolved (conflict or stale-discard) only after the
//! in-flight save completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change the remote side reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteEventType {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for RemoteEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteEventType::Insert => "INSERT",
            RemoteEventType::Update => "UPDATE",
            RemoteEventType::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Row images carried by a realtime event. Deletes only populate `old`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePayload {
    pub new: Option<serde_json::Value>,
    pub old: Option<serde_json::Value>,
}

impl RemotePayload {
    /// Entity id from the new row image, falling back to the old one.
    pub fn entity_id(&self) -> Option<String> {
        let id_of = |value: &serde_json::Value| {
            value
                .get("id")
                .and_then(|id| id.as_str())
                .map(str::to_string)
        };
        self.new.as_ref().and_then(id_of).or_else(|| self.old.as_ref().and_then(id_of))
    }

    /// The most recent row image available.
    pub fn newest(&self) -> Option<&serde_json::Value> {
        self.new.as_ref().or(self.old.as_ref())
    }
}

/// A realtime event held back while local edits were outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUpdate {
    pub table: String,
    pub event_type: RemoteEventType,
    pub payload: RemotePayload,
    pub queued_at: DateTime<Utc>,
    /// Local version counter at the moment this update was queued.
    pub local_version_at_queue: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_id_prefers_new_row() {
        let payload = RemotePayload {
            new: Some(json!({ "id": "new-id" })),
            old: Some(json!({ "id": "old-id" })),
        };
        assert_eq!(payload.entity_id().as_deref(), Some("new-id"));
    }

    #[test]
    fn test_entity_id_falls_back_to_old_row() {
        let payload = RemotePayload {
            new: None,
            old: Some(json!({ "id": "old-id" })),
        };
        assert_eq!(payload.entity_id().as_deref(), Some("old-id"));
        assert_eq!(RemotePayload::default().entity_id(), None);
    }

    #[test]
    fn test_event_type_serializes_uppercase() {
        let json = serde_json::to_string(&RemoteEventType::Insert).unwrap();
        assert_eq!(json, "\"INSERT\"");
        assert_eq!(RemoteEventType::Delete.to_string(), "DELETE");
    }
}
