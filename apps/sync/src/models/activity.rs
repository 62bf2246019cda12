use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Resume,
    Application,
    Interview,
    Goal,
}

/// One entry in the user's activity feed. Append-only; the local cache keeps
/// the 50 most recent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub action: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub related_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(user_id: Uuid, kind: ActivityKind, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            action: action.into(),
            details: None,
            related_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_related(mut self, related_id: impl Into<String>) -> Self {
        self.related_id = Some(related_id.into());
        self
    }

    pub fn to_remote_row(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "type": self.kind,
            "action": self.action,
            "details": self.details,
            "related_id": self.related_id,
            "created_at": self.created_at,
        })
    }
}
