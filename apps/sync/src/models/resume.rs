use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Newest content layout the client understands.
pub const CONTENT_VERSION: u32 = 1;

/// A saved resume. `content` is the serialized builder state (personal info,
/// experience, education, skills, section order); it is mutated only by
/// full-blob replacement, never patched field by field. The version tag lets
/// readers reject blobs from a newer client instead of half-parsing them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub content: Value,
    #[serde(default = "default_content_version")]
    pub content_version: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_content_version() -> u32 {
    CONTENT_VERSION
}

impl Resume {
    pub fn new(user_id: Uuid, name: impl Into<String>, content: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            content,
            content_version: CONTENT_VERSION,
            updated_at: Some(Utc::now()),
        }
    }

    /// True when this client can interpret the content blob.
    pub fn content_supported(&self) -> bool {
        self.content_version <= CONTENT_VERSION
    }

    pub fn to_remote_row(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "name": self.name,
            "content": self.content,
            "content_version": self.content_version,
            "updated_at": self.updated_at.unwrap_or_else(Utc::now),
        })
    }
}
