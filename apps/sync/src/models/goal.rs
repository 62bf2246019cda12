use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// A numeric progress goal ("apply to 10 jobs this month").
/// `completed` flips either by explicit toggle or automatically once
/// `current` reaches `target`; the flip is what fires the activity entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub target: i64,
    #[serde(default)]
    pub current: i64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Goal {
    pub fn new(user_id: Uuid, title: impl Into<String>, target: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            target,
            current: 0,
            due_date: None,
            completed: false,
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_remote_row(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "title": self.title,
            "target": self.target,
            "current": self.current,
            "due_date": self.due_date,
            "completed": self.completed,
            "created_at": self.created_at.unwrap_or_else(Utc::now),
        })
    }
}
