use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Per-user counters, bumped read-modify-write after each successful create.
/// One row per user remotely, keyed on `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub user_id: Uuid,
    #[serde(default)]
    pub resumes_count: i64,
    #[serde(default)]
    pub applications_count: i64,
    #[serde(default)]
    pub interviews_completed: i64,
    #[serde(default)]
    pub job_offers: i64,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserStats {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            resumes_count: 0,
            applications_count: 0,
            interviews_completed: 0,
            job_offers: 0,
            last_login: None,
        }
    }

    pub fn to_remote_row(&self) -> Value {
        json!({
            "user_id": self.user_id,
            "resumes_count": self.resumes_count,
            "applications_count": self.applications_count,
            "interviews_completed": self.interviews_completed,
            "job_offers": self.job_offers,
            "last_login": self.last_login.unwrap_or_else(Utc::now),
        })
    }
}
