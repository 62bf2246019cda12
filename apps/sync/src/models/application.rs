use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// A tracked job application.
///
/// `status` is deliberately free text, not an enum — users type anything from
/// "applied" to "waiting on final results". The `alias` attributes accept the
/// camelCase field names the previous client generation wrote into the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobApplication {
    /// Client-generated. Legacy records may carry non-UUID ids like
    /// "job-42"; those are repaired at the write boundary.
    pub id: String,
    pub user_id: Uuid,
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub date: Option<String>,
    pub status: String,
    #[serde(default, alias = "salaryMin")]
    pub salary_min: Option<i64>,
    #[serde(default, alias = "salaryMax")]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, alias = "isFavorite")]
    pub is_favorite: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobApplication {
    /// Replaces a syntactically invalid id with a fresh UUID. Returns the
    /// old id when a repair happened. External references to the old id are
    /// broken by this; the remote schema requires a UUID primary key, so the
    /// alternative is rejecting the record outright.
    pub fn ensure_valid_id(&mut self) -> Option<String> {
        if Uuid::parse_str(&self.id).is_ok() {
            return None;
        }
        let old = std::mem::replace(&mut self.id, Uuid::new_v4().to_string());
        Some(old)
    }

    /// Full row for the upsert path, snake_case column names.
    pub fn to_remote_row(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "company": self.company,
            "position": self.position,
            "date": self.date,
            "status": self.status,
            "salary_min": self.salary_min,
            "salary_max": self.salary_max,
            "notes": self.notes,
            "skills": self.skills,
            "is_favorite": self.is_favorite,
            "created_at": self.created_at.unwrap_or_else(Utc::now),
            "updated_at": self.updated_at.unwrap_or_else(Utc::now),
        })
    }

    /// Reduced row for the insert-ignoring-duplicates fallback, used against
    /// deployments whose `job_applications` table predates `updated_at`.
    pub fn to_reduced_row(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "company": self.company,
            "position": self.position,
            "status": self.status,
        })
    }

    /// Mutable fields for the per-record update pass of the fallback.
    pub fn to_update_patch(&self) -> Value {
        json!({
            "company": self.company,
            "position": self.position,
            "date": self.date,
            "status": self.status,
            "salary_min": self.salary_min,
            "salary_max": self.salary_max,
            "notes": self.notes,
            "skills": self.skills,
            "is_favorite": self.is_favorite,
        })
    }
}
