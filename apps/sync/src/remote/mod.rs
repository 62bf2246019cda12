//! Remote client — the single point of entry for all Supabase traffic.
//!
//! ARCHITECTURAL RULE: no other module may issue HTTP to the backend
//! directly. Entity services depend on the `Remote` trait, never on
//! `SupabaseClient` itself, so every sync algorithm is testable against the
//! in-memory fake.

pub mod session;
pub mod supabase;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;

/// Remote table names. Row-level security scopes every table by the
/// authenticated user id.
pub mod tables {
    pub const RESUMES: &str = "resumes";
    pub const JOB_APPLICATIONS: &str = "job_applications";
    pub const USER_GOALS: &str = "user_goals";
    pub const USER_STATS: &str = "user_stats";
    pub const USER_ACTIVITIES: &str = "user_activities";
}

/// The operations entity services need from the backend. Matches the
/// PostgREST surface: filtered selects, conflict-resolved inserts, per-row
/// patches and deletes.
#[async_trait]
pub trait Remote: Send + Sync {
    /// All rows in `table` owned by `user_id`.
    async fn select_owned(&self, table: &str, user_id: Uuid) -> Result<Vec<Value>, AppError>;

    /// Insert-or-update keyed on `on_conflict`.
    async fn upsert(&self, table: &str, rows: &[Value], on_conflict: &str)
        -> Result<(), AppError>;

    /// Insert, silently skipping rows whose primary key already exists.
    async fn insert_ignore(&self, table: &str, rows: &[Value]) -> Result<(), AppError>;

    /// Patch one row by primary key.
    async fn update_by_id(&self, table: &str, id: &str, patch: &Value) -> Result<(), AppError>;

    /// Delete one row by primary key. Returns the number of rows removed —
    /// zero means the id matched nothing, which callers may treat as a
    /// reconciliation trigger rather than an error.
    async fn delete_by_id(&self, table: &str, id: &str) -> Result<u64, AppError>;
}
