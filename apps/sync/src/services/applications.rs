//! Job application sync — the heaviest write path in the system.
//!
//! Saves are write-through: the cache is updated unconditionally (fanned out
//! across the legacy `interviews` alias), then records go to the remote in
//! batches of 20. A deployment whose `job_applications` table predates the
//! `updated_at` column rejects the upsert with a schema mismatch; those
//! batches fall back to an insert-ignoring-duplicates pass with a reduced
//! field set followed by per-record updates, each failure caught and skipped.

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{self, CacheOptions};
use crate::models::JobApplication;
use crate::remote::tables;
use crate::retry::RetryPolicy;
use crate::services::{pull_collection, SyncEntity};
use crate::state::AppState;

/// Upper bound on rows per remote write, keeping request payloads small.
const BATCH_SIZE: usize = 20;

impl SyncEntity for JobApplication {
    const KEY: &'static str = "job_applications";
    const TABLE: &'static str = tables::JOB_APPLICATIONS;

    fn remote_row(&self) -> Value {
        self.to_remote_row()
    }
}

/// Per-record result of a batch save. Partial success is visible to the
/// caller instead of being collapsed into a boolean; `any_saved` preserves
/// the old at-least-one contract where that is all a caller needs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchOutcome {
    pub saved: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchOutcome {
    pub fn any_saved(&self) -> bool {
        !self.saved.is_empty()
    }
}

/// Standard read path. Never errors; total failure yields an empty vec.
pub async fn get_applications(state: &AppState, user_id: Uuid) -> Vec<JobApplication> {
    pull_collection::<JobApplication>(state, user_id, RetryPolicy::primary()).await
}

/// Write-through save of the full application list.
pub async fn save_applications(
    state: &AppState,
    user_id: Uuid,
    mut apps: Vec<JobApplication>,
) -> BatchOutcome {
    // Repair ids before anything is persisted so the cache and the remote
    // never disagree about a record's identity.
    for app in &mut apps {
        app.user_id = user_id;
        if let Some(old) = app.ensure_valid_id() {
            warn!("Replaced invalid application id '{old}' with {}", app.id);
        }
    }

    let cache_store = state.cache.as_ref();
    cache::save(
        cache_store,
        JobApplication::KEY,
        &apps,
        Some(user_id),
        CacheOptions::entity(),
    );
    for app in &apps {
        cache::save(
            cache_store,
            &format!("job_application_{}", app.id),
            app,
            None,
            CacheOptions::default(),
        );
    }

    let policy = RetryPolicy::primary();
    let mut outcome = BatchOutcome::default();

    for chunk in apps.chunks(BATCH_SIZE) {
        let rows: Vec<Value> = chunk.iter().map(|a| a.to_remote_row()).collect();
        let result = policy
            .run("job_applications upsert", || {
                state.remote.upsert(JobApplication::TABLE, &rows, "id")
            })
            .await;

        match result {
            Ok(()) => outcome.saved.extend(chunk.iter().map(|a| a.id.clone())),
            Err(e) if e.is_schema_mismatch() => {
                warn!("Upsert rejected by remote schema, using reduced-field fallback: {e}");
                fallback_chunk(state, chunk, &mut outcome).await;
            }
            Err(e) => {
                warn!("Application batch of {} failed: {e}", chunk.len());
                outcome.failed.extend(chunk.iter().map(|a| a.id.clone()));
            }
        }
    }

    info!(
        "Saved {}/{} applications remotely",
        outcome.saved.len(),
        outcome.saved.len() + outcome.failed.len()
    );
    outcome
}

/// The schema-mismatch path: seed missing rows with the reduced field set,
/// then patch mutable fields one record at a time. Individual failures are
/// recorded and skipped, never aborting the rest of the chunk.
async fn fallback_chunk(state: &AppState, chunk: &[JobApplication], outcome: &mut BatchOutcome) {
    let reduced: Vec<Value> = chunk.iter().map(|a| a.to_reduced_row()).collect();
    if let Err(e) = state
        .remote
        .insert_ignore(JobApplication::TABLE, &reduced)
        .await
    {
        // Existing rows can still be patched below.
        warn!("Reduced-field insert failed: {e}");
    }

    for app in chunk {
        match state
            .remote
            .update_by_id(JobApplication::TABLE, &app.id, &app.to_update_patch())
            .await
        {
            Ok(()) => outcome.saved.push(app.id.clone()),
            Err(e) => {
                warn!("Update of application {} failed, skipping: {e}", app.id);
                outcome.failed.push(app.id.clone());
            }
        }
    }
}
