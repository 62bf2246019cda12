//! Resume sync. Saves replace the whole content blob; there is no partial
//! update. Deletion carries an id-reconciliation path: locally held ids have
//! been observed to diverge from remote rows, so a delete that matches
//! nothing re-resolves the row by display name before giving up.

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{self, CacheOptions};
use crate::models::{ActivityKind, ActivityRecord, Resume};
use crate::remote::tables;
use crate::retry::RetryPolicy;
use crate::services::{activity, pull_collection, stats, SyncEntity};
use crate::state::AppState;

impl SyncEntity for Resume {
    const KEY: &'static str = "resumes";
    const TABLE: &'static str = tables::RESUMES;

    fn remote_row(&self) -> Value {
        self.to_remote_row()
    }
}

/// Standard read path, with one extra decode rule: blobs tagged with a
/// newer content version than this client understands are dropped loudly
/// instead of half-parsed.
pub async fn get_resumes(state: &AppState, user_id: Uuid) -> Vec<Resume> {
    let resumes = pull_collection::<Resume>(state, user_id, RetryPolicy::primary()).await;
    resumes
        .into_iter()
        .filter(|r| {
            if r.content_supported() {
                true
            } else {
                warn!(
                    "Resume {} has content version {} (newer than this client), skipping",
                    r.id, r.content_version
                );
                false
            }
        })
        .collect()
}

/// Write-through save. Returns true when the resume reached the remote;
/// the cache is updated either way. A brand-new resume bumps the resume
/// counter and appends an activity entry.
pub async fn save_resume(state: &AppState, user_id: Uuid, resume: Resume) -> bool {
    let cache_store = state.cache.as_ref();
    let mut list: Vec<Resume> =
        cache::load(cache_store, Resume::KEY, Some(user_id), CacheOptions::entity())
            .unwrap_or_default();
    let is_new = !list.iter().any(|r| r.id == resume.id);
    list.retain(|r| r.id != resume.id);
    list.push(resume.clone());
    cache::save(cache_store, Resume::KEY, &list, Some(user_id), CacheOptions::entity());
    cache::save(
        cache_store,
        &format!("resume_{}", resume.id),
        &resume,
        None,
        CacheOptions::default(),
    );

    let row = vec![resume.to_remote_row()];
    let saved = RetryPolicy::primary()
        .run("resumes upsert", || {
            state.remote.upsert(Resume::TABLE, &row, "id")
        })
        .await
        .is_ok();

    if saved && is_new {
        stats::bump_stat(state, user_id, stats::StatField::ResumesCount).await;
        let record = ActivityRecord::new(user_id, ActivityKind::Resume, "created")
            .with_details(resume.name.clone())
            .with_related(resume.id.to_string());
        activity::record_activity(state, record).await;
    }
    if !saved {
        warn!("Resume {} kept locally only; remote save failed", resume.id);
    }
    saved
}

/// Deletes by id, falling back to name-based reconciliation when the local
/// id matches no remote row. Returns true when a remote row was removed.
pub async fn delete_resume(state: &AppState, user_id: Uuid, id: Uuid, name: &str) -> bool {
    let cache_store = state.cache.as_ref();
    let mut list: Vec<Resume> =
        cache::load(cache_store, Resume::KEY, Some(user_id), CacheOptions::entity())
            .unwrap_or_default();
    list.retain(|r| r.id != id);
    cache::save(cache_store, Resume::KEY, &list, Some(user_id), CacheOptions::entity());
    cache::remove(cache_store, &format!("resume_{id}"), None, CacheOptions::default());

    let policy = RetryPolicy::primary();
    let id_str = id.to_string();
    let deleted = policy
        .run("resumes delete", || {
            state.remote.delete_by_id(Resume::TABLE, &id_str)
        })
        .await;

    match deleted {
        Ok(n) if n > 0 => {
            info!("Deleted resume {id}");
            return true;
        }
        Ok(_) => warn!("Resume {id} matched no remote row, reconciling by name"),
        Err(e) => warn!("Resume delete by id failed ({e}), reconciling by name"),
    }

    // The locally held id has diverged from the remote row. Re-resolve by
    // display name against the user's remote resumes.
    let remote_rows = policy
        .run_or("resumes reconcile select", Vec::new(), || {
            state.remote.select_owned(Resume::TABLE, user_id)
        })
        .await;
    let Some(remote_id) = remote_rows
        .iter()
        .find(|r| r.get("name").and_then(|v| v.as_str()) == Some(name))
        .and_then(|r| r.get("id").and_then(|v| v.as_str()))
        .map(String::from)
    else {
        warn!("No remote resume named '{name}' found; nothing to delete");
        return false;
    };

    warn!("Resume id diverged: local {id} resolved to remote {remote_id} by name");
    match policy
        .run("resumes delete reconciled", || {
            state.remote.delete_by_id(Resume::TABLE, &remote_id)
        })
        .await
    {
        Ok(n) => n > 0,
        Err(e) => {
            warn!("Reconciled delete of resume '{name}' failed: {e}");
            false
        }
    }
}
