//! Activity feed. Append-only; the cache keeps the 50 most recent entries,
//! newest first. Remote inserts are best-effort — a lost activity entry is
//! never worth surfacing an error for.

use serde_json::Value;
use uuid::Uuid;

use crate::cache::{self, CacheOptions};
use crate::models::ActivityRecord;
use crate::remote::tables;
use crate::retry::RetryPolicy;
use crate::services::{pull_collection, SyncEntity};
use crate::state::AppState;

/// Cap on locally cached feed entries.
const MAX_CACHED: usize = 50;

impl SyncEntity for ActivityRecord {
    const KEY: &'static str = "activities";
    const TABLE: &'static str = tables::USER_ACTIVITIES;

    fn remote_row(&self) -> Value {
        self.to_remote_row()
    }
}

/// Appends one entry: cache first (newest-first, truncated to the cap),
/// then a best-effort remote insert.
pub async fn record_activity(state: &AppState, record: ActivityRecord) {
    let cache_store = state.cache.as_ref();
    let user_id = record.user_id;
    let mut list: Vec<ActivityRecord> =
        cache::load(cache_store, ActivityRecord::KEY, Some(user_id), CacheOptions::entity())
            .unwrap_or_default();
    list.insert(0, record.clone());
    list.truncate(MAX_CACHED);
    cache::save(cache_store, ActivityRecord::KEY, &list, Some(user_id), CacheOptions::entity());

    let row = vec![record.to_remote_row()];
    RetryPolicy::secondary()
        .run_or("user_activities insert", (), || {
            state.remote.upsert(ActivityRecord::TABLE, &row, "id")
        })
        .await;
}

/// Standard read path; returned newest first, capped like the cache.
pub async fn recent_activities(state: &AppState, user_id: Uuid) -> Vec<ActivityRecord> {
    let mut list =
        pull_collection::<ActivityRecord>(state, user_id, RetryPolicy::secondary()).await;
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    list.truncate(MAX_CACHED);
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;
    use crate::models::ActivityKind;
    use crate::remote::fake::FakeRemote;
    use std::sync::Arc;

    fn state_with_fake() -> (AppState, Arc<FakeRemote>) {
        let fake = Arc::new(FakeRemote::new());
        let state = AppState {
            cache: Arc::new(MemoryStore::new()),
            remote: fake.clone(),
        };
        (state, fake)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_capped_at_50_newest_first() {
        let user = Uuid::new_v4();
        let (state, _) = state_with_fake();

        for i in 0..55 {
            let record = ActivityRecord::new(user, ActivityKind::Application, "created")
                .with_details(format!("entry-{i}"));
            record_activity(&state, record).await;
        }

        let cached: Vec<ActivityRecord> = cache::load(
            state.cache.as_ref(),
            "activities",
            Some(user),
            CacheOptions::entity(),
        )
        .unwrap();
        assert_eq!(cached.len(), 50);
        assert_eq!(cached[0].details.as_deref(), Some("entry-54"));
        assert_eq!(cached[49].details.as_deref(), Some("entry-5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_outage_does_not_block_recording() {
        let user = Uuid::new_v4();
        let mut fake = FakeRemote::new();
        fake.fail_upserts = true;
        let fake = Arc::new(fake);
        let state = AppState {
            cache: Arc::new(MemoryStore::new()),
            remote: fake.clone(),
        };

        let record = ActivityRecord::new(user, ActivityKind::Interview, "completed");
        record_activity(&state, record).await;

        let cached: Vec<ActivityRecord> = cache::load(
            state.cache.as_ref(),
            "activities",
            Some(user),
            CacheOptions::entity(),
        )
        .unwrap();
        assert_eq!(cached.len(), 1);
    }
}
