//! User stats — one counter row per user, bumped read-modify-write after
//! each successful create. Remote rows written by old client generations
//! carry legacy counter names; a static rename map normalizes them before
//! decoding. Every write stamps `last_login`.

use chrono::Utc;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{self, CacheOptions, FRESHNESS_WINDOW};
use crate::models::UserStats;
use crate::remote::tables;
use crate::retry::RetryPolicy;
use crate::state::AppState;

const KEY: &str = "user_stats";

/// Legacy counter names still present in rows written by old clients.
const LEGACY_RENAMES: &[(&str, &str)] = &[
    ("resumes_created", "resumes_count"),
    ("applications_submitted", "applications_count"),
    ("interviews_count", "interviews_completed"),
    ("offers_received", "job_offers"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    ResumesCount,
    ApplicationsCount,
    InterviewsCompleted,
    JobOffers,
}

/// Moves legacy counter keys to their current names. A current-name key
/// already present wins over its legacy twin.
pub fn normalize_row(mut row: Value) -> Value {
    if let Some(obj) = row.as_object_mut() {
        for (legacy, current) in LEGACY_RENAMES {
            if let Some(value) = obj.remove(*legacy) {
                obj.entry(current.to_string()).or_insert(value);
            }
        }
    }
    row
}

fn stats_opts() -> CacheOptions {
    CacheOptions {
        user_scoped: true,
        fan_out_legacy: false,
        ttl: None,
    }
}

/// Read path for the stats row. Falls back to zeroed counters.
pub async fn get_stats(state: &AppState, user_id: Uuid) -> UserStats {
    let cache_store = state.cache.as_ref();
    if cache::is_fresh(cache_store, KEY, user_id, FRESHNESS_WINDOW) {
        if let Some(cached) = cache::load::<UserStats>(cache_store, KEY, Some(user_id), stats_opts())
        {
            return cached;
        }
    }

    let result = RetryPolicy::secondary()
        .run("user_stats select", || {
            state.remote.select_owned(tables::USER_STATS, user_id)
        })
        .await;

    match result {
        Ok(rows) => {
            cache::stamp_pull(cache_store, KEY, user_id);
            let decoded = rows
                .into_iter()
                .next()
                .map(normalize_row)
                .and_then(|row| serde_json::from_value::<UserStats>(row).ok());
            match decoded {
                Some(stats) => {
                    cache::save(cache_store, KEY, &stats, Some(user_id), stats_opts());
                    stats
                }
                None => cache::load(cache_store, KEY, Some(user_id), stats_opts())
                    .unwrap_or_else(|| UserStats::empty(user_id)),
            }
        }
        Err(e) => {
            warn!("Stats pull failed, falling back to cache: {e}");
            cache::load(cache_store, KEY, Some(user_id), stats_opts())
                .unwrap_or_else(|| UserStats::empty(user_id))
        }
    }
}

/// Increments one counter read-modify-write and stamps `last_login`.
/// The remote upsert is keyed on `user_id` (one row per user).
pub async fn bump_stat(state: &AppState, user_id: Uuid, field: StatField) -> UserStats {
    let mut stats = get_stats(state, user_id).await;
    match field {
        StatField::ResumesCount => stats.resumes_count += 1,
        StatField::ApplicationsCount => stats.applications_count += 1,
        StatField::InterviewsCompleted => stats.interviews_completed += 1,
        StatField::JobOffers => stats.job_offers += 1,
    }
    stats.last_login = Some(Utc::now());

    cache::save(state.cache.as_ref(), KEY, &stats, Some(user_id), stats_opts());

    let row = vec![stats.to_remote_row()];
    RetryPolicy::primary()
        .run_or("user_stats upsert", (), || {
            state.remote.upsert(tables::USER_STATS, &row, "user_id")
        })
        .await;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;
    use crate::remote::fake::FakeRemote;
    use serde_json::json;
    use std::sync::Arc;

    fn state_with(fake: FakeRemote) -> (AppState, Arc<FakeRemote>) {
        let fake = Arc::new(fake);
        let state = AppState {
            cache: Arc::new(MemoryStore::new()),
            remote: fake.clone(),
        };
        (state, fake)
    }

    #[test]
    fn test_legacy_counter_names_are_renamed() {
        let row = json!({
            "user_id": Uuid::new_v4(),
            "resumes_created": 7,
            "offers_received": 2,
        });
        let stats: UserStats = serde_json::from_value(normalize_row(row)).unwrap();
        assert_eq!(stats.resumes_count, 7);
        assert_eq!(stats.job_offers, 2);
    }

    #[test]
    fn test_current_name_wins_over_legacy_twin() {
        let row = json!({
            "user_id": Uuid::new_v4(),
            "resumes_count": 3,
            "resumes_created": 99,
        });
        let stats: UserStats = serde_json::from_value(normalize_row(row)).unwrap();
        assert_eq!(stats.resumes_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bump_increments_and_stamps_last_login() {
        let user = Uuid::new_v4();
        let (state, fake) = state_with(FakeRemote::new());

        let stats = bump_stat(&state, user, StatField::ApplicationsCount).await;
        assert_eq!(stats.applications_count, 1);
        assert!(stats.last_login.is_some());

        let rows = fake.rows(tables::USER_STATS);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["applications_count"], 1);
        assert!(rows[0]["last_login"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_outage_defaults_to_empty_stats() {
        let user = Uuid::new_v4();
        let mut fake = FakeRemote::new();
        fake.fail_selects = true;
        let (state, _) = state_with(fake);

        let stats = get_stats(&state, user).await;
        assert_eq!(stats.resumes_count, 0);
        assert_eq!(stats.user_id, user);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decodes_legacy_remote_row() {
        let user = Uuid::new_v4();
        let (state, fake) = state_with(FakeRemote::new());
        fake.seed(
            tables::USER_STATS,
            json!({
                "user_id": user.to_string(),
                "resumes_created": 4,
                "interviews_count": 2,
            }),
        );

        let stats = get_stats(&state, user).await;
        assert_eq!(stats.resumes_count, 4);
        assert_eq!(stats.interviews_completed, 2);
    }
}
