//! Goal tracking. Progress is a capped percentage; completion flips
//! automatically the first time `current` reaches `target` and fires exactly
//! one activity entry for the transition.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{self, CacheOptions};
use crate::models::{ActivityKind, ActivityRecord, Goal};
use crate::remote::tables;
use crate::retry::RetryPolicy;
use crate::services::{activity, pull_collection, SyncEntity};
use crate::state::AppState;

impl SyncEntity for Goal {
    const KEY: &'static str = "goals";
    const TABLE: &'static str = tables::USER_GOALS;

    fn remote_row(&self) -> Value {
        self.to_remote_row()
    }
}

/// Progress percentage, capped at 100. A non-positive target is treated as 1
/// so the division can never blow up on freshly created goals.
pub fn calculate_progress(current: i64, target: i64) -> u32 {
    let target = if target <= 0 { 1 } else { target };
    let pct = (current as f64 / target as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

pub async fn get_goals(state: &AppState, user_id: Uuid) -> Vec<Goal> {
    pull_collection::<Goal>(state, user_id, RetryPolicy::primary()).await
}

/// Creates or replaces a goal, write-through.
pub async fn save_goal(state: &AppState, user_id: Uuid, goal: Goal) -> bool {
    let cache_store = state.cache.as_ref();
    let mut list: Vec<Goal> =
        cache::load(cache_store, Goal::KEY, Some(user_id), CacheOptions::entity())
            .unwrap_or_default();
    list.retain(|g| g.id != goal.id);
    list.push(goal.clone());
    cache::save(cache_store, Goal::KEY, &list, Some(user_id), CacheOptions::entity());
    cache::save(
        cache_store,
        &format!("goal_{}", goal.id),
        &goal,
        None,
        CacheOptions::default(),
    );

    let row = vec![goal.to_remote_row()];
    RetryPolicy::primary()
        .run("user_goals upsert", || {
            state.remote.upsert(Goal::TABLE, &row, "id")
        })
        .await
        .map_err(|e| warn!("Goal {} kept locally only: {e}", goal.id))
        .is_ok()
}

/// Increments a goal's progress. Completion flips false→true at the first
/// call where `current >= target`; that transition (and only that one)
/// appends a `goal`/`completed` activity entry. Returns the updated goal,
/// or `None` when the id is unknown.
pub async fn update_goal_progress(
    state: &AppState,
    user_id: Uuid,
    goal_id: Uuid,
    delta: i64,
) -> Option<Goal> {
    let mut goals = get_goals(state, user_id).await;
    let goal = goals.iter_mut().find(|g| g.id == goal_id)?;

    goal.current += delta;
    let newly_completed = !goal.completed && goal.current >= goal.target;
    if newly_completed {
        goal.completed = true;
    }
    let updated = goal.clone();

    let cache_store = state.cache.as_ref();
    cache::save(cache_store, Goal::KEY, &goals, Some(user_id), CacheOptions::entity());
    cache::save(
        cache_store,
        &format!("goal_{goal_id}"),
        &updated,
        None,
        CacheOptions::default(),
    );

    let row = vec![updated.to_remote_row()];
    RetryPolicy::primary()
        .run_or("user_goals progress upsert", (), || {
            state.remote.upsert(Goal::TABLE, &row, "id")
        })
        .await;

    if newly_completed {
        let record = ActivityRecord::new(user_id, ActivityKind::Goal, "completed")
            .with_details(updated.title.clone())
            .with_related(goal_id.to_string());
        activity::record_activity(state, record).await;
    }

    Some(updated)
}

/// Removes a goal from both layers. Best-effort remotely.
pub async fn delete_goal(state: &AppState, user_id: Uuid, goal_id: Uuid) -> bool {
    let cache_store = state.cache.as_ref();
    let mut list: Vec<Goal> =
        cache::load(cache_store, Goal::KEY, Some(user_id), CacheOptions::entity())
            .unwrap_or_default();
    list.retain(|g| g.id != goal_id);
    cache::save(cache_store, Goal::KEY, &list, Some(user_id), CacheOptions::entity());
    cache::remove(cache_store, &format!("goal_{goal_id}"), None, CacheOptions::default());

    let id = goal_id.to_string();
    RetryPolicy::primary()
        .run("user_goals delete", || {
            state.remote.delete_by_id(Goal::TABLE, &id)
        })
        .await
        .map(|n| n > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;
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

    #[test]
    fn test_progress_caps_at_100() {
        assert_eq!(calculate_progress(12, 10), 100);
    }

    #[test]
    fn test_progress_zero_target_does_not_panic() {
        assert_eq!(calculate_progress(0, 0), 0);
        assert_eq!(calculate_progress(5, 0), 100);
    }

    #[test]
    fn test_progress_midway() {
        assert_eq!(calculate_progress(3, 10), 30);
        assert_eq!(calculate_progress(1, 3), 33);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_exactly_once() {
        let user = Uuid::new_v4();
        let (state, fake) = state_with_fake();
        let goal = Goal::new(user, "Apply to 5 jobs", 5);
        let goal_id = goal.id;
        save_goal(&state, user, goal).await;

        // Three +1 increments: still short of target.
        for _ in 0..3 {
            let g = update_goal_progress(&state, user, goal_id, 1).await.unwrap();
            assert!(!g.completed);
        }
        // +3 overshoots to 6: the flip happens here, once.
        let g = update_goal_progress(&state, user, goal_id, 3).await.unwrap();
        assert!(g.completed);
        assert_eq!(g.current, 6);

        let completions: Vec<_> = fake
            .rows(tables::USER_ACTIVITIES)
            .into_iter()
            .filter(|a| a["type"] == "goal" && a["action"] == "completed")
            .collect();
        assert_eq!(completions.len(), 1, "completion activity must fire exactly once");

        // Further progress on a completed goal fires nothing new.
        update_goal_progress(&state, user, goal_id, 1).await.unwrap();
        let completions = fake
            .rows(tables::USER_ACTIVITIES)
            .into_iter()
            .filter(|a| a["type"] == "goal" && a["action"] == "completed")
            .count();
        assert_eq!(completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_goal_returns_none() {
        let user = Uuid::new_v4();
        let (state, _) = state_with_fake();
        assert!(update_goal_progress(&state, user, Uuid::new_v4(), 1).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_goal_removes_both_layers() {
        let user = Uuid::new_v4();
        let (state, fake) = state_with_fake();
        let goal = Goal::new(user, "g", 3);
        let id = goal.id;
        save_goal(&state, user, goal).await;

        assert!(delete_goal(&state, user, id).await);
        assert!(fake.rows(tables::USER_GOALS).is_empty());
        assert!(get_goals(&state, user).await.is_empty());
    }
}
