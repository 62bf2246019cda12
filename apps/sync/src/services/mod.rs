//! Entity services — the cache-aside + write-through synchronization layer.
//!
//! Every collection follows the same read algorithm:
//! 1. A pull stamp younger than the freshness window short-circuits to cache.
//! 2. Otherwise the remote select runs under a `RetryPolicy`.
//! 3. Success: decode, write-through to cache (legacy fan-out where the
//!    entity has alias keys), stamp the pull, return.
//! 4. Failure: fall back to the cached copy; when one exists it is pushed
//!    back to the remote opportunistically (spawned, failures only logged).
//!
//! No read path ever propagates a remote error; the chain ends in an empty
//! or default value and the UI shows an empty state, not an error banner.

pub mod activity;
pub mod applications;
pub mod goals;
pub mod prefs;
pub mod resumes;
pub mod stats;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{self, CacheOptions, FRESHNESS_WINDOW};
use crate::retry::RetryPolicy;
use crate::state::AppState;

/// A collection entity that syncs between one cache key and one remote
/// table. `KEY` and `TABLE` differ where history left them apart
/// (e.g. cached `goals` vs remote `user_goals`).
pub trait SyncEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KEY: &'static str;
    const TABLE: &'static str;

    /// The snake_case remote row for this record.
    fn remote_row(&self) -> Value;
}

/// The shared read path. Returns an empty vec when every layer fails.
pub(crate) async fn pull_collection<T: SyncEntity>(
    state: &AppState,
    user_id: Uuid,
    policy: RetryPolicy,
) -> Vec<T> {
    let cache = state.cache.as_ref();

    if cache::is_fresh(cache, T::KEY, user_id, FRESHNESS_WINDOW) {
        if let Some(cached) =
            cache::load::<Vec<T>>(cache, T::KEY, Some(user_id), CacheOptions::entity())
        {
            debug!("{}: pull stamp fresh, serving {} cached records", T::KEY, cached.len());
            return cached;
        }
    }

    let result = policy
        .run(T::TABLE, || state.remote.select_owned(T::TABLE, user_id))
        .await;

    match result {
        Ok(rows) => {
            cache::stamp_pull(cache, T::KEY, user_id);
            if rows.is_empty() {
                // Remote is reachable but empty; a populated cache still wins
                // (records written while the backend was unreachable).
                return cache::load::<Vec<T>>(cache, T::KEY, Some(user_id), CacheOptions::entity())
                    .unwrap_or_default();
            }
            let decoded = decode_rows::<T>(rows);
            cache::save(cache, T::KEY, &decoded, Some(user_id), CacheOptions::entity());
            decoded
        }
        Err(e) => {
            warn!("{}: remote pull failed, falling back to cache: {e}", T::TABLE);
            let cached =
                cache::load::<Vec<T>>(cache, T::KEY, Some(user_id), CacheOptions::entity());
            match cached {
                Some(records) if !records.is_empty() => {
                    push_back::<T>(state, &records);
                    records
                }
                _ => Vec::new(),
            }
        }
    }
}

/// Decodes remote rows, skipping (and logging) any that no longer match the
/// expected shape rather than failing the whole pull.
fn decode_rows<T: SyncEntity>(rows: Vec<Value>) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("{}: skipping undecodable row: {e}", T::TABLE);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        warn!("{}: dropped {} of {} rows on decode", T::TABLE, total - decoded.len(), total);
    }
    decoded
}

/// Fire-and-forget resync of cached records after a failed remote read.
fn push_back<T: SyncEntity>(state: &AppState, records: &[T]) {
    let rows: Vec<Value> = records.iter().map(|r| r.remote_row()).collect();
    let remote = state.remote.clone();
    tokio::spawn(async move {
        match remote.upsert(T::TABLE, &rows, "id").await {
            Ok(()) => debug!("{}: pushed {} cached records back to remote", T::TABLE, rows.len()),
            Err(e) => debug!("{}: opportunistic push-back failed: {e}", T::TABLE),
        }
    });
}
