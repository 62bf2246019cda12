//! Local cache — a typed key-value mirror of the remote store.
//!
//! Entity services treat this as durable browser-storage-equivalent state:
//! every write goes through here unconditionally, and every read path falls
//! back to it when the remote is unreachable. Keys are optionally scoped by
//! user (`"{user_id}:{key}"`), and a static alias map keeps data reachable
//! under the historical entity names (`job_applications` was once stored as
//! `interviews`; writes fan out to both so old readers keep working).
//!
//! Values are wrapped in an envelope carrying `updated_at` and an optional
//! expiry. Reads also accept bare pre-envelope values for compatibility with
//! caches written before the envelope existed.

pub mod disk;
pub mod memory;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// How long a successful remote pull satisfies subsequent reads.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Historical alternate names per entity key. Writes with legacy fan-out
/// duplicate under every alias; reads scan them after the canonical keys.
const LEGACY_ALIASES: &[(&str, &[&str])] = &[
    ("job_applications", &["interviews"]),
    ("interviews", &["job_applications"]),
];

/// String-keyed store with per-key atomic operations. `MemoryStore` backs
/// tests; `DiskStore` backs real runs.
pub trait CacheStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn put_raw(&self, key: &str, value: String);
    fn remove_raw(&self, key: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Prefix keys with the owning user id.
    pub user_scoped: bool,
    /// Duplicate writes across the legacy alias key set.
    pub fan_out_legacy: bool,
    /// Expiry for the written value; `None` means no expiry.
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    /// The options every entity collection uses: scoped, with fan-out.
    pub fn entity() -> Self {
        Self {
            user_scoped: true,
            fan_out_legacy: true,
            ttl: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
    meta: Meta,
}

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
}

fn scoped(user: Uuid, key: &str) -> String {
    format!("{user}:{key}")
}

fn aliases_for(key: &str) -> &'static [&'static str] {
    LEGACY_ALIASES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// The full key set a save touches, primary first.
fn write_keys(key: &str, user: Option<Uuid>, opts: &CacheOptions) -> Vec<String> {
    let mut keys = Vec::new();
    match user {
        Some(user) if opts.user_scoped => keys.push(scoped(user, key)),
        _ => keys.push(key.to_string()),
    }
    if opts.fan_out_legacy {
        if !keys.contains(&key.to_string()) {
            keys.push(key.to_string());
        }
        for alias in aliases_for(key) {
            keys.push(alias.to_string());
            if let Some(user) = user {
                keys.push(scoped(user, alias));
            }
        }
    }
    keys
}

/// Ordered read candidates: scoped primary, base, aliases, scoped aliases.
fn read_keys(key: &str, user: Option<Uuid>, opts: &CacheOptions) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(user) = user {
        if opts.user_scoped {
            keys.push(scoped(user, key));
        }
    }
    keys.push(key.to_string());
    for alias in aliases_for(key) {
        keys.push(alias.to_string());
        if let Some(user) = user {
            keys.push(scoped(user, alias));
        }
    }
    keys.dedup();
    keys
}

/// Serializes `value` in an envelope and writes it under the primary key,
/// plus the legacy key set when fan-out is requested.
pub fn save<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    user: Option<Uuid>,
    opts: CacheOptions,
) {
    let envelope = Envelope {
        data: value,
        meta: Meta {
            updated_at: Utc::now(),
            expiry: opts
                .ttl
                .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                .map(|ttl| Utc::now() + ttl),
        },
    };
    let serialized = match serde_json::to_string(&envelope) {
        Ok(s) => s,
        Err(e) => {
            debug!("cache save skipped for '{key}': serialize failed: {e}");
            return;
        }
    };
    for k in write_keys(key, user, &opts) {
        store.put_raw(&k, serialized.clone());
    }
}

/// Returns the first candidate key whose value parses and is unexpired.
/// A value that fails to parse as an envelope is retried as bare data
/// (pre-envelope caches); a value that fails both is treated as a miss.
pub fn load<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
    user: Option<Uuid>,
    opts: CacheOptions,
) -> Option<T> {
    for k in read_keys(key, user, &opts) {
        let Some(raw) = store.get_raw(&k) else {
            continue;
        };
        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) => {
                if let Some(expiry) = envelope.meta.expiry {
                    if expiry < Utc::now() {
                        debug!("cache entry '{k}' expired at {expiry}, skipping");
                        continue;
                    }
                }
                return Some(envelope.data);
            }
            Err(_) => {
                // Bare value written before the envelope format.
                if let Ok(data) = serde_json::from_str::<T>(&raw) {
                    return Some(data);
                }
                debug!("cache entry '{k}' unparseable, treating as miss");
            }
        }
    }
    None
}

/// Deletes the same key set `save` writes.
pub fn remove(store: &dyn CacheStore, key: &str, user: Option<Uuid>, opts: CacheOptions) {
    for k in write_keys(key, user, &opts) {
        store.remove_raw(&k);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pull-freshness stamps
// ────────────────────────────────────────────────────────────────────────────

fn pull_key(entity: &str) -> String {
    format!("last_{entity}_pull")
}

/// Records a successful remote pull for `entity` at the current time.
pub fn stamp_pull(store: &dyn CacheStore, entity: &str, user: Uuid) {
    stamp_pull_at(store, entity, user, Utc::now());
}

/// Records a pull at an explicit time. Exposed so tests can age the stamp.
pub fn stamp_pull_at(store: &dyn CacheStore, entity: &str, user: Uuid, when: DateTime<Utc>) {
    store.put_raw(&scoped(user, &pull_key(entity)), when.to_rfc3339());
}

/// True when the last pull for `entity` happened within `window`.
pub fn is_fresh(store: &dyn CacheStore, entity: &str, user: Uuid, window: Duration) -> bool {
    let Some(raw) = store.get_raw(&scoped(user, &pull_key(entity))) else {
        return false;
    };
    let Ok(when) = DateTime::parse_from_rfc3339(&raw) else {
        return false;
    };
    let age = Utc::now().signed_duration_since(when.with_timezone(&Utc));
    match chrono::Duration::from_std(window) {
        Ok(window) => age >= chrono::Duration::zero() && age < window,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn user() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn test_round_trip_scoped_entity() {
        let store = MemoryStore::new();
        let u = user();
        let value = vec!["a".to_string(), "b".to_string()];
        save(&store, "job_applications", &value, Some(u), CacheOptions::entity());
        let loaded: Vec<String> =
            load(&store, "job_applications", Some(u), CacheOptions::entity()).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_remove_then_load_is_none() {
        let store = MemoryStore::new();
        let u = user();
        save(&store, "job_applications", &vec![1, 2, 3], Some(u), CacheOptions::entity());
        remove(&store, "job_applications", Some(u), CacheOptions::entity());
        let loaded: Option<Vec<i32>> =
            load(&store, "job_applications", Some(u), CacheOptions::entity());
        assert!(loaded.is_none());
    }

    #[test]
    fn test_legacy_fan_out_reaches_every_alias() {
        let store = MemoryStore::new();
        let u = user();
        let value = vec!["acme".to_string()];
        save(&store, "job_applications", &value, Some(u), CacheOptions::entity());

        // Retrievable under the alias, both scoped and unscoped.
        let via_alias: Vec<String> =
            load(&store, "interviews", Some(u), CacheOptions::entity()).unwrap();
        assert_eq!(via_alias, value);
        let via_alias_unscoped: Vec<String> = load(
            &store,
            "interviews",
            None,
            CacheOptions {
                user_scoped: false,
                fan_out_legacy: true,
                ttl: None,
            },
        )
        .unwrap();
        assert_eq!(via_alias_unscoped, value);
    }

    #[test]
    fn test_scoped_key_wins_over_base() {
        let store = MemoryStore::new();
        let u = user();
        let opts = CacheOptions {
            user_scoped: true,
            fan_out_legacy: false,
            ttl: None,
        };
        save(&store, "goals", &vec!["scoped".to_string()], Some(u), opts);
        save(&store, "goals", &vec!["base".to_string()], None, opts);
        let loaded: Vec<String> = load(&store, "goals", Some(u), opts).unwrap();
        assert_eq!(loaded, vec!["scoped".to_string()]);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let store = MemoryStore::new();
        let u = user();
        let opts = CacheOptions {
            user_scoped: true,
            fan_out_legacy: false,
            ttl: Some(Duration::from_secs(0)),
        };
        save(&store, "goals", &vec![1], Some(u), opts);
        std::thread::sleep(Duration::from_millis(10));
        let loaded: Option<Vec<i32>> = load(&store, "goals", Some(u), opts);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_bare_pre_envelope_value_still_loads() {
        let store = MemoryStore::new();
        store.put_raw("resumes", "[\"old-format\"]".to_string());
        let loaded: Vec<String> =
            load(&store, "resumes", None, CacheOptions::default()).unwrap();
        assert_eq!(loaded, vec!["old-format".to_string()]);
    }

    #[test]
    fn test_unparseable_entry_treated_as_miss() {
        let store = MemoryStore::new();
        store.put_raw("resumes", "{not json".to_string());
        let loaded: Option<Vec<String>> = load(&store, "resumes", None, CacheOptions::default());
        assert!(loaded.is_none());
    }

    #[test]
    fn test_freshness_window_boundaries() {
        let store = MemoryStore::new();
        let u = user();
        stamp_pull_at(
            &store,
            "job_applications",
            u,
            Utc::now() - chrono::Duration::seconds(4 * 60 + 59),
        );
        assert!(is_fresh(&store, "job_applications", u, FRESHNESS_WINDOW));

        stamp_pull_at(
            &store,
            "job_applications",
            u,
            Utc::now() - chrono::Duration::seconds(5 * 60 + 1),
        );
        assert!(!is_fresh(&store, "job_applications", u, FRESHNESS_WINDOW));
    }

    #[test]
    fn test_no_stamp_is_stale() {
        let store = MemoryStore::new();
        assert!(!is_fresh(&store, "goals", user(), FRESHNESS_WINDOW));
    }
}
