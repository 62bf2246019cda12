//! Display preferences. Dark mode defaults to on for users who have never
//! toggled it.

use uuid::Uuid;

use crate::cache::{self, CacheOptions, CacheStore};

const KEY: &str = "dark_mode";

fn opts() -> CacheOptions {
    CacheOptions {
        user_scoped: true,
        fan_out_legacy: false,
        ttl: None,
    }
}

pub fn dark_mode(cache: &dyn CacheStore, user_id: Uuid) -> bool {
    cache::load(cache, KEY, Some(user_id), opts()).unwrap_or(true)
}

pub fn set_dark_mode(cache: &dyn CacheStore, user_id: Uuid, enabled: bool) {
    cache::save(cache, KEY, &enabled, Some(user_id), opts());
}
