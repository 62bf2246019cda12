use std::collections::HashMap;
use std::sync::Mutex;

use super::CacheStore;

/// In-process store. Used by tests and as the fallback when the cache
/// directory cannot be created.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("cache lock poisoned").get(key).cloned()
    }

    fn put_raw(&self, key: &str, value: String) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.to_string(), value);
    }

    fn remove_raw(&self, key: &str) {
        self.entries.lock().expect("cache lock poisoned").remove(key);
    }
}
