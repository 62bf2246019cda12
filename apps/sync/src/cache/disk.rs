use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::CacheStore;

/// Durable store: one JSON file per key under a cache directory. Writes go
/// to a temp file first and are renamed into place, so a crash mid-write
/// never leaves a torn value behind.
#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys carry ':' (user scoping), which is not portable in filenames.
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '~'
                }
            })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }

    fn write_atomic(&self, path: &Path, value: &str) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, path)
    }
}

impl CacheStore for DiskStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn put_raw(&self, key: &str, value: String) {
        let path = self.path_for(key);
        if let Err(e) = self.write_atomic(&path, &value) {
            warn!("cache write failed for '{key}': {e}");
        }
    }

    fn remove_raw(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("cache remove failed for '{key}': {e}");
            }
        }
    }
}
