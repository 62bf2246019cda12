use std::sync::Arc;

use crate::cache::CacheStore;
use crate::remote::Remote;

/// Shared handles injected into every entity service: the durable local
/// cache and the remote backend behind its trait seam.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn CacheStore>,
    pub remote: Arc<dyn Remote>,
}
