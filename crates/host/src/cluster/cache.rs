//! Time-bounded single-value cache

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry<T> {
    data: Arc<T>,
    stored_at: Instant,
}

/// Holds the last fetched value of one resource kind for `ttl`
pub struct TtlCache<T> {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Cached value if it is younger than the TTL
    pub async fn get(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.data))
    }

    /// Replace the cached value, restarting its lifetime
    pub async fn store(&self, data: T) -> Arc<T> {
        let data = Arc::new(data);
        *self.entry.write().await = Some(CacheEntry {
            data: Arc::clone(&data),
            stored_at: Instant::now(),
        });
        data
    }
}
