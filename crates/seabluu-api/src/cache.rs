//! Short-lived cache for admin search results.

use std::{collections::HashMap, sync::Arc, time::Duration};

use seabluu_core::Clock;
use tokio::sync::RwLock;

/// Key/value cache whose entries expire after a fixed TTL. Writers clear it
/// wholesale, so entries never outlive a change they would hide.
pub struct TtlCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, (std::time::Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache. A zero TTL disables caching.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock, entries: RwLock::new(HashMap::new()) }
    }

    /// Fresh value for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let (stored_at, value) = entries.get(key)?;
        (self.clock.now().saturating_duration_since(*stored_at) < self.ttl).then(|| value.clone())
    }

    /// Stores `value` under `key`, dropping expired entries.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| now.saturating_duration_since(*stored_at) < self.ttl);
        entries.insert(key.into(), (now, value));
    }

    /// Forgets everything.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
