use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::database::ports::count_cache::CountCache;
use crate::error::Result;

/// Process-local TTL cache.
///
/// A TTL too large to express as a deadline keeps the entry until evicted.
#[derive(Debug, Default)]
pub struct InMemoryCountCache {
    entries: Mutex<HashMap<String, (u64, Option<Instant>)>>,
}

impl InMemoryCountCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CountCache for InMemoryCountCache {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if expires_at.is_none_or(|at| at > Instant::now()) => {
                debug!("Cache HIT: {}", key);
                Ok(Some(*value))
            }
            Some(_) => {
                debug!("Cache EXPIRED: {}", key);
                entries.remove(key);
                Ok(None)
            }
            None => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<()> {
        debug!("Cache SET: {} (TTL: {:?})", key, ttl);
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .lock()
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        debug!("Cache DELETE: {}", key);
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryCountCache::new();
        cache.set("k", 3, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(3));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_ttl_keeps_entry() {
        let cache = InMemoryCountCache::new();
        cache.set("k", 5, Duration::from_secs(u64::MAX)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(5));

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(5));

        cache.evict("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn evict_removes_entry() {
        let cache = InMemoryCountCache::new();
        cache.set("k", 1, Duration::from_secs(60)).await.unwrap();
        cache.evict("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
