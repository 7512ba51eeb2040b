use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::database::ports::count_cache::CountCache;
use crate::database::ports::verdicts::VerdictRepository;
use crate::error::Result;

/// Cache key under which the aggregate is stored.
pub const FLAGGED_COUNT_KEY: &str = "vigil:verdicts:flagged_count";

/// Cached number of accounts whose verdict is flagged.
///
/// Recomputed from the verdict store on a miss. Concurrent misses each
/// recompute; there is no stampede protection. A recomputation that
/// overlaps an invalidation is returned but never left in the cache.
#[derive(Clone)]
pub struct FlaggedCountCache {
    verdicts: Arc<dyn VerdictRepository>,
    cache: Arc<dyn CountCache>,
    ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl fmt::Debug for FlaggedCountCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlaggedCountCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl FlaggedCountCache {
    pub fn new(
        verdicts: Arc<dyn VerdictRepository>,
        cache: Arc<dyn CountCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            verdicts,
            cache,
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached count, recomputing it on a miss.
    ///
    /// A failing cache backend degrades to a direct store query.
    pub async fn count(&self) -> Result<u64> {
        match self.cache.get(FLAGGED_COUNT_KEY).await {
            Ok(Some(count)) => return Ok(count),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "flagged count cache read failed"),
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let count = self.verdicts.count_flagged().await?;
        debug!(count, "recomputed flagged count");
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("flagged count invalidated during recompute; not caching");
            return Ok(count);
        }
        if let Err(err) = self.cache.set(FLAGGED_COUNT_KEY, count, self.ttl).await {
            warn!(error = %err, "flagged count cache write failed");
            return Ok(count);
        }
        // An invalidation may have landed between the check and the write.
        if self.generation.load(Ordering::SeqCst) != generation
            && let Err(err) = self.cache.evict(FLAGGED_COUNT_KEY).await
        {
            warn!(error = %err, "failed to drop stale flagged count");
        }
        Ok(count)
    }

    /// Drops the cached value and discards any recomputation in flight.
    pub async fn invalidate(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.evict(FLAGGED_COUNT_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::account::AccountId;
    use crate::database::infrastructure::memory::{InMemoryCountCache, InMemoryVerdictRepository};
    use crate::database::ports::count_cache::MockCountCache;
    use crate::database::ports::verdicts::VerdictRecord;
    use crate::error::DetectorError;
    use crate::verdict::{FlagSet, SuspicionVerdict, VerdictStatus};

    /// Verdict store whose `count_flagged` reads the count and then parks
    /// until released.
    struct GatedVerdicts {
        inner: InMemoryVerdictRepository,
        counted: Notify,
        release: Notify,
    }

    #[async_trait]
    impl VerdictRepository for GatedVerdicts {
        async fn get_verdict(&self, id: AccountId) -> Result<SuspicionVerdict> {
            self.inner.get_verdict(id).await
        }

        async fn set_verdict(&self, id: AccountId, verdict: &SuspicionVerdict) -> Result<()> {
            self.inner.set_verdict(id, verdict).await
        }

        async fn delete_verdict(&self, id: AccountId) -> Result<bool> {
            self.inner.delete_verdict(id).await
        }

        async fn count_flagged(&self) -> Result<u64> {
            let count = self.inner.count_flagged().await?;
            self.counted.notify_one();
            self.release.notified().await;
            Ok(count)
        }

        async fn list_by_status(
            &self,
            status: VerdictStatus,
            after: AccountId,
            limit: usize,
        ) -> Result<Vec<VerdictRecord>> {
            self.inner.list_by_status(status, after, limit).await
        }

        async fn purge_all(&self) -> Result<u64> {
            self.inner.purge_all().await
        }
    }

    #[tokio::test]
    async fn miss_recomputes_and_hit_reuses() {
        let verdicts = Arc::new(InMemoryVerdictRepository::new());
        let cache = FlaggedCountCache::new(
            verdicts.clone(),
            Arc::new(InMemoryCountCache::new()),
            Duration::from_secs(60),
        );
        verdicts
            .set_verdict(AccountId(1), &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);

        // Written behind the cache's back: the stale value is served.
        verdicts
            .set_verdict(AccountId(2), &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);

        cache.invalidate().await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn cache_failures_fall_back_to_store() {
        let verdicts = Arc::new(InMemoryVerdictRepository::new());
        verdicts
            .set_verdict(AccountId(1), &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();

        let mut backend = MockCountCache::new();
        backend
            .expect_get()
            .returning(|_| Err(DetectorError::Cache("down".into())));
        backend
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(DetectorError::Cache("down".into())));

        let cache = FlaggedCountCache::new(verdicts, Arc::new(backend), Duration::from_secs(60));
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalidation_during_recompute_is_not_overwritten() {
        let verdicts = Arc::new(GatedVerdicts {
            inner: InMemoryVerdictRepository::new(),
            counted: Notify::new(),
            release: Notify::new(),
        });
        let cache = FlaggedCountCache::new(
            verdicts.clone(),
            Arc::new(InMemoryCountCache::new()),
            Duration::from_secs(3600),
        );

        let reader = tokio::spawn({
            let cache = cache.clone();
            async move { cache.count().await }
        });

        // The reader has counted zero; a flag lands before it caches.
        verdicts.counted.notified().await;
        verdicts
            .set_verdict(AccountId(1), &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();
        cache.invalidate().await.unwrap();
        verdicts.release.notify_one();
        assert_eq!(reader.await.unwrap().unwrap(), 0);

        verdicts.release.notify_one();
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn oversized_ttl_still_caches() {
        let verdicts = Arc::new(InMemoryVerdictRepository::new());
        let cache = FlaggedCountCache::new(
            verdicts.clone(),
            Arc::new(InMemoryCountCache::new()),
            Duration::from_secs(u64::MAX),
        );
        verdicts
            .set_verdict(AccountId(1), &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);

        verdicts
            .set_verdict(AccountId(2), &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);
    }
}
