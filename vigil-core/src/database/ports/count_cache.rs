use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Small key/value cache for aggregate counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CountCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<u64>>;
    async fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<()>;
    async fn evict(&self, key: &str) -> Result<()>;
}
