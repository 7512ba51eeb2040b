use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::{debug, info};

use crate::database::ports::count_cache::CountCache;
use crate::error::{DetectorError, Result};

#[derive(Clone)]
pub struct RedisCountCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisCountCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCountCache")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisCountCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis cache at {}", redis_url);

        let client = redis::Client::open(redis_url)
            .map_err(|e| DetectorError::Cache(format!("Failed to create Redis client: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| DetectorError::Cache(format!("Failed to connect to Redis: {e}")))?;

        info!("Successfully connected to Redis cache");

        Ok(Self { conn })
    }
}

#[async_trait]
impl CountCache for RedisCountCache {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn
            .get(key)
            .await
            .map_err(|e| DetectorError::Cache(format!("Redis GET failed: {e}")))?;

        if value.is_some() {
            debug!("Cache HIT: {}", key);
        } else {
            debug!("Cache MISS: {}", key);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<()> {
        debug!("Cache SET: {} (TTL: {:?})", key, ttl);

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| DetectorError::Cache(format!("Redis SETEX failed: {e}")))?;

        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        debug!("Cache DELETE: {}", key);

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| DetectorError::Cache(format!("Redis DEL failed: {e}")))?;

        Ok(())
    }
}
