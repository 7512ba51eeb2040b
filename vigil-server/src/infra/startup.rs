use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use vigil_config::Config;
use vigil_core::database::{
    AccountDirectory, CountCache, InMemoryAccountDirectory, InMemoryCountCache,
    InMemoryVerdictRepository, PostgresAccountDirectory,
    PostgresVerdictRepository, VerdictRepository, cache::RedisCountCache,
};

use super::app_state::{AppState, Backends};

/// Connects the configured backends, falling back to in-process storage
/// when no database or Redis is configured.
pub async fn connect_backends(config: &Config) -> anyhow::Result<Backends> {
    let directory: Arc<dyn AccountDirectory>;
    let verdicts: Arc<dyn VerdictRepository>;

    match &config.database.primary_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .connect(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            vigil_core::MIGRATOR
                .run(&pool)
                .await
                .context("database migration failed")?;
            info!("Connected to PostgreSQL and applied migrations");
            directory = Arc::new(PostgresAccountDirectory::new(pool.clone()));
            verdicts = Arc::new(PostgresVerdictRepository::new(pool));
        }
        None => {
            warn!("Using in-memory account directory and verdict store");
            directory = Arc::new(InMemoryAccountDirectory::new());
            verdicts = Arc::new(InMemoryVerdictRepository::new());
        }
    }

    let count_cache: Arc<dyn CountCache> = match &config.redis {
        Some(redis) => match RedisCountCache::new(&redis.url).await {
            Ok(cache) => Arc::new(cache),
            Err(err) => {
                warn!(error = %err, "Redis unavailable, caching flagged count in process");
                Arc::new(InMemoryCountCache::new())
            }
        },
        None => Arc::new(InMemoryCountCache::new()),
    };

    Ok(Backends {
        directory,
        verdicts,
        count_cache,
    })
}

pub async fn build_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let backends = connect_backends(&config).await?;
    Ok(AppState::new(config, backends))
}
