use std::sync::Arc;

use chrono::Duration;
use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::{Config, StorageConfig},
    error::{CacheError, QueryError},
};

pub struct State {
    pub config: Config,
    pub pool: Pool<Postgres>,
    pub cache: Option<MultiplexedConnection>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, potion::Error> {
        let (pool, cache) = connect_storage(&config.storage).await?;

        Ok(Arc::new(Self {
            config,
            pool,
            cache,
        }))
    }

    /// State around an already created pool, without a cache.
    pub fn with_pool(config: Config, pool: Pool<Postgres>) -> Arc<Self> {
        Arc::new(Self {
            config,
            pool,
            cache: None,
        })
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::hours(self.config.session_lifetime_hours)
    }
}

/// Opens the database pool, applies migrations when enabled and connects to
/// redis when it is configured.
pub async fn connect_storage(
    config: &StorageConfig,
) -> Result<(Pool<Postgres>, Option<MultiplexedConnection>), potion::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(QueryError::from)?;

    if config.run_migrations {
        log::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| QueryError::new(format!("{e}")))?;
    }

    let cache = match &config.redis_url {
        Some(url) => Some(init_redis(url).await?),
        None => {
            log::warn!("REDIS_URL not set, caching disabled");
            None
        }
    };

    Ok((pool, cache))
}

pub async fn init_redis(url: &str) -> Result<MultiplexedConnection, potion::Error> {
    let client = redis::Client::open(url).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    log::info!("Connected to redis");
    Ok(connection)
}
