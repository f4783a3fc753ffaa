use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    constants::{INGREDIENT_CACHE_KEY, TAG_CACHE_KEY},
    error::CacheError,
};

// Caching - keys

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    TagList,
    IngredientList,
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey {
        CacheKey {
            _value: key.to_string(),
            _type: self,
        }
    }

    /// Every value of this type is stamped with the generation stored under
    /// this key; replacing the generation invalidates all of them at once.
    pub fn bind_key(&self) -> &'static str {
        match self {
            CacheKeyType::TagList => TAG_CACHE_KEY,
            CacheKeyType::IngredientList => INGREDIENT_CACHE_KEY,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CacheKey {
    _value: String,
    _type: CacheKeyType,
}

impl CacheKey {
    pub fn kind(&self) -> CacheKeyType {
        self._type
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self._type {
            CacheKeyType::TagList => write!(f, "tags-{}", self._value),
            CacheKeyType::IngredientList => write!(f, "ingredients-{}", self._value),
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    _bind: Option<String>,
}

impl<T: Serialize + DeserializeOwned + Send + Sync + Clone + 'static> RedisValue<T> {
    /// Returns the cached value for `key` when it belongs to the current
    /// generation, otherwise runs `callback` and caches its result.
    /// Cache failures fall back to `callback`.
    pub async fn get_or<F, Fut>(
        key: &CacheKey,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, potion::Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, potion::Error>>,
    {
        let bind = match get_cache_value::<&str, String>(key.kind().bind_key(), cache).await {
            Ok(bind) => bind,
            Err(_) => return callback().await,
        };

        let cached = get_cache_value::<String, RedisValue<T>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {:?}", e.info);
                    }
                });
                None
            });

        // * Cannot use .map(|| {...}) due to async closures
        match cached {
            Some(cached) if cached._bind == bind => {
                log::trace!("> Found {}", key);
                return Ok(cached.value);
            }
            Some(_) => log::trace!("> Invalidated {}", key),
            None => {}
        }

        log::trace!("> Fetching {}", key);
        let value = callback().await?;

        let entry = RedisValue {
            value: value.clone(),
            _bind: bind,
        };
        if let Err(e) = set_cache_value::<String, RedisValue<T>>(key.to_string(), entry, cache).await
        {
            log::error!("> Failed to cache {}: {:?}", key, e.info);
        }

        Ok(value)
    }
}

/// Starts a new generation for `kind`, orphaning every value cached so far.
pub async fn invalidate_cache(
    kind: CacheKeyType,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let generation = Uuid::new_v4().to_string();
    log::info!("> New {:?} cache generation {}", kind, &generation);
    set_cache_value(kind.bind_key(), generation, cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, potion::Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
