//! Remote backend over Redis

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use relay_cache_core::{CacheBackend, CacheError, Result};

use super::config::RedisConfig;

/// Redis backend implementation
///
/// Stores raw envelope bytes under optionally prefixed keys. Unlike the
/// memory backend this one validates: empty keys are rejected with
/// [`CacheError::InvalidKey`] on `get`/`set` because a remote round-trip
/// for a key that cannot exist is always a caller bug.
///
/// Two declared capability gaps: the wire protocol offers no safe key
/// enumeration from this client's position, so `remove_by_pattern` and
/// `clear` return [`CacheError::Unsupported`] for the service layer to
/// surface.
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
}

impl RedisBackend {
    /// Create a new Redis backend, establishing the connection pool
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self { pool, config })
    }

    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey(
                "redis backend requires a non-empty key".to_string(),
            ));
        }
        Ok(())
    }

    fn unsupported(&self, operation: &str) -> CacheError {
        CacheError::Unsupported {
            backend: self.name().to_string(),
            operation: operation.to_string(),
        }
    }

    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Self::validate_key(key)?;
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.get(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        Self::validate_key(key)?;
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        match ttl {
            Some(ttl) => {
                // SET EX rejects a zero expiry; clamp sub-second TTLs up to 1s
                let secs = ttl.as_secs().max(1);
                conn.set_ex::<_, _, ()>(&prefixed, value, secs)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))
            }
            None => conn
                .set::<_, _, ()>(&prefixed, value)
                .await
                .map_err(|e| CacheError::Backend(e.to_string())),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let deleted: u64 = conn
            .del(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.exists(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn remove_by_pattern(&self, _pattern: &str) -> Result<Vec<String>> {
        Err(self.unsupported("remove_by_pattern"))
    }

    async fn clear(&self) -> Result<()> {
        Err(self.unsupported("clear"))
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.get_connection().await?;

        match &self.config.key_prefix {
            Some(prefix) => {
                // Prefixed deployments share the database, so count via SCAN
                let match_pattern = format!("{}:*", prefix);
                let mut cursor = 0u64;
                let mut count = 0usize;
                loop {
                    let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                        .cursor_arg(cursor)
                        .arg("MATCH")
                        .arg(&match_pattern)
                        .arg("COUNT")
                        .arg(1000)
                        .query_async(&mut *conn)
                        .await
                        .map_err(|e| CacheError::Backend(e.to_string()))?;

                    count += keys.len();
                    cursor = next_cursor;
                    if cursor == 0 {
                        break;
                    }
                }
                Ok(count)
            }
            None => {
                let size: usize = redis::cmd("DBSIZE")
                    .query_async(&mut *conn)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok(size)
            }
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
