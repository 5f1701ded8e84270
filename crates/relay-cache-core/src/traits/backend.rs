//! Cache backend trait

use crate::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Core trait for all cache storage backends
///
/// A backend is the raw storage primitive beneath the cache service: it
/// moves opaque byte payloads keyed by string and knows nothing about
/// typed values, envelopes, or tags. Implementations include the
/// in-process memory store and the Redis client.
///
/// Key validation is deliberately per-backend: the memory backend treats
/// empty keys as a safe no-op or "not found", while the Redis backend
/// rejects them with [`CacheError::InvalidKey`] on `get`/`set`.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Get the raw bytes stored for a key
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store raw bytes under a key, optionally with a time-to-live
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), CacheError>;

    /// Delete a key
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key matching a glob pattern (`*` and `?` wildcards)
    ///
    /// Returns the removed keys so callers can keep their own indexes in
    /// sync. Backends without a key-enumeration primitive return
    /// [`CacheError::Unsupported`] instead of silently doing nothing.
    async fn remove_by_pattern(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Remove all entries
    ///
    /// Backends that cannot clear atomically return
    /// [`CacheError::Unsupported`].
    async fn clear(&self) -> Result<(), CacheError>;

    /// Number of live entries
    async fn len(&self) -> Result<usize, CacheError>;

    /// Check if the backend holds no entries
    async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }

    /// Short backend name used in logs and capability-gap reports
    fn name(&self) -> &'static str;
}
