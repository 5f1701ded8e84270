//! Process-wide cache configuration

use std::time::Duration;

/// Defaults applied to every operation on a cache service
///
/// A `CacheConfig` is an immutable value: the service replaces it
/// wholesale rather than mutating fields in place, so an in-flight
/// operation sees either the old or the new generation, never a mix.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a set carries no explicit expiration
    pub default_expiration: Option<Duration>,
    /// Soft target for entry count (advisory, enforced by backends that can)
    pub max_cache_size: usize,
    /// Serialized size above which payloads are compressed
    pub compression_threshold: usize,
    /// Interval for backends that run periodic expiry sweeps
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Some(Duration::from_secs(300)),
            max_cache_size: 10_000,
            compression_threshold: 1024,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create config with a specific default expiration
    pub fn with_expiration(ttl: Duration) -> Self {
        Self {
            default_expiration: Some(ttl),
            ..Default::default()
        }
    }

    /// Set the compression threshold
    pub fn compression_threshold(mut self, bytes: usize) -> Self {
        self.compression_threshold = bytes;
        self
    }

    /// Disable the default expiration (entries live until removed)
    pub fn no_expiration(mut self) -> Self {
        self.default_expiration = None;
        self
    }
}
