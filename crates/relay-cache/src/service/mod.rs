//! The cache service: typed operations over one backend strategy

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use relay_cache_core::{
    CacheBackend, CacheConfig, CacheError, CacheMetrics, Compressor, EntryOptions, Envelope,
    JsonSerializer, MetricsCollector, Result, Serializer, ZstdCompressor,
};

mod populate;
use populate::PopulationLocks;

mod tag_index;
pub use tag_index::TagIndex;

mod warmup;
pub use warmup::{WarmupOutcome, WarmupReport, WarmupStrategy};

/// Backend-agnostic cache service
///
/// The public face of the caching subsystem: serializes typed values
/// into [`Envelope`]s, applies the compression policy, maintains the
/// tag index, runs the cache-aside pattern with per-key population
/// locking, and records every operation in its own metrics collector.
///
/// Generic over:
/// - `B`: the backend strategy (memory, Redis, or anything implementing
///   [`CacheBackend`])
/// - `S`: the serializer (JSON by default)
///
/// Cloning is cheap and yields a handle to the SAME service: backend,
/// tag index, metrics, and configuration are all shared. Every public
/// operation is safe to call concurrently.
pub struct CacheService<B, S = JsonSerializer>
where
    B: CacheBackend,
    S: Serializer,
{
    backend: Arc<B>,
    serializer: Arc<S>,
    compressor: ZstdCompressor,
    config: Arc<RwLock<CacheConfig>>,
    tags: Arc<TagIndex>,
    metrics: Arc<MetricsCollector>,
    locks: PopulationLocks,
}

impl<B: CacheBackend> CacheService<B> {
    /// Create a service with default configuration and JSON serialization
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, CacheConfig::default())
    }

    /// Create a service with a specific configuration
    pub fn with_config(backend: B, config: CacheConfig) -> Self {
        Self::with_serializer(backend, JsonSerializer, config)
    }
}

impl<B, S> CacheService<B, S>
where
    B: CacheBackend,
    S: Serializer,
{
    /// Create a service with a custom serializer
    pub fn with_serializer(backend: B, serializer: S, config: CacheConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            serializer: Arc::new(serializer),
            compressor: ZstdCompressor::default(),
            config: Arc::new(RwLock::new(config)),
            tags: Arc::new(TagIndex::new()),
            metrics: Arc::new(MetricsCollector::new()),
            locks: PopulationLocks::new(),
        }
    }

    /// Get a typed value
    ///
    /// Absent keys record a miss. A corrupted envelope, payload, or
    /// value also records a miss and returns `None`; corruption never
    /// propagates to the caller. Backend connectivity failures do.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.fetch(key).await?;

        match &result {
            Some(_) => self.metrics.record_hit(),
            None => self.metrics.record_miss(),
        }

        self.metrics.record_operation_time(start.elapsed());
        Ok(result)
    }

    /// Backend lookup and envelope decode without touching the hit/miss
    /// counters; internal re-checks use this so one logical lookup never
    /// records twice
    async fn fetch<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(self.open_envelope(key, &bytes)),
            None => Ok(None),
        }
    }

    /// Store a typed value
    ///
    /// An empty key is a silent no-op that touches neither the backend
    /// nor the metrics. The value is serialized, compressed when the
    /// payload exceeds the configured threshold (or compression was
    /// forced), wrapped in an [`Envelope`], and written with
    /// `options.expiration` falling back to the configured default. The
    /// tag index is updated only after the backend write lands.
    pub async fn set<T>(
        &self,
        key: &str,
        value: &T,
        options: impl Into<EntryOptions>,
    ) -> Result<()>
    where
        T: Serialize,
    {
        if key.is_empty() {
            return Ok(());
        }
        let options = options.into();
        let start = Instant::now();

        let serialized = self.serializer.serialize(value)?;
        let (threshold, default_expiration) = {
            let config = self.config.read();
            (config.compression_threshold, config.default_expiration)
        };

        let compress = options.force_compression || serialized.len() > threshold;
        let payload = if compress {
            self.compressor.compress(&serialized)?
        } else {
            serialized
        };

        let envelope = Envelope::new(payload, compress, options.tags.clone(), options.priority);
        let bytes = envelope.to_bytes()?;
        let ttl = options.expiration.or(default_expiration);

        self.backend.set(key, bytes, ttl).await?;
        self.tags.record(key, &options.tags);
        self.metrics.record_set();
        self.metrics.record_operation_time(start.elapsed());
        Ok(())
    }

    /// Cache-aside: get a value, or build and store it on a miss
    ///
    /// On a hit the factory never runs. On a miss, concurrent callers
    /// racing on the same cold key are serialized through a per-key
    /// lock so the factory runs at most once; callers on different
    /// keys proceed fully in parallel.
    pub async fn get_or_create<T, F, Fut>(
        &self,
        key: &str,
        options: impl Into<EntryOptions>,
        factory: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        // An empty key cannot be cached; just produce the value
        if key.is_empty() {
            return factory().await;
        }

        let lock = self.locks.lock_for(key);
        let guard = lock.lock().await;
        let result = async {
            // Re-check: another caller may have populated while we waited.
            // The outer lookup already recorded this caller's miss.
            if let Some(value) = self.fetch(key).await? {
                return Ok(value);
            }
            let value = factory().await?;
            self.set(key, &value, options).await?;
            Ok(value)
        }
        .await;
        drop(guard);
        self.locks.release(key);
        drop(lock);
        result
    }

    /// Check for a key without touching hit/miss counters
    ///
    /// An empty key is `false` for every backend.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        let start = Instant::now();
        let found = self.backend.exists(key).await?;
        self.metrics.record_operation_time(start.elapsed());
        Ok(found)
    }

    /// Remove a single key, purging it from every tag bucket
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let start = Instant::now();
        let removed = self.backend.remove(key).await?;
        self.tags.forget(key);
        if removed {
            self.metrics.record_eviction();
        }
        self.metrics.record_operation_time(start.elapsed());
        Ok(removed)
    }

    /// Remove every key currently carrying a tag
    ///
    /// Returns the number of entries actually deleted from the backend.
    /// Each key leaves the index only after its backend removal
    /// succeeds, so a backend error mid-run leaves the surviving keys
    /// indexed and a retry still reaches them.
    pub async fn remove_by_tag(&self, tag: &str) -> Result<u64> {
        let start = Instant::now();
        let keys = self.tags.keys_with(tag);

        let mut count = 0u64;
        for key in &keys {
            if self.backend.remove(key).await? {
                self.metrics.record_eviction();
                count += 1;
            }
            self.tags.forget(key);
        }

        self.metrics.record_operation_time(start.elapsed());
        Ok(count)
    }

    /// Remove every key matching a glob pattern
    ///
    /// Backends without key enumeration report a capability gap; that
    /// is logged and surfaces as zero removals, never as a silent
    /// success and never as a caller-facing error.
    pub async fn remove_by_pattern(&self, pattern: &str) -> Result<u64> {
        let start = Instant::now();
        let result = match self.backend.remove_by_pattern(pattern).await {
            Ok(keys) => {
                for key in &keys {
                    self.tags.forget(key);
                }
                self.metrics.record_evictions(keys.len() as u64);
                Ok(keys.len() as u64)
            }
            Err(err @ CacheError::Unsupported { .. }) => {
                warn!(
                    backend = self.backend.name(),
                    pattern,
                    %err,
                    "pattern removal unavailable, no entries were invalidated"
                );
                Ok(0)
            }
            Err(err) => Err(err),
        };
        self.metrics.record_operation_time(start.elapsed());
        result
    }

    /// Remove all entries and empty the tag index
    ///
    /// When the backend cannot clear atomically the gap is logged and
    /// the tag index is left intact, since the entries it points at
    /// still exist.
    pub async fn clear(&self) -> Result<()> {
        let start = Instant::now();
        let result = match self.backend.clear().await {
            Ok(()) => {
                self.tags.clear();
                self.metrics.update_item_count(0);
                Ok(())
            }
            Err(err @ CacheError::Unsupported { .. }) => {
                warn!(
                    backend = self.backend.name(),
                    %err,
                    "clear unavailable, cache was not emptied"
                );
                Ok(())
            }
            Err(err) => Err(err),
        };
        self.metrics.record_operation_time(start.elapsed());
        result
    }

    /// Snapshot of this service's metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.snapshot()
    }

    /// Zero all metrics counters and gauges
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Current configuration (a copy)
    pub fn config(&self) -> CacheConfig {
        self.config.read().clone()
    }

    /// Replace the configuration wholesale
    ///
    /// Takes effect for subsequent operations; operations already in
    /// flight may use either generation.
    pub fn set_config(&self, config: CacheConfig) {
        *self.config.write() = config;
    }

    /// Pull the backend's entry count into the item-count gauge
    pub async fn refresh_gauges(&self) -> Result<()> {
        let len = self.backend.len().await?;
        self.metrics.update_item_count(len as i64);
        Ok(())
    }

    /// Unwrap an envelope into a typed value, downgrading corruption to `None`
    fn open_envelope<T>(&self, key: &str, bytes: &[u8]) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let envelope = match Envelope::from_bytes(bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(key, %err, "corrupted cache envelope, treating as miss");
                return None;
            }
        };

        let payload = if envelope.is_compressed {
            match self.compressor.decompress(&envelope.payload) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(key, %err, "undecompressable cache payload, treating as miss");
                    return None;
                }
            }
        } else {
            envelope.payload
        };

        match self.serializer.deserialize(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, %err, "undeserializable cached value, treating as miss");
                None
            }
        }
    }
}

impl<B, S> Clone for CacheService<B, S>
where
    B: CacheBackend,
    S: Serializer,
{
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            serializer: self.serializer.clone(),
            compressor: self.compressor.clone(),
            config: self.config.clone(),
            tags: self.tags.clone(),
            metrics: self.metrics.clone(),
            locks: self.locks.clone(),
        }
    }
}
