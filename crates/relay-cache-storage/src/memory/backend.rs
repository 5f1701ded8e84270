//! In-memory cache backend using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use relay_cache_core::{CacheBackend, Result};

use super::pattern::glob_match;

/// Configuration for the memory backend
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of entries (0 = unlimited)
    pub max_capacity: usize,
    /// Interval for the expiry sweeper task
    pub cleanup_interval: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl MemoryConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_capacity: capacity,
            ..Default::default()
        }
    }

    /// Create config with unlimited capacity
    pub fn unlimited() -> Self {
        Self {
            max_capacity: 0,
            ..Default::default()
        }
    }
}

/// One stored payload with its absolute expiry
#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process cache backend
///
/// Opaque byte store over `DashMap` with lazy TTL expiry on access plus
/// an explicit sweep. Empty keys and empty values are tolerated as
/// silent no-ops on write and "not found" on read; this backend never
/// rejects a key. Cloning creates a new handle to the SAME underlying
/// store.
#[derive(Clone)]
pub struct MemoryBackend {
    data: Arc<DashMap<String, StoredValue>>,
    config: MemoryConfig,
}

impl MemoryBackend {
    /// Create a new memory backend
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: Arc::new(DashMap::with_capacity(config.max_capacity.min(10_000))),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Evict arbitrary entries if at capacity
    ///
    /// Capacity is a soft target: eviction makes room for exactly one
    /// incoming entry and does not consult priorities.
    fn maybe_evict(&self) {
        if self.config.max_capacity == 0 || self.data.len() < self.config.max_capacity {
            return;
        }

        let excess = self.data.len().saturating_sub(self.config.max_capacity - 1);
        let victims: Vec<String> = self
            .data
            .iter()
            .take(excess)
            .map(|entry| entry.key().clone())
            .collect();

        for key in victims {
            self.data.remove(&key);
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let expired: Vec<String> = self
            .data
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for key in expired {
            if self
                .data
                .remove_if(&key, |_, value| value.is_expired())
                .is_some()
            {
                count += 1;
            }
        }

        if count > 0 {
            debug!(count, "swept expired cache entries");
        }
        count
    }

    /// Spawn a background task sweeping expired entries on
    /// `cleanup_interval`; aborts when the handle is dropped by the caller
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let backend = self.clone();
        let period = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                backend.sweep_expired();
            }
        })
    }

    /// Approximate memory usage of live entries in bytes
    pub fn approx_memory_bytes(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.value().bytes.len() + entry.key().len())
            .sum()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Ok(None);
        }
        match self.data.get(key) {
            Some(entry) if entry.is_expired() => {
                drop(entry);
                self.data.remove_if(key, |_, value| value.is_expired());
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.bytes.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        // Historical contract: writing nothing is safe, so an empty key
        // or empty payload is a silent no-op rather than an error.
        if key.is_empty() || value.is_empty() {
            return Ok(());
        }

        self.maybe_evict();

        let stored = StoredValue {
            bytes: value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.data.insert(key.to_string(), stored);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.data.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        match self.data.get(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn remove_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let matching: Vec<String> = self
            .data
            .iter()
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = Vec::with_capacity(matching.len());
        for key in matching {
            if self.data.remove(&key).is_some() {
                removed.push(key);
            }
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.data.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.data.iter().filter(|entry| !entry.is_expired()).count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
