//! Per-key in-flight population locks
//!
//! `get_or_create` must run its factory at most once when many callers
//! race on the same cold key. Each cold key gets a keyed async mutex;
//! the winner populates, losers re-check the cache after acquiring the
//! lock and find the fresh value. Different keys never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry of per-key population locks
#[derive(Clone, Default)]
pub(crate) struct PopulationLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl PopulationLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a key
    pub(crate) fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the registry entry once the caller, still holding its own
    /// `Arc`, is the last user. A racer that cloned the lock in the
    /// meantime keeps the entry alive and releases it later itself.
    ///
    /// Callers must invoke this while their `Arc` from `lock_for` is
    /// still live; the count check assumes one reference in the map
    /// plus the caller's.
    pub(crate) fn release(&self, key: &str) {
        self.inner
            .remove_if(key, |_, stored| Arc::strong_count(stored) <= 2);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}
