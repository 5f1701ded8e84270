//! Per-service metrics collection

use parking_lot::RwLock;
use std::time::Duration;

/// Point-in-time snapshot of cache metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheMetrics {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of set operations
    pub sets: u64,
    /// Number of evictions (explicit removals and invalidations)
    pub evictions: u64,
    /// Current number of entries (gauge)
    pub item_count: u64,
    /// Approximate memory usage in bytes (gauge)
    pub memory_bytes: u64,
    /// Average operation time in microseconds over valid samples
    pub avg_operation_micros: f64,
    /// Number of valid duration samples behind the average
    pub operation_samples: u64,
}

impl CacheMetrics {
    /// Hit ratio in `[0.0, 1.0]`; defined as 0 when no lookups happened
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total lookups (hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
    item_count: u64,
    memory_bytes: u64,
    op_time_total_micros: u128,
    op_time_samples: u64,
}

/// Concurrency-safe counter bag owned by one cache service
///
/// Every mutation takes the write lock, so concurrent recorders never
/// lose updates and `reset` is atomic with respect to `snapshot`
/// readers. Not a process-wide singleton: each service instance owns
/// its own collector so independently configured caches can coexist.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    inner: RwLock<MetricsInner>,
}

impl MetricsCollector {
    /// Create a zeroed collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.inner.write().hits += 1;
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.inner.write().misses += 1;
    }

    /// Record a set operation
    pub fn record_set(&self) {
        self.inner.write().sets += 1;
    }

    /// Record a single eviction
    pub fn record_eviction(&self) {
        self.inner.write().evictions += 1;
    }

    /// Record several evictions at once (bulk invalidation)
    pub fn record_evictions(&self, count: u64) {
        self.inner.write().evictions += count;
    }

    /// Update the item-count gauge; negative inputs clamp to zero
    pub fn update_item_count(&self, count: i64) {
        self.inner.write().item_count = count.max(0) as u64;
    }

    /// Update the memory-usage gauge; negative inputs clamp to zero
    pub fn update_memory_bytes(&self, bytes: i64) {
        self.inner.write().memory_bytes = bytes.max(0) as u64;
    }

    /// Record an operation duration sample
    pub fn record_operation_time(&self, elapsed: Duration) {
        self.record_operation_micros(elapsed.as_micros() as i64);
    }

    /// Record an operation duration in microseconds
    ///
    /// Negative samples are invalid measurements and are discarded;
    /// zero is a legitimate (very fast) sample and counts.
    pub fn record_operation_micros(&self, micros: i64) {
        if micros < 0 {
            return;
        }
        let mut inner = self.inner.write();
        inner.op_time_total_micros += micros as u128;
        inner.op_time_samples += 1;
    }

    /// Take a consistent snapshot of all counters and gauges
    pub fn snapshot(&self) -> CacheMetrics {
        let inner = self.inner.read();
        let avg = if inner.op_time_samples == 0 {
            0.0
        } else {
            inner.op_time_total_micros as f64 / inner.op_time_samples as f64
        };
        CacheMetrics {
            hits: inner.hits,
            misses: inner.misses,
            sets: inner.sets,
            evictions: inner.evictions,
            item_count: inner.item_count,
            memory_bytes: inner.memory_bytes,
            avg_operation_micros: avg,
            operation_samples: inner.op_time_samples,
        }
    }

    /// Zero every counter and gauge
    ///
    /// Readers racing with a reset observe either the old values or the
    /// fully zeroed state, never a half-reset mixture.
    pub fn reset(&self) {
        *self.inner.write() = MetricsInner::default();
    }
}
