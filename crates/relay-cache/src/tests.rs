//! Integration tests for CacheService

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{Envelope, WarmupOutcome};
    use async_trait::async_trait;
    use relay_cache_core::CacheBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct TestData {
        id: u64,
        name: String,
        value: i32,
    }

    fn sample() -> TestData {
        TestData {
            id: 1,
            name: "test".to_string(),
            value: 42,
        }
    }

    /// Memory backend that fails the next N `remove` calls
    #[derive(Clone)]
    struct FlakyRemoveBackend {
        inner: MemoryBackend,
        remove_failures: Arc<AtomicUsize>,
    }

    impl FlakyRemoveBackend {
        fn failing(times: usize) -> Self {
            Self {
                inner: MemoryBackend::with_defaults(),
                remove_failures: Arc::new(AtomicUsize::new(times)),
            }
        }
    }

    #[async_trait]
    impl CacheBackend for FlakyRemoveBackend {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn remove(&self, key: &str) -> Result<bool> {
            if self.remove_failures.load(Ordering::SeqCst) > 0 {
                self.remove_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(CacheError::Connection("connection reset".to_string()));
            }
            self.inner.remove(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn remove_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
            self.inner.remove_by_pattern(pattern).await
        }

        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }

        async fn len(&self) -> Result<usize> {
            self.inner.len().await
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_basic_get_set() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        let data = sample();

        cache.set("test_key", &data, EntryOpts::new()).await.unwrap();

        let got: Option<TestData> = cache.get("test_key").await.unwrap();
        assert_eq!(got, Some(data));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        let got: Option<TestData> = cache.get("nonexistent").await.unwrap();
        assert!(got.is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[tokio::test]
    async fn test_empty_key_set_is_idempotent_noop() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::new(backend.clone());

        cache.set("", &sample(), EntryOpts::new()).await.unwrap();

        assert_eq!(backend.len().await.unwrap(), 0);
        assert_eq!(cache.metrics().sets, 0);
    }

    #[tokio::test]
    async fn test_exists() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        assert!(!cache.exists("key").await.unwrap());
        cache.set("key", &1i32, EntryOpts::new()).await.unwrap();
        assert!(cache.exists("key").await.unwrap());
        assert!(!cache.exists("").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_records_eviction() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache.set("key", &1i32, EntryOpts::new()).await.unwrap();
        assert!(cache.remove("key").await.unwrap());
        assert!(!cache.exists("key").await.unwrap());
        assert_eq!(cache.metrics().evictions, 1);

        // Removing again deletes nothing and records nothing
        assert!(!cache.remove("key").await.unwrap());
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[tokio::test]
    async fn test_get_or_create_invokes_factory_once() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let value: TestData = cache
            .get_or_create("cold", EntryOpts::new(), move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(sample())
            })
            .await
            .unwrap();
        assert_eq!(value, sample());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Hit path: factory must never run when data is already cached
        let calls_clone = calls.clone();
        let again: TestData = cache
            .get_or_create("cold", EntryOpts::new(), move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(sample())
            })
            .await
            .unwrap();
        assert_eq!(again, sample());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Plain get also sees the value without re-invoking anything
        let got: Option<TestData> = cache.get("cold").await.unwrap();
        assert_eq!(got, Some(sample()));
    }

    #[tokio::test]
    async fn test_get_or_create_concurrent_cold_key_runs_factory_once() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create("hot", EntryOpts::new(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(7i32)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_create_cold_lookup_records_one_miss() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        let value: i32 = cache
            .get_or_create("cold", EntryOpts::new(), || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);

        // One logical lookup, one miss; the locked re-check is silent
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 0);
    }

    #[tokio::test]
    async fn test_get_or_create_empty_key_runs_factory_but_caches_nothing() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::new(backend.clone());

        let value: i32 = cache
            .get_or_create("", EntryOpts::new(), || async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(backend.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tag_invalidation_completeness() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache
            .set("user:1", &1i32, EntryOpts::new().tag("users"))
            .await
            .unwrap();
        cache
            .set("user:2", &2i32, EntryOpts::new().tag("users"))
            .await
            .unwrap();
        cache
            .set("order:1", &3i32, EntryOpts::new().tag("orders"))
            .await
            .unwrap();

        let removed = cache.remove_by_tag("users").await.unwrap();
        assert_eq!(removed, 2);

        assert_eq!(cache.get::<i32>("user:1").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("user:2").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("order:1").await.unwrap(), Some(3));
        assert_eq!(cache.metrics().evictions, 2);

        // The bucket is gone; a second invalidation removes nothing
        assert_eq!(cache.remove_by_tag("users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tag_invalidation_survives_transient_backend_error() {
        let cache = CacheService::new(FlakyRemoveBackend::failing(1));

        cache
            .set("user:1", &1i32, EntryOpts::new().tag("users"))
            .await
            .unwrap();
        cache
            .set("user:2", &2i32, EntryOpts::new().tag("users"))
            .await
            .unwrap();

        // The first attempt dies on the transient failure and propagates it
        assert!(cache.remove_by_tag("users").await.is_err());

        // Keys the backend never removed must still be indexed, so the
        // retry reaches every entry
        assert_eq!(cache.remove_by_tag("users").await.unwrap(), 2);
        assert_eq!(cache.get::<i32>("user:1").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("user:2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_tag_memberships() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache
            .set("key", &1i32, EntryOpts::new().tag("old"))
            .await
            .unwrap();
        cache
            .set("key", &2i32, EntryOpts::new().tag("new"))
            .await
            .unwrap();

        // The stale membership must not invalidate the fresh envelope
        assert_eq!(cache.remove_by_tag("old").await.unwrap(), 0);
        assert_eq!(cache.get::<i32>("key").await.unwrap(), Some(2));

        assert_eq!(cache.remove_by_tag("new").await.unwrap(), 1);
        assert_eq!(cache.get::<i32>("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pattern_invalidation_scoping() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache.set("pattern:a", &1i32, EntryOpts::new()).await.unwrap();
        cache.set("pattern:b", &2i32, EntryOpts::new()).await.unwrap();
        cache.set("other:c", &3i32, EntryOpts::new()).await.unwrap();

        let removed = cache.remove_by_pattern("pattern:*").await.unwrap();
        assert_eq!(removed, 2);

        assert_eq!(cache.get::<i32>("pattern:a").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("pattern:b").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("other:c").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_hit_ratio_law() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        assert_eq!(cache.metrics().hit_ratio(), 0.0);

        cache.set("key", &1i32, EntryOpts::new()).await.unwrap();

        for _ in 0..3 {
            let _ = cache.get::<i32>("key").await.unwrap();
        }
        let _ = cache.get::<i32>("absent").await.unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 3);
        assert_eq!(metrics.misses, 1);
        assert!((metrics.hit_ratio() - 0.75).abs() < f64::EPSILON);

        cache.reset_metrics();
        let _ = cache.get::<i32>("key").await.unwrap();
        assert_eq!(cache.metrics().hit_ratio(), 1.0);
    }

    #[tokio::test]
    async fn test_compression_roundtrip() {
        let backend = MemoryBackend::with_defaults();
        let config = CacheConfig::default().compression_threshold(64);
        let cache = CacheService::with_config(backend.clone(), config);

        // Well above the threshold and repetitive enough to shrink
        let big = TestData {
            id: 99,
            name: "x".repeat(4096),
            value: -1,
        };
        cache.set("big", &big, EntryOpts::new()).await.unwrap();

        // The stored envelope really is compressed
        let raw = backend.get("big").await.unwrap().unwrap();
        let envelope = Envelope::from_bytes(&raw).unwrap();
        assert!(envelope.is_compressed);
        assert!(envelope.payload.len() < 4096);

        let got: Option<TestData> = cache.get("big").await.unwrap();
        assert_eq!(got, Some(big));
    }

    #[tokio::test]
    async fn test_forced_compression_below_threshold() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::new(backend.clone());

        cache
            .set("small", &"tiny", EntryOpts::new().compress())
            .await
            .unwrap();

        let raw = backend.get("small").await.unwrap().unwrap();
        let envelope = Envelope::from_bytes(&raw).unwrap();
        assert!(envelope.is_compressed);

        let got: Option<String> = cache.get("small").await.unwrap();
        assert_eq!(got.as_deref(), Some("tiny"));
    }

    #[tokio::test]
    async fn test_corruption_downgrades_to_miss() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::new(backend.clone());

        // Plant malformed bytes directly beneath the service
        backend
            .set("bad", b"\x00\x01 not an envelope".to_vec(), None)
            .await
            .unwrap();

        let got: Option<TestData> = cache.get("bad").await.unwrap();
        assert!(got.is_none());
        assert_eq!(cache.metrics().misses, 1);
        assert_eq!(cache.metrics().hits, 0);
    }

    #[tokio::test]
    async fn test_corrupt_compressed_payload_downgrades_to_miss() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::new(backend.clone());

        // Valid envelope, but the payload claims compression it doesn't have
        let envelope = Envelope::new(b"not a zstd frame".to_vec(), true, Vec::new(), Priority::Normal);
        backend
            .set("bad", envelope.to_bytes().unwrap(), None)
            .await
            .unwrap();

        let got: Option<String> = cache.get("bad").await.unwrap();
        assert!(got.is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_cache_and_tag_index() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::new(backend.clone());

        cache
            .set("key1", &1i32, EntryOpts::new().tag("t"))
            .await
            .unwrap();
        cache.set("key2", &2i32, EntryOpts::new()).await.unwrap();

        cache.clear().await.unwrap();
        assert_eq!(backend.len().await.unwrap(), 0);
        assert_eq!(cache.remove_by_tag("t").await.unwrap(), 0);
        assert_eq!(cache.metrics().item_count, 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry_through_service() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache
            .set("short", &1i32, EntryOpts::new().expires(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(cache.get::<i32>("short").await.unwrap(), Some(1));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get::<i32>("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_config_replacement_applies_to_subsequent_ops() {
        let backend = MemoryBackend::with_defaults();
        let cache = CacheService::with_config(
            backend.clone(),
            CacheConfig::default().compression_threshold(1 << 20),
        );

        let value = "y".repeat(2048);
        cache.set("before", &value, EntryOpts::new()).await.unwrap();
        let raw = backend.get("before").await.unwrap().unwrap();
        assert!(!Envelope::from_bytes(&raw).unwrap().is_compressed);

        cache.set_config(CacheConfig::default().compression_threshold(64));

        cache.set("after", &value, EntryOpts::new()).await.unwrap();
        let raw = backend.get("after").await.unwrap().unwrap();
        assert!(Envelope::from_bytes(&raw).unwrap().is_compressed);
    }

    #[tokio::test]
    async fn test_exists_and_clear_record_latency() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache.exists("key").await.unwrap();
        assert_eq!(cache.metrics().operation_samples, 1);

        cache.clear().await.unwrap();
        assert_eq!(cache.metrics().operation_samples, 2);
    }

    #[tokio::test]
    async fn test_refresh_gauges() {
        let cache = CacheService::new(MemoryBackend::with_defaults());

        cache.set("key1", &1i32, EntryOpts::new()).await.unwrap();
        cache.set("key2", &2i32, EntryOpts::new()).await.unwrap();

        cache.refresh_gauges().await.unwrap();
        assert_eq!(cache.metrics().item_count, 2);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let cache1 = CacheService::new(MemoryBackend::with_defaults());
        cache1.set("key", &42i32, EntryOpts::new()).await.unwrap();

        let cache2 = cache1.clone();
        assert_eq!(cache2.get::<i32>("key").await.unwrap(), Some(42));
        // Metrics are shared too: one hit recorded above
        assert_eq!(cache1.metrics().hits, 1);
    }

    // Warmup strategies used by the tests below

    struct SeedUsers;

    #[async_trait]
    impl WarmupStrategy<MemoryBackend> for SeedUsers {
        fn name(&self) -> &str {
            "seed-users"
        }

        async fn execute(
            &self,
            cache: &CacheService<MemoryBackend>,
            _cancel: &CancellationToken,
        ) -> Result<()> {
            cache.set("user:1", &sample(), EntryOpts::new().tag("users")).await
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl WarmupStrategy<MemoryBackend> for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        async fn execute(
            &self,
            _cache: &CacheService<MemoryBackend>,
            _cancel: &CancellationToken,
        ) -> Result<()> {
            Err(CacheError::Backend("warmup source unavailable".to_string()))
        }
    }

    struct SeedOrders;

    #[async_trait]
    impl WarmupStrategy<MemoryBackend> for SeedOrders {
        fn name(&self) -> &str {
            "seed-orders"
        }

        async fn execute(
            &self,
            cache: &CacheService<MemoryBackend>,
            _cancel: &CancellationToken,
        ) -> Result<()> {
            cache.set("order:1", &7i32, EntryOpts::new()).await
        }
    }

    #[tokio::test]
    async fn test_warmup_populates_through_service() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        let strategies: Vec<Box<dyn WarmupStrategy<MemoryBackend>>> =
            vec![Box::new(SeedUsers), Box::new(SeedOrders)];

        let report = cache.warmup(&strategies, &CancellationToken::new()).await;
        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 0);

        assert_eq!(cache.get::<TestData>("user:1").await.unwrap(), Some(sample()));
        assert_eq!(cache.get::<i32>("order:1").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_warmup_failure_does_not_abort_siblings() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        let strategies: Vec<Box<dyn WarmupStrategy<MemoryBackend>>> =
            vec![Box::new(SeedUsers), Box::new(AlwaysFails), Box::new(SeedOrders)];

        let report = cache.warmup(&strategies, &CancellationToken::new()).await;
        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            &report.outcomes[1],
            (name, WarmupOutcome::Failed(_)) if name.as_str() == "always-fails"
        ));

        // The strategy after the failure still ran
        assert_eq!(cache.get::<i32>("order:1").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_warmup_cancellation_skips_remaining() {
        let cache = CacheService::new(MemoryBackend::with_defaults());
        let strategies: Vec<Box<dyn WarmupStrategy<MemoryBackend>>> =
            vec![Box::new(SeedUsers), Box::new(SeedOrders)];

        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = cache.warmup(&strategies, &cancel).await;
        assert_eq!(report.completed(), 0);
        assert_eq!(report.skipped(), 2);
        assert!(!cache.exists("user:1").await.unwrap());
    }
}
