use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use super::CacheStore;
use crate::key::CacheKey;
use crate::models::RawResult;
use crate::transport::FetchError;

/// Outcome of a cache-aside lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    /// `None` when the fetch failed or came back empty
    pub raw: Option<RawResult>,
    pub cache_hit: bool,
}

/// Read-through wrapper around a [`CacheStore`].
///
/// Only non-empty, successful fetches are written back, so a failure is
/// retried on the next call instead of being cached.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, ttl: Duration, fetch: F) -> CacheLookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawResult, FetchError>>,
    {
        // A failing store stays read-only for the rest of this call
        let writable = match self.store.get(key.as_str()).await {
            Ok(Some(encoded)) => match serde_json::from_str::<RawResult>(&encoded) {
                Ok(raw) => {
                    debug!("Metrika cache hit for {}", key);
                    return CacheLookup {
                        raw: Some(raw),
                        cache_hit: true,
                    };
                }
                Err(e) => {
                    error!("Metrika cache entry {} could not be decoded: {}", key, e);
                    true
                }
            },
            Ok(None) => {
                debug!("Metrika cache miss for {}", key);
                true
            }
            Err(e) => {
                error!("Metrika cache lookup failed for {}: {}", key, e);
                false
            }
        };

        let raw = match fetch().await {
            Ok(raw) if !raw.is_empty() => raw,
            Ok(_) => {
                debug!("Metrika returned no rows for {}, not caching", key);
                return CacheLookup {
                    raw: None,
                    cache_hit: false,
                };
            }
            Err(e) => {
                error!("Yandex Metrika: {}", e);
                return CacheLookup {
                    raw: None,
                    cache_hit: false,
                };
            }
        };

        if writable {
            match serde_json::to_string(&raw) {
                Ok(encoded) => {
                    if let Err(e) = self.store.set(key.as_str(), encoded, ttl).await {
                        error!("Failed to cache Metrika response {}: {}", key, e);
                    }
                }
                Err(e) => error!("Failed to encode Metrika response {}: {}", key, e),
            }
        }

        CacheLookup {
            raw: Some(raw),
            cache_hit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CacheResult, MemoryCache};
    use crate::key::{derive_key, Discriminator};
    use crate::models::{DimensionValue, QueryParameters, ResultRow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store that counts calls and can be switched to fail
    struct CountingStore {
        inner: MemoryCache,
        gets: AtomicUsize,
        sets: AtomicUsize,
        fail_reads: bool,
    }

    impl CountingStore {
        fn new(fail_reads: bool) -> Self {
            Self {
                inner: MemoryCache::new(100),
                gets: AtomicUsize::new(0),
                sets: AtomicUsize::new(0),
                fail_reads,
            }
        }
    }

    #[async_trait]
    impl CacheStore for CountingStore {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads {
                return Err(CacheError::Backend(anyhow::anyhow!("store offline")));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value, ttl).await
        }
    }

    fn key() -> CacheKey {
        derive_key(
            "42",
            &Discriminator::Raw,
            None,
            QueryParameters::new().with("metrics", "ym:s:visits").as_map(),
        )
    }

    fn sample() -> RawResult {
        RawResult {
            data: vec![ResultRow {
                dimensions: vec![DimensionValue::named("2024-06-15")],
                metrics: vec![3.0],
            }],
            ..Default::default()
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_miss_fetches_once_then_hits() {
        let store = Arc::new(CountingStore::new(false));
        let cache = CacheAside::new(store.clone());
        let fetches = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch(&key(), TTL, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(sample())
            })
            .await;
        assert!(!first.cache_hit);
        assert_eq!(first.raw, Some(sample()));

        let second = cache
            .get_or_fetch(&key(), TTL, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(sample())
            })
            .await;
        assert!(second.cache_hit);
        assert_eq!(second.raw, Some(sample()));

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let store = Arc::new(CountingStore::new(false));
        let cache = CacheAside::new(store.clone());

        let failed = cache
            .get_or_fetch(&key(), TTL, || async {
                Err(FetchError::Transport("connection refused".to_string()))
            })
            .await;
        assert_eq!(failed.raw, None);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);

        let retried = cache.get_or_fetch(&key(), TTL, || async { Ok(sample()) }).await;
        assert!(!retried.cache_hit);
        assert_eq!(retried.raw, Some(sample()));
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_cached() {
        let store = Arc::new(CountingStore::new(false));
        let cache = CacheAside::new(store.clone());

        let lookup = cache
            .get_or_fetch(&key(), TTL, || async { Ok(RawResult::default()) })
            .await;
        assert_eq!(lookup.raw, None);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_fetch_without_write() {
        let store = Arc::new(CountingStore::new(true));
        let cache = CacheAside::new(store.clone());

        for _ in 0..2 {
            let lookup = cache.get_or_fetch(&key(), TTL, || async { Ok(sample()) }).await;
            assert_eq!(lookup.raw, Some(sample()));
            assert!(!lookup.cache_hit);
        }

        assert_eq!(store.gets.load(Ordering::SeqCst), 2);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_refetched_and_replaced() {
        let store = Arc::new(CountingStore::new(false));
        store
            .inner
            .set(key().as_str(), "{not json".to_string(), TTL)
            .await
            .unwrap();
        let cache = CacheAside::new(store.clone());

        let lookup = cache.get_or_fetch(&key(), TTL, || async { Ok(sample()) }).await;
        assert!(!lookup.cache_hit);
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);

        let again = cache
            .get_or_fetch(&key(), TTL, || async {
                Err(FetchError::Transport("should not be called".to_string()))
            })
            .await;
        assert!(again.cache_hit);
    }
}
