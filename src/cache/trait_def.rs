use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0:#}")]
    Backend(#[from] anyhow::Error),
    #[error("cache entry is corrupt: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value store with per-entry TTL. Expiry is the backend's job; an
/// expired entry must read as a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Prepare the backend (create tables, directories, etc.)
    async fn init(&self) -> CacheResult<()> {
        Ok(())
    }

    /// Fetch a live entry
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Insert or replace an entry that expires after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;
}
