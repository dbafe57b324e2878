use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

use super::{CacheResult, CacheStore};
use crate::key::is_key_safe;

/// On-disk entry
#[derive(Serialize, Deserialize)]
struct Envelope {
    /// Unix milliseconds
    expires_at: i64,
    value: String,
}

/// One JSON file per key inside a directory
pub struct FileCache {
    dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    fn path_for(&self, key: &str) -> CacheResult<PathBuf> {
        if !is_key_safe(key) {
            return Err(anyhow!("refusing unsafe cache key '{}'", key.escape_debug()).into());
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn init(&self) -> CacheResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.path_for(key)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to read cache file {}", path.display()))
                    .into())
            }
        };

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                return Ok(None);
            }
        };
        // Stale and corrupt files stay put; the next `set` renames over them
        if envelope.expires_at <= Utc::now().timestamp_millis() {
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let path = self.path_for(key)?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let envelope = Envelope {
            expires_at: Utc::now().timestamp_millis().saturating_add(ttl_ms),
            value,
        };
        let encoded = serde_json::to_vec(&envelope)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;

        // Write-then-rename so readers never see a partial file
        let tmp = self.dir.join(format!(
            "{key}.{}-{}.tmp",
            std::process::id(),
            self.write_seq.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, encoded)
            .await
            .with_context(|| format!("failed to write cache file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to move cache file into {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested"));
        cache.init().await.unwrap();

        assert_eq!(cache.get("42_abc").await.unwrap(), None);
        cache
            .set("42_abc", "{\"data\":[]}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("42_abc").await.unwrap().as_deref(),
            Some("{\"data\":[]}")
        );
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache
            .set("42_old", "v".to_string(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("42_old").await.unwrap(), None);

        cache
            .set("42_old", "fresh".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("42_old").await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_stale_read_leaves_file_for_writer() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FileCache::new(dir.path());
        let writer = FileCache::new(dir.path());
        reader
            .set("42_race", "old".to_string(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(reader.get("42_race").await.unwrap(), None);
        assert!(dir.path().join("42_race.json").exists());

        writer
            .set("42_race", "new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(reader.get("42_race").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());

        assert!(matches!(
            cache.get("../escape").await,
            Err(CacheError::Backend(_))
        ));
        assert!(cache
            .set("a/b", "v".to_string(), Duration::from_secs(1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("42_bad.json");
        std::fs::write(&path, b"not json").unwrap();
        let cache = FileCache::new(dir.path());

        assert_eq!(cache.get("42_bad").await.unwrap(), None);
        assert!(path.exists());

        cache
            .set("42_bad", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("42_bad").await.unwrap().as_deref(), Some("v"));
    }
}
