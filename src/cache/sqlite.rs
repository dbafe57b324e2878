use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use super::{CacheResult, CacheStore};

/// Cache entries in a SQLite table
pub struct SqliteCache {
    pool: Arc<SqlitePool>,
}

impl SqliteCache {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open SQLite cache at {database_url}"))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Delete expired rows, returning how many were removed
    pub async fn purge_expired(&self) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.as_ref())
            .await
            .context("failed to purge expired cache entries")?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn init(&self) -> CacheResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await
        .context("failed to create cache_entries table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cache_expires_at ON cache_entries(expires_at)")
            .execute(self.pool.as_ref())
            .await
            .context("failed to create cache_entries index")?;

        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(Utc::now().timestamp_millis())
                .fetch_optional(self.pool.as_ref())
                .await
                .context("failed to read cache entry")?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_ms);

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await
        .context("failed to write cache entry")?;

        Ok(())
    }
}
