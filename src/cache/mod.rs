pub mod aside;
pub mod file;
pub mod memory;
pub mod sqlite;
pub mod trait_def;

pub use aside::{CacheAside, CacheLookup};
pub use file::FileCache;
pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use trait_def::{CacheError, CacheResult, CacheStore};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{CacheBackend, CacheConfig};

/// Open and initialize the configured cache backend
pub async fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => {
            info!("Using in-memory cache (max {} entries)", config.max_entries);
            Arc::new(MemoryCache::new(config.max_entries))
        }
        CacheBackend::File => {
            info!("Using file cache: {}", config.dir);
            Arc::new(FileCache::new(&config.dir))
        }
        CacheBackend::Sqlite => {
            info!("Using SQLite cache: {}", config.database_url);
            Arc::new(SqliteCache::new(&config.database_url, config.max_connections).await?)
        }
    };

    store.init().await?;
    Ok(store)
}
