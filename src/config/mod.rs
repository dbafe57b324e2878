use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::transport::DEFAULT_API_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub metrika: MetrikaConfig,
    pub cache: CacheConfig,
    pub api_server: ServerConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MetrikaConfig {
    pub counter_id: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub api_url: String,
    #[serde(default = "MetrikaConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for MetrikaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetrikaConfig")
            .field("counter_id", &self.counter_id)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MetrikaConfig {
    const fn default_timeout_secs() -> u64 {
        30
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// How long a fetched report stays fresh
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    /// Directory for the file backend
    pub dir: String,
    /// Database URL for the SQLite backend
    pub database_url: String,
    pub max_connections: u32,
    /// Capacity of the memory backend
    pub max_entries: u64,
}

impl CacheConfig {
    const fn default_ttl_secs() -> u64 {
        3600
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            ttl_secs: Self::default_ttl_secs(),
            dir: default_cache_dir(),
            database_url: "sqlite://./metrika-cache.db?mode=rwc".to_string(),
            max_connections: 5,
            max_entries: 10_000,
        }
    }
}

fn default_cache_dir() -> String {
    std::env::temp_dir()
        .join("metrika-cache")
        .to_string_lossy()
        .into_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let counter_id =
            std::env::var("METRIKA_COUNTER_ID").context("METRIKA_COUNTER_ID must be set")?;
        let token = std::env::var("METRIKA_TOKEN").context("METRIKA_TOKEN must be set")?;
        let api_url =
            std::env::var("METRIKA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let timeout_secs = std::env::var("METRIKA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(MetrikaConfig::default_timeout_secs);

        let defaults = CacheConfig::default();

        let backend = match std::env::var("CACHE_BACKEND")
            .unwrap_or_else(|_| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => CacheBackend::Memory,
            "file" => CacheBackend::File,
            "sqlite" => CacheBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown CACHE_BACKEND '{other}', falling back to 'file'. Supported values: memory, file, sqlite"
                );
                CacheBackend::File
            }
        };

        let ttl_secs = match std::env::var("METRIKA_CACHE_TTL_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .with_context(|| format!("METRIKA_CACHE_TTL_SECS must be a number, got '{v}'"))?,
            Err(_) => defaults.ttl_secs,
        };

        let dir = std::env::var("CACHE_DIR").unwrap_or(defaults.dir);
        let database_url = std::env::var("CACHE_DATABASE_URL").unwrap_or(defaults.database_url);
        let max_connections = std::env::var("CACHE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_connections);
        let max_entries = std::env::var("CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.max_entries);

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        Ok(Config {
            metrika: MetrikaConfig {
                counter_id,
                token,
                api_url,
                timeout_secs,
            },
            cache: CacheConfig {
                backend,
                ttl_secs,
                dir,
                database_url,
                max_connections,
                max_entries,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
        })
    }
}
