use std::path::PathBuf;

use anyhow::Context;

use crate::deleter::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub deleter: DeleterConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// JSON-lines backup file, honored by the memory backend only.
    pub file_storage_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    /// Prefix for returned short URLs, e.g. `https://sho.rt`.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct DeleterConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").ok();

        // Without an explicit backend, infer from the database URL: a
        // configured durable store wins, otherwise run on the in-memory
        // cache.
        let backend = match std::env::var("DATABASE_BACKEND") {
            Ok(value) => match value.to_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "sqlite" => StorageBackend::Sqlite,
                "postgres" | "postgresql" => StorageBackend::Postgres,
                other => {
                    tracing::warn!(
                        "Unknown DATABASE_BACKEND '{other}', falling back to 'memory'. \
                         Supported values: memory, sqlite, postgres"
                    );
                    StorageBackend::Memory
                }
            },
            Err(_) => match database_url.as_deref() {
                Some(url) if url.starts_with("postgres") => StorageBackend::Postgres,
                Some(_) => StorageBackend::Sqlite,
                None => StorageBackend::Memory,
            },
        };

        if matches!(backend, StorageBackend::Sqlite | StorageBackend::Postgres)
            && database_url.is_none()
        {
            anyhow::bail!("DATABASE_URL must be set for the {backend:?} backend");
        }

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let address =
            std::env::var("SERVER_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| format!("http://{address}"));

        let file_storage_path = std::env::var("FILE_STORAGE_PATH").ok().map(PathBuf::from);

        let workers = std::env::var("DELETE_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_WORKERS);
        let queue_capacity = std::env::var("DELETE_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        Ok(Config {
            storage: StorageConfig {
                backend,
                database_url,
                max_connections,
                file_storage_path,
            },
            server: ServerConfig { address, base_url },
            deleter: DeleterConfig {
                workers,
                queue_capacity,
            },
        })
    }
}
