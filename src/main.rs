use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use curt::api;
use curt::config::{Config, StorageBackend};
use curt::deleter::Deleter;
use curt::idgen::{IdGenerator, Strategy};
use curt::service::Shortener;
use curt::storage::{dump, MemoryStorage, PostgresStorage, SqliteStorage, Storage};

/// How long the deletion pipeline may drain after the server stops.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let mut memory_handle: Option<Arc<MemoryStorage>> = None;
    let storage: Arc<dyn Storage> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            let memory = Arc::new(MemoryStorage::new());
            if let Some(path) = config.storage.file_storage_path.as_deref() {
                let records = dump::load(path)?;
                info!("Restored {} records from {}", records.len(), path.display());
                memory.fill(records);
            }
            memory_handle = Some(Arc::clone(&memory));
            memory
        }
        StorageBackend::Sqlite => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the sqlite backend")?;
            info!("Using SQLite storage: {url}");
            Arc::new(SqliteStorage::new(url, config.storage.max_connections).await?)
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres backend")?;
            info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(url, config.storage.max_connections).await?)
        }
    };

    storage.init().await?;
    info!("Storage initialized");

    // Wire the deletion pipeline and the shortening service
    let deleter = Deleter::spawn(
        Arc::clone(&storage),
        config.deleter.workers,
        config.deleter.queue_capacity,
    );
    let service = Arc::new(Shortener::new(
        Arc::clone(&storage),
        deleter,
        IdGenerator::new(Strategy::Hash),
        config.server.base_url.clone(),
    ));

    let router = api::create_router(Arc::clone(&service));
    let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
    info!("Listening on http://{}", config.server.address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight delete batches finish before the process exits.
    info!("Draining deletion pipeline...");
    service.shutdown(SHUTDOWN_DRAIN).await;

    if let (Some(memory), Some(path)) = (
        memory_handle,
        config.storage.file_storage_path.as_deref(),
    ) {
        dump::save(path, &memory.snapshot())?;
        info!("Wrote backup to {}", path.display());
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
