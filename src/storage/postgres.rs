use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::models::UrlRecord;
use crate::storage::{Storage, StorageError, StorageResult};

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn now_unix() -> StorageResult<i64> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| StorageError::Unavailable(e.into()))?;
    Ok(now.as_secs() as i64)
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id BIGSERIAL PRIMARY KEY,
                short_id TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        // Original URLs are unique among live rows only; soft-deleted
        // rows must not block re-shortening the same URL.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_urls_live_original
             ON urls(original_url) WHERE NOT deleted",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_urls_owner ON urls(owner_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create(
        &self,
        short_id: &str,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()> {
        let created_at = now_unix()?;

        let result = sqlx::query(
            r#"
            INSERT INTO urls (short_id, original_url, owner_id, deleted, created_at)
            VALUES ($1, $2, $3, FALSE, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(short_id)
        .bind(original_url)
        .bind(owner_id)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(())
    }

    async fn resolve(&self, short_id: &str) -> StorageResult<String> {
        let record = sqlx::query_as::<_, UrlRecord>(
            r#"
            SELECT id, short_id, original_url, owner_id, deleted, created_at
            FROM urls
            WHERE short_id = $1
            "#,
        )
        .bind(short_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::unavailable)?;

        match record {
            None => Err(StorageError::NotFound),
            Some(record) if record.deleted => Err(StorageError::Gone),
            Some(record) => Ok(record.original_url),
        }
    }

    async fn find_by_original(&self, original_url: &str) -> StorageResult<String> {
        let short_id = sqlx::query_scalar::<_, String>(
            "SELECT short_id FROM urls WHERE original_url = $1 AND NOT deleted",
        )
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::unavailable)?;

        short_id.ok_or(StorageError::NotFound)
    }

    async fn list_owned(&self, owner_id: &str) -> StorageResult<Vec<(String, String)>> {
        sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT short_id, original_url
            FROM urls
            WHERE owner_id = $1 AND NOT deleted
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::unavailable)
    }

    async fn delete(&self, owner_id: &str, short_id: &str) -> StorageResult<bool> {
        // The owner check lives in the WHERE clause: a mismatch affects
        // zero rows and is indistinguishable from an unknown id.
        let result = sqlx::query(
            "UPDATE urls SET deleted = TRUE WHERE short_id = $1 AND owner_id = $2 AND NOT deleted",
        )
        .bind(short_id)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(StorageError::unavailable)?;
        Ok(())
    }

    async fn url_count(&self) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM urls WHERE NOT deleted")
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(StorageError::unavailable)
    }

    async fn user_count(&self) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT owner_id) FROM urls")
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(StorageError::unavailable)
    }
}
