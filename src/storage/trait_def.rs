use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Error taxonomy at the storage boundary. Raw driver errors are
/// classified here and never leak past the service layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The original URL already has a live mapping, or the candidate
    /// short id is already taken.
    #[error("mapping already exists")]
    Conflict,
    /// No record for the given key.
    #[error("short id not found")]
    NotFound,
    /// The record exists but has been soft-deleted.
    #[error("short id has been deleted")]
    Gone,
    /// The backend could not be reached or failed unexpectedly.
    #[error("storage backend unavailable")]
    Unavailable(#[from] anyhow::Error),
}

impl StorageError {
    pub(crate) fn unavailable(err: sqlx::Error) -> Self {
        StorageError::Unavailable(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Canonical record store behind the shortening service.
///
/// Two families of implementations exist: the in-process memory store
/// (degraded mode, no ownership or soft-delete tracking) and the durable
/// SQL stores. All methods must be safe for concurrent use; the deletion
/// pipeline calls `delete` from many workers at once.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create schema, etc.)
    async fn init(&self) -> Result<()>;

    /// Persist a new mapping. Fails with [`StorageError::Conflict`] when
    /// the original URL already has a live mapping or the short id is
    /// taken; uniqueness is enforced by the store itself so concurrent
    /// creates race safely.
    async fn create(
        &self,
        short_id: &str,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()>;

    /// Resolve a short id to its original URL. `NotFound` for unknown
    /// ids, `Gone` for soft-deleted ones.
    async fn resolve(&self, short_id: &str) -> StorageResult<String>;

    /// Look up the live short id for an original URL. `NotFound` when no
    /// live mapping exists.
    async fn find_by_original(&self, original_url: &str) -> StorageResult<String>;

    /// All live `(short_id, original_url)` pairs for an owner, in
    /// insertion order. Unknown owners yield an empty list.
    async fn list_owned(&self, owner_id: &str) -> StorageResult<Vec<(String, String)>>;

    /// Soft-delete a record, but only if it belongs to `owner_id`.
    /// Returns whether the flag was actually flipped. Ownership
    /// mismatches, unknown ids and already-deleted records are silent
    /// no-ops returning `false`, never errors.
    async fn delete(&self, owner_id: &str, short_id: &str) -> StorageResult<bool>;

    /// Backend liveness probe.
    async fn ping(&self) -> StorageResult<()>;

    /// Number of live URL records.
    async fn url_count(&self) -> StorageResult<i64>;

    /// Number of distinct owners with at least one record.
    async fn user_count(&self) -> StorageResult<i64>;
}
