use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::deleter::Deleter;
use crate::idgen::IdGenerator;
use crate::models::{BatchDelete, OwnedUrl};
use crate::storage::{Storage, StorageError};

/// Retry bound for candidate id generation. With an 8-character
/// alphanumeric space this should never be hit; reaching it means the id
/// space or the generator is misconfigured.
pub const MAX_GENERATE_ATTEMPTS: usize = 10;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Could not find a free short id within the retry bound. Fatal
    /// configuration-level condition, not a caller error.
    #[error("short id space exhausted after {0} attempts")]
    GenerationExhausted(usize),
    /// The deletion pipeline no longer accepts work (shutdown in
    /// progress).
    #[error("deletion pipeline unavailable")]
    PipelineClosed,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result of a shorten request. `created` distinguishes a fresh mapping
/// from an already-existing one so the transport layer can pick its
/// status code without parsing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenOutcome {
    pub short_url: String,
    pub created: bool,
}

/// Orchestrates create/read/list/delete over the active backend and
/// drives the deletion pipeline.
pub struct Shortener {
    storage: Arc<dyn Storage>,
    deleter: Deleter,
    generator: IdGenerator,
    base_url: String,
}

impl Shortener {
    pub fn new(
        storage: Arc<dyn Storage>,
        deleter: Deleter,
        generator: IdGenerator,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            storage,
            deleter,
            generator,
            base_url,
        }
    }

    fn short_url(&self, short_id: &str) -> String {
        format!("{}/{}", self.base_url, short_id)
    }

    /// Shorten `original_url` for `owner_id`. Idempotent per URL: a
    /// duplicate resolves to the existing short id with `created: false`
    /// instead of minting a second mapping.
    pub async fn shorten(&self, owner_id: &str, original_url: &str) -> ServiceResult<ShortenOutcome> {
        for attempt in 0..MAX_GENERATE_ATTEMPTS {
            let candidate = self.generator.generate(original_url, attempt);
            match self.storage.create(&candidate, original_url, owner_id).await {
                Ok(()) => {
                    debug!(short_id = %candidate, owner_id, "created mapping");
                    return Ok(ShortenOutcome {
                        short_url: self.short_url(&candidate),
                        created: true,
                    });
                }
                Err(StorageError::Conflict) => {
                    match self.storage.find_by_original(original_url).await {
                        Ok(existing) => {
                            return Ok(ShortenOutcome {
                                short_url: self.short_url(&existing),
                                created: false,
                            });
                        }
                        // The conflict was on the short id, not the URL:
                        // another mapping (possibly a soft-deleted one,
                        // whose id stays reserved) holds the candidate.
                        // The next attempt salts the generator, so even
                        // the hash strategy produces a fresh id here.
                        Err(StorageError::NotFound) => continue,
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::GenerationExhausted(MAX_GENERATE_ATTEMPTS))
    }

    /// Resolve a short id to its original URL. `NotFound` and `Gone`
    /// propagate distinctly; the transport maps them to different
    /// outcomes (redirect target missing vs permanently gone).
    pub async fn resolve(&self, short_id: &str) -> ServiceResult<String> {
        Ok(self.storage.resolve(short_id).await?)
    }

    /// Every live URL belonging to `owner_id`. Unknown owners get an
    /// empty list; they are indistinguishable from owners with zero
    /// URLs on purpose.
    pub async fn list_owned(&self, owner_id: &str) -> ServiceResult<Vec<OwnedUrl>> {
        let pairs = self.storage.list_owned(owner_id).await?;
        Ok(pairs
            .into_iter()
            .map(|(short_id, original_url)| OwnedUrl {
                short_url: self.short_url(&short_id),
                original_url,
            })
            .collect())
    }

    /// Submit a batch deletion and return once the pipeline has accepted
    /// it. Completion is asynchronous; items the caller does not own are
    /// dropped silently by the storage layer.
    pub async fn delete_batch(
        &self,
        owner_id: &str,
        short_ids: Vec<String>,
    ) -> ServiceResult<()> {
        self.deleter
            .submit(BatchDelete {
                owner_id: owner_id.to_string(),
                short_ids,
            })
            .await
            .map_err(|_| ServiceError::PipelineClosed)
    }

    pub async fn ping(&self) -> ServiceResult<()> {
        Ok(self.storage.ping().await?)
    }

    pub async fn url_count(&self) -> ServiceResult<i64> {
        Ok(self.storage.url_count().await?)
    }

    pub async fn user_count(&self) -> ServiceResult<i64> {
        Ok(self.storage.user_count().await?)
    }

    /// Drain the deletion pipeline; called on graceful shutdown.
    pub async fn shutdown(&self, timeout: Duration) {
        self.deleter.shutdown(timeout).await;
    }
}
