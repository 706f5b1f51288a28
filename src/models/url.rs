use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored short-id/original-url mapping.
///
/// Rows are created by a successful shorten request, mutated only by
/// flipping `deleted` to true, and never physically removed. `short_id`
/// is unique for the lifetime of the store, even after soft deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UrlRecord {
    pub id: i64,
    pub short_id: String,
    pub original_url: String,
    pub owner_id: String,
    pub deleted: bool,
    pub created_at: i64,
}

/// One element of a per-owner listing, already joined with the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUrl {
    pub short_url: String,
    pub original_url: String,
}

/// A caller-submitted unit of deletion work. Lives only for the duration
/// of pipeline processing; never persisted.
#[derive(Debug, Clone)]
pub struct BatchDelete {
    pub owner_id: String,
    pub short_ids: Vec<String>,
}

/// One line of the JSON-lines backup file consumed and produced by the
/// memory backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRecord {
    pub uuid: String,
    pub short_url: String,
    pub original_url: String,
}
