use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::models::DumpRecord;
use crate::storage::{Storage, StorageError, StorageResult};

/// What the cache store keeps per short id. The uuid travels with the
/// mapping so dump/restore cycles do not renumber records.
#[derive(Debug, Clone)]
struct CachedRecord {
    original_url: String,
    uuid: String,
}

/// In-process cache store, used when no durable backend is configured.
///
/// Degraded mode by contract: there is no ownership or soft-delete
/// tracking, so `delete` removes the entry outright regardless of owner,
/// `resolve` never reports `Gone`, `list_owned` returns every live entry
/// and `user_count` is always zero.
#[derive(Default)]
pub struct MemoryStorage {
    by_short: DashMap<String, CachedRecord>,
    by_original: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load records, e.g. from the JSON-lines backup file. Existing
    /// entries win over duplicates in `records`.
    pub fn fill(&self, records: impl IntoIterator<Item = DumpRecord>) {
        for record in records {
            if let Entry::Vacant(slot) = self.by_original.entry(record.original_url.clone()) {
                slot.insert(record.short_url.clone());
                self.by_short.insert(
                    record.short_url,
                    CachedRecord {
                        original_url: record.original_url,
                        uuid: record.uuid,
                    },
                );
            }
        }
    }

    /// Snapshot of every live mapping, for the backup dump.
    pub fn snapshot(&self) -> Vec<DumpRecord> {
        self.by_short
            .iter()
            .map(|entry| DumpRecord {
                uuid: entry.value().uuid.clone(),
                short_url: entry.key().clone(),
                original_url: entry.value().original_url.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn create(
        &self,
        short_id: &str,
        original_url: &str,
        _owner_id: &str,
    ) -> StorageResult<()> {
        // The reverse map entry is the claim on the URL; holding it keeps
        // a concurrent create of the same URL out until we are done.
        match self.by_original.entry(original_url.to_string()) {
            Entry::Occupied(_) => Err(StorageError::Conflict),
            Entry::Vacant(slot) => {
                if self.by_short.contains_key(short_id) {
                    return Err(StorageError::Conflict);
                }
                slot.insert(short_id.to_string());
                self.by_short.insert(
                    short_id.to_string(),
                    CachedRecord {
                        original_url: original_url.to_string(),
                        // New records get their short id as uuid; stable
                        // across dump/restore either way.
                        uuid: short_id.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn resolve(&self, short_id: &str) -> StorageResult<String> {
        self.by_short
            .get(short_id)
            .map(|entry| entry.value().original_url.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn find_by_original(&self, original_url: &str) -> StorageResult<String> {
        self.by_original
            .get(original_url)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_owned(&self, _owner_id: &str) -> StorageResult<Vec<(String, String)>> {
        Ok(self
            .by_short
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().original_url.clone()))
            .collect())
    }

    async fn delete(&self, _owner_id: &str, short_id: &str) -> StorageResult<bool> {
        match self.by_short.remove(short_id) {
            Some((_, record)) => {
                self.by_original.remove(&record.original_url);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn url_count(&self) -> StorageResult<i64> {
        Ok(self.by_short.len() as i64)
    }

    async fn user_count(&self) -> StorageResult<i64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_resolve_round_trips() {
        let storage = MemoryStorage::new();
        storage
            .create("AbCdEfGh", "https://example.com", "u1")
            .await
            .unwrap();
        assert_eq!(
            storage.resolve("AbCdEfGh").await.unwrap(),
            "https://example.com"
        );
        assert_eq!(
            storage.find_by_original("https://example.com").await.unwrap(),
            "AbCdEfGh"
        );
    }

    #[tokio::test]
    async fn duplicate_url_conflicts() {
        let storage = MemoryStorage::new();
        storage
            .create("AbCdEfGh", "https://example.com", "u1")
            .await
            .unwrap();
        let err = storage
            .create("ZzZzZzZz", "https://example.com", "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn taken_short_id_conflicts() {
        let storage = MemoryStorage::new();
        storage
            .create("AbCdEfGh", "https://example.com/a", "u1")
            .await
            .unwrap();
        let err = storage
            .create("AbCdEfGh", "https://example.com/b", "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn delete_removes_entry_regardless_of_owner() {
        let storage = MemoryStorage::new();
        storage
            .create("AbCdEfGh", "https://example.com", "u1")
            .await
            .unwrap();

        // Degraded mode: no ownership tracking.
        assert!(storage.delete("someone-else", "AbCdEfGh").await.unwrap());
        assert!(matches!(
            storage.resolve("AbCdEfGh").await.unwrap_err(),
            StorageError::NotFound
        ));
        // Second delete is a no-op, not an error.
        assert!(!storage.delete("u1", "AbCdEfGh").await.unwrap());
    }

    #[tokio::test]
    async fn fill_and_snapshot_round_trip() {
        let storage = MemoryStorage::new();
        storage.fill(vec![
            DumpRecord {
                uuid: "41".to_string(),
                short_url: "AbCdEfGh".to_string(),
                original_url: "https://example.com/a".to_string(),
            },
            DumpRecord {
                uuid: "7".to_string(),
                short_url: "HgFeDcBa".to_string(),
                original_url: "https://example.com/b".to_string(),
            },
        ]);

        assert_eq!(storage.url_count().await.unwrap(), 2);
        assert_eq!(
            storage.resolve("AbCdEfGh").await.unwrap(),
            "https://example.com/a"
        );

        let mut snapshot = storage.snapshot();
        snapshot.sort_by(|a, b| a.short_url.cmp(&b.short_url));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].short_url, "AbCdEfGh");
        // Loaded uuids survive the round trip instead of being
        // renumbered by snapshot order.
        assert_eq!(snapshot[0].uuid, "41");
        assert_eq!(snapshot[1].uuid, "7");

        // And a second cycle through another store keeps them stable.
        let restored = MemoryStorage::new();
        restored.fill(snapshot);
        let mut again = restored.snapshot();
        again.sort_by(|a, b| a.short_url.cmp(&b.short_url));
        assert_eq!(again[0].uuid, "41");
        assert_eq!(again[1].uuid, "7");
    }
}
