//! Stress-style tests for the deletion pipeline: many batches across
//! many owners flowing through the bounded worker pool at once.

use std::sync::Arc;
use std::time::Duration;

use curt::deleter::Deleter;
use curt::models::BatchDelete;
use curt::storage::{SqliteStorage, Storage, StorageError};

async fn sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

#[tokio::test]
async fn many_batches_across_owners_drain_completely() {
    let storage = sqlite_storage().await;

    let owners = 5;
    let per_owner = 8;
    for owner in 0..owners {
        for i in 0..per_owner {
            storage
                .create(
                    &format!("Own{owner}Id{i:02}"),
                    &format!("https://example.com/{owner}/{i}"),
                    &format!("user{owner}"),
                )
                .await
                .unwrap();
        }
    }

    // Queue smaller than the total load, to exercise backpressure.
    let deleter = Deleter::spawn(Arc::clone(&storage), 3, 4);
    for owner in 0..owners {
        deleter
            .submit(BatchDelete {
                owner_id: format!("user{owner}"),
                short_ids: (0..per_owner).map(|i| format!("Own{owner}Id{i:02}")).collect(),
            })
            .await
            .unwrap();
    }
    deleter.shutdown(Duration::from_secs(10)).await;

    for owner in 0..owners {
        for i in 0..per_owner {
            assert!(matches!(
                storage
                    .resolve(&format!("Own{owner}Id{i:02}"))
                    .await
                    .unwrap_err(),
                StorageError::Gone
            ));
        }
    }
    assert_eq!(storage.url_count().await.unwrap(), 0);
}

#[tokio::test]
async fn mixed_batch_reports_only_real_deletions() {
    let storage = sqlite_storage().await;
    storage.create("MineAone", "https://a.example", "u1").await.unwrap();
    storage.create("MineBtwo", "https://b.example", "u1").await.unwrap();
    storage
        .create("ForeignX", "https://x.example", "someone-else")
        .await
        .unwrap();
    // Already-deleted records are idempotent no-ops for the pipeline.
    storage.delete("u1", "MineBtwo").await.unwrap();

    let deleter = Deleter::spawn(Arc::clone(&storage), 2, 8);
    let mut rx = deleter
        .submit_watched(BatchDelete {
            owner_id: "u1".to_string(),
            short_ids: vec![
                "MineAone".to_string(),
                "MineBtwo".to_string(),
                "ForeignX".to_string(),
                "missingZ".to_string(),
            ],
        })
        .await
        .unwrap();

    let mut completed = Vec::new();
    while let Some(id) = rx.recv().await {
        completed.push(id);
    }
    assert_eq!(completed, vec!["MineAone".to_string()]);

    deleter.shutdown(Duration::from_secs(5)).await;
    assert_eq!(
        storage.resolve("ForeignX").await.unwrap(),
        "https://x.example"
    );
}

#[tokio::test]
async fn overlapping_batches_for_the_same_id_are_idempotent() {
    let storage = sqlite_storage().await;
    storage.create("SharedId", "https://example.com", "u1").await.unwrap();

    let deleter = Deleter::spawn(Arc::clone(&storage), 4, 8);
    for _ in 0..4 {
        deleter
            .submit(BatchDelete {
                owner_id: "u1".to_string(),
                short_ids: vec!["SharedId".to_string()],
            })
            .await
            .unwrap();
    }
    deleter.shutdown(Duration::from_secs(5)).await;

    // Deleted once, stays deleted; duplicate work is harmless.
    assert!(matches!(
        storage.resolve("SharedId").await.unwrap_err(),
        StorageError::Gone
    ));
}
