#[cfg(test)]
mod tests {
    use crate::storage::{SqliteStorage, Storage, StorageError};
    use std::sync::Arc;

    async fn setup_sqlite() -> Arc<dyn Storage> {
        // One pooled connection: every in-memory sqlite connection gets
        // its own database, so the pool must not open a second one.
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    #[tokio::test]
    async fn create_resolve_round_trip() {
        let storage = setup_sqlite().await;
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
    async fn unknown_id_is_not_found() {
        let storage = setup_sqlite().await;
        assert!(matches!(
            storage.resolve("missing0").await.unwrap_err(),
            StorageError::NotFound
        ));
        assert!(matches!(
            storage
                .find_by_original("https://example.com")
                .await
                .unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn duplicate_original_url_conflicts() {
        let storage = setup_sqlite().await;
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
    async fn reused_short_id_conflicts() {
        let storage = setup_sqlite().await;
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
    async fn concurrent_creates_of_same_url_have_one_winner() {
        let storage = setup_sqlite().await;

        let mut handles = vec![];
        for i in 0..10 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .create(&format!("ShortId{i}"), "https://example.com", "u1")
                    .await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => created += 1,
                Err(StorageError::Conflict) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }

        assert_eq!(created, 1, "exactly one create should win");
        assert_eq!(conflicts, 9);
    }

    #[tokio::test]
    async fn delete_flips_record_to_gone() {
        let storage = setup_sqlite().await;
        storage
            .create("AbCdEfGh", "https://example.com", "u1")
            .await
            .unwrap();

        assert!(storage.delete("u1", "AbCdEfGh").await.unwrap());
        assert!(matches!(
            storage.resolve("AbCdEfGh").await.unwrap_err(),
            StorageError::Gone
        ));
        // Idempotent: the second delete affects nothing.
        assert!(!storage.delete("u1", "AbCdEfGh").await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_a_silent_noop() {
        let storage = setup_sqlite().await;
        storage
            .create("AbCdEfGh", "https://example.com", "owner")
            .await
            .unwrap();

        assert!(!storage.delete("intruder", "AbCdEfGh").await.unwrap());
        assert_eq!(
            storage.resolve("AbCdEfGh").await.unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn deleted_url_can_be_shortened_again_with_fresh_id() {
        let storage = setup_sqlite().await;
        storage
            .create("AbCdEfGh", "https://example.com", "u1")
            .await
            .unwrap();
        storage.delete("u1", "AbCdEfGh").await.unwrap();

        // The live-rows unique index no longer blocks the URL, but the
        // old short id stays taken forever.
        storage
            .create("NewId123", "https://example.com", "u1")
            .await
            .unwrap();
        assert!(matches!(
            storage
                .create("AbCdEfGh", "https://other.example", "u1")
                .await
                .unwrap_err(),
            StorageError::Conflict
        ));

        assert!(matches!(
            storage.resolve("AbCdEfGh").await.unwrap_err(),
            StorageError::Gone
        ));
        assert_eq!(
            storage.find_by_original("https://example.com").await.unwrap(),
            "NewId123"
        );
    }

    #[tokio::test]
    async fn listing_skips_deleted_and_foreign_records() {
        let storage = setup_sqlite().await;
        storage
            .create("FirstAaa", "https://example.com/1", "u1")
            .await
            .unwrap();
        storage
            .create("SecondBb", "https://example.com/2", "u1")
            .await
            .unwrap();
        storage
            .create("ThirdCcc", "https://example.com/3", "u2")
            .await
            .unwrap();
        storage.delete("u1", "SecondBb").await.unwrap();

        let owned = storage.list_owned("u1").await.unwrap();
        assert_eq!(
            owned,
            vec![("FirstAaa".to_string(), "https://example.com/1".to_string())]
        );

        assert!(storage.list_owned("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counts_track_live_urls_and_distinct_owners() {
        let storage = setup_sqlite().await;
        assert_eq!(storage.url_count().await.unwrap(), 0);
        assert_eq!(storage.user_count().await.unwrap(), 0);

        storage
            .create("FirstAaa", "https://example.com/1", "u1")
            .await
            .unwrap();
        storage
            .create("SecondBb", "https://example.com/2", "u1")
            .await
            .unwrap();
        storage
            .create("ThirdCcc", "https://example.com/3", "u2")
            .await
            .unwrap();

        assert_eq!(storage.url_count().await.unwrap(), 3);
        assert_eq!(storage.user_count().await.unwrap(), 2);

        storage.delete("u1", "FirstAaa").await.unwrap();
        assert_eq!(storage.url_count().await.unwrap(), 2);
        // Soft-deleted rows still count toward owners seen.
        assert_eq!(storage.user_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ping_succeeds_on_live_pool() {
        let storage = setup_sqlite().await;
        storage.ping().await.unwrap();
    }
}
