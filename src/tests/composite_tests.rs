//! tests/composite_tests.rs - Read-fallback and write-through composition

#[cfg(test)]
mod tests {
    use crate::cache::composite::CompositeCache;
    use crate::cache::keys;
    use crate::cache::memory::MemoryCache;
    use crate::cache::{CacheBackend, CacheError};
    use crate::tests::support::{tournament_fixture, FaultyBackend};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory() -> Arc<MemoryCache> {
        Arc::new(MemoryCache::new(Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn test_read_falls_back_past_faulted_backend() {
        let faulty = Arc::new(FaultyBackend::new(true, false));
        let healthy = memory();
        let key = keys::tournament_key("fallback");
        healthy
            .set(&key, &tournament_fixture("From B"), Duration::from_secs(60))
            .await
            .unwrap();

        let composite = CompositeCache::new(vec![faulty as Arc<dyn CacheBackend>, healthy], false);
        let hit = composite.get(&key).await.unwrap();
        assert_eq!(hit.unwrap().name, "From B", "Read must fall back to the healthy backend");
    }

    #[tokio::test]
    async fn test_write_succeeds_when_one_backend_accepts() {
        let faulty = Arc::new(FaultyBackend::new(false, true));
        let healthy = memory();
        let composite =
            CompositeCache::new(vec![faulty as Arc<dyn CacheBackend>, healthy.clone()], false);

        let key = keys::tournament_key("partial-write");
        composite
            .set(&key, &tournament_fixture("Partial"), Duration::from_secs(60))
            .await
            .expect("Write should succeed when at least one backend accepts it");

        let direct = healthy.get(&key).await.unwrap();
        assert_eq!(direct.unwrap().name, "Partial");
    }

    #[tokio::test]
    async fn test_write_fails_when_all_backends_fail() {
        let a = Arc::new(FaultyBackend::new(false, true));
        let b = Arc::new(FaultyBackend::new(false, true));
        let composite = CompositeCache::new(vec![a as Arc<dyn CacheBackend>, b], false);

        let result = composite
            .set(
                "tournament:doomed",
                &tournament_fixture("Doomed"),
                Duration::from_secs(60),
            )
            .await;
        assert!(matches!(result, Err(CacheError::AllBackendsFailed(_))));
    }

    #[tokio::test]
    async fn test_write_through_is_visible_in_every_healthy_backend() {
        let a = memory();
        let b = memory();
        let composite = CompositeCache::new(
            vec![a.clone() as Arc<dyn CacheBackend>, b.clone()],
            false,
        );

        let key = keys::tournament_key("write-through");
        composite
            .set(&key, &tournament_fixture("Everywhere"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(a.get(&key).await.unwrap().unwrap().name, "Everywhere");
        assert_eq!(b.get(&key).await.unwrap().unwrap().name, "Everywhere");
    }

    #[tokio::test]
    async fn test_get_does_not_promote_by_default() {
        let a = memory();
        let b = memory();
        let key = keys::tournament_key("no-promotion");
        b.set(&key, &tournament_fixture("Lower"), Duration::from_secs(60))
            .await
            .unwrap();

        let composite = CompositeCache::new(
            vec![a.clone() as Arc<dyn CacheBackend>, b],
            false,
        );
        assert!(composite.get(&key).await.unwrap().is_some());

        assert!(
            a.get(&key).await.unwrap().is_none(),
            "Without promotion the hit must not be copied upward"
        );
    }

    #[tokio::test]
    async fn test_promotion_backfills_upper_levels() {
        let a = memory();
        let b = memory();
        let key = keys::tournament_key("promotion");
        b.set(&key, &tournament_fixture("Promoted"), Duration::from_secs(60))
            .await
            .unwrap();

        let composite = CompositeCache::new(
            vec![a.clone() as Arc<dyn CacheBackend>, b],
            true,
        );
        let hit = composite.get(&key).await.unwrap();
        assert_eq!(hit.unwrap().name, "Promoted");

        // Promotion is fire-and-forget; give the task a moment.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let promoted = a.get(&key).await.unwrap();
        assert_eq!(
            promoted.unwrap().name,
            "Promoted",
            "Hit at a lower level should be backfilled into the preferred backend"
        );

        let metadata = a.metadata(&key).await.unwrap().unwrap();
        assert!(
            metadata.ttl <= 60,
            "Promoted copy must reuse the remaining TTL, got {}",
            metadata.ttl
        );
    }

    #[tokio::test]
    async fn test_delete_swallows_individual_failures() {
        let faulty = Arc::new(FaultyBackend::new(false, true));
        let healthy = memory();
        let key = keys::tournament_key("delete");
        healthy
            .set(&key, &tournament_fixture("Delete Me"), Duration::from_secs(60))
            .await
            .unwrap();

        let composite =
            CompositeCache::new(vec![faulty as Arc<dyn CacheBackend>, healthy.clone()], false);
        composite
            .del(&key)
            .await
            .expect("Delete must swallow individual backend failures");
        assert!(healthy.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_and_metadata_fall_back() {
        let faulty = Arc::new(FaultyBackend::new(true, false));
        let healthy = memory();
        let key = keys::tournament_key("exists");
        healthy
            .set(&key, &tournament_fixture("Here"), Duration::from_secs(60))
            .await
            .unwrap();

        let composite =
            CompositeCache::new(vec![faulty.clone() as Arc<dyn CacheBackend>, healthy], false);
        assert!(composite.exists(&key).await.unwrap());
        let metadata = composite.metadata(&key).await.unwrap().unwrap();
        assert!(metadata.ttl > 0);

        // A healed backend with no entry still reads as a miss, not a fault.
        faulty.fail_reads.store(false, Ordering::SeqCst);
        assert!(composite.get("tournament:absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_composite_name_lists_backends_in_order() {
        let composite = CompositeCache::new(
            vec![
                Arc::new(FaultyBackend::new(false, false)) as Arc<dyn CacheBackend>,
                memory(),
            ],
            false,
        );
        assert_eq!(composite.name(), "Composite(faulty → memory)");
    }

    #[tokio::test]
    async fn test_clear_propagates_to_every_backend() {
        let a = memory();
        let b = memory();
        let key = keys::tournament_key("clear");
        let composite = CompositeCache::new(
            vec![a.clone() as Arc<dyn CacheBackend>, b.clone()],
            false,
        );
        composite
            .set(&key, &tournament_fixture("Clear"), Duration::from_secs(60))
            .await
            .unwrap();

        composite.clear().await.unwrap();
        assert!(a.get(&key).await.unwrap().is_none());
        assert!(b.get(&key).await.unwrap().is_none());
    }
}
