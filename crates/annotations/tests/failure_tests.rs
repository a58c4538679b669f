//! Behavior when a collaborator fails.

mod common;

use std::sync::Arc;

use helios_annotations::backends::memory::{MemoryCache, MemoryStore, MemoryVersionCounter};
use helios_annotations::error::AnnotationError;
use helios_annotations::types::{HistoryQuery, ImageQuery, SearchQuery};

use common::{
    FailingCache, FailingCounter, FailingStore, payload_with_metadata, sample_payload,
    service_with,
};

#[tokio::test]
async fn counter_failure_aborts_before_store_write() {
    let store = Arc::new(FailingStore::new());
    let service = service_with(
        store.clone(),
        Arc::new(FailingCounter::failing()),
        Arc::new(MemoryCache::new()),
    );

    let err = service
        .create("img-1", sample_payload(1), "dr-a")
        .await
        .unwrap_err();

    assert!(matches!(err, AnnotationError::Counter(_)));
    assert_eq!(store.insert_attempts(), 0);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn store_failure_leaves_version_gap() {
    let store = Arc::new(FailingStore::new());
    let counter = Arc::new(MemoryVersionCounter::new());
    let service = service_with(store.clone(), counter.clone(), Arc::new(MemoryCache::new()));

    store.set_fail_inserts(true);
    let err = service
        .create("img-1", sample_payload(1), "dr-a")
        .await
        .unwrap_err();
    assert!(matches!(err, AnnotationError::Store(_)));
    assert_eq!(store.len(), 0);

    store.set_fail_inserts(false);
    let created = service
        .create("img-1", sample_payload(2), "dr-a")
        .await
        .unwrap();
    assert_eq!(created.version, 2);

    let history = service
        .get_history("img-1", &HistoryQuery::new())
        .await
        .unwrap();
    assert_eq!(history.iter().map(|r| r.version).collect::<Vec<_>>(), vec![2]);
}

#[tokio::test]
async fn counter_reset_failure_after_purge_is_reported() {
    let counter = Arc::new(FailingCounter::default());
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), counter.clone(), Arc::new(MemoryCache::new()));

    service.create("img-1", sample_payload(1), "dr-a").await.unwrap();
    counter.set_failing(true);

    let err = service.delete_all_for_image("img-1").await.unwrap_err();
    assert!(matches!(err, AnnotationError::Counter(_)));
    // The records are gone even though the reset failed.
    assert!(store.is_empty());
}

#[tokio::test]
async fn failing_cache_never_fails_operations() {
    let cache = Arc::new(FailingCache::new());
    let service = service_with(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryVersionCounter::new()),
        cache.clone(),
    );

    let created = service
        .create("img-1", payload_with_metadata(1, Some("s-1"), None), "dr-a")
        .await
        .unwrap();
    assert_eq!(created.version, 1);
    assert_eq!(cache.puts(), 1);

    let record = service.get_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(record.id, created.id);
    assert!(cache.gets() >= 1);

    let page = service
        .search(&SearchQuery::new().study_id("s-1"))
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);

    assert!(service.soft_delete(&created.id, "admin").await.unwrap());
    assert!(cache.invalidations() >= 1);

    service.create("img-1", sample_payload(2), "dr-a").await.unwrap();
    assert_eq!(service.delete_all_for_image("img-1").await.unwrap(), 2);

    assert!(service
        .get_for_image("img-1", &ImageQuery::new().include_deleted(true))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn health_check_reports_counter_failure() {
    let service = service_with(
        Arc::new(MemoryStore::new()),
        Arc::new(FailingCounter::failing()),
        Arc::new(MemoryCache::new()),
    );

    let err = service.health_check().await.unwrap_err();
    assert!(matches!(err, AnnotationError::Counter(_)));
}
