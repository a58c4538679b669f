//! Concurrent creates and deletes against a shared service.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use helios_annotations::AnnotationService;
use helios_annotations::types::ImageQuery;

use common::sample_payload;

const WRITERS: usize = 40;

async fn assert_versions_dense(service: Arc<AnnotationService>) {
    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create("img-shared", sample_payload(n), &format!("user-{n}"))
                    .await
                    .expect("create should succeed")
                    .version
            })
        })
        .collect();

    let mut versions = BTreeSet::new();
    for handle in handles {
        let version = handle.await.expect("task panicked");
        assert!(versions.insert(version), "duplicate version {version}");
    }

    let expected: BTreeSet<u64> = (1..=WRITERS as u64).collect();
    assert_eq!(versions, expected);

    let stored = service
        .get_for_image("img-shared", &ImageQuery::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.len(), WRITERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_creates_get_distinct_versions() {
    assert_versions_dense(Arc::new(common::memory_service())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_memory_concurrent_creates_get_distinct_versions() {
    assert_versions_dense(Arc::new(common::sqlite_service())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_file_concurrent_creates_get_distinct_versions() {
    use helios_annotations::backends::memory::MemoryCache;
    use helios_annotations::backends::sqlite::SqliteBackend;

    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SqliteBackend::open(dir.path().join("annotations.db")).unwrap());
    let service = common::service_with(backend.clone(), backend, Arc::new(MemoryCache::new()));

    assert_versions_dense(Arc::new(service)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_images_keep_separate_sequences() {
    let service = Arc::new(common::memory_service());

    let handles: Vec<_> = (0..30)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                let image_id = format!("img-{}", n % 3);
                let created = service
                    .create(&image_id, sample_payload(n), "dr-a")
                    .await
                    .unwrap();
                (image_id, created.version)
            })
        })
        .collect();

    let mut per_image: std::collections::HashMap<String, BTreeSet<u64>> = Default::default();
    for handle in handles {
        let (image_id, version) = handle.await.unwrap();
        per_image.entry(image_id).or_default().insert(version);
    }

    assert_eq!(per_image.len(), 3);
    for versions in per_image.values() {
        assert_eq!(versions, &(1..=10u64).collect::<BTreeSet<_>>());
    }
}

async fn assert_single_soft_delete_wins(service: Arc<AnnotationService>) {
    let created = service
        .create("img-1", sample_payload(1), "dr-a")
        .await
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let service = service.clone();
            let id = created.id.clone();
            tokio::spawn(async move {
                service
                    .soft_delete(&id, &format!("admin-{n}"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let record = service.get_by_id(&created.id).await.unwrap().unwrap();
    assert!(record.is_deleted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_soft_delete_has_one_winner() {
    assert_single_soft_delete_wins(Arc::new(common::memory_service())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_soft_delete_has_one_winner() {
    assert_single_soft_delete_wins(Arc::new(common::sqlite_service())).await;
}
