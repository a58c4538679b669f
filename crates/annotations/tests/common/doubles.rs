//! Collaborator doubles that fail on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use helios_annotations::backends::memory::{MemoryStore, MemoryVersionCounter};
use helios_annotations::core::{AnnotationStore, CacheLayer, VersionCounter};
use helios_annotations::error::{
    CacheError, CacheResult, CounterError, CounterResult, StoreError, StoreResult,
};
use helios_annotations::types::{
    AnnotationDraft, AnnotationRecord, DeletionState, RecordFilter, SearchFilter,
};

/// A memory store whose inserts can be made to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_inserts: AtomicBool,
    insert_attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl AnnotationStore for FailingStore {
    fn backend_name(&self) -> &'static str {
        "failing-store"
    }

    async fn insert(&self, draft: AnnotationDraft) -> StoreResult<String> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                backend_name: "failing-store".to_string(),
                message: "injected write failure".to_string(),
                source: None,
            });
        }
        self.inner.insert(draft).await
    }

    async fn find(&self, image_id: &str, filter: RecordFilter) -> StoreResult<Vec<AnnotationRecord>> {
        self.inner.find(image_id, filter).await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AnnotationRecord>> {
        self.inner.find_by_id(id).await
    }

    async fn find_deletion_state(&self, id: &str) -> StoreResult<Option<DeletionState>> {
        self.inner.find_deletion_state(id).await
    }

    async fn find_for_search(
        &self,
        filter: &SearchFilter,
        skip: u64,
        limit: u32,
    ) -> StoreResult<(Vec<AnnotationRecord>, u64)> {
        self.inner.find_for_search(filter, skip, limit).await
    }

    async fn find_history(
        &self,
        image_id: &str,
        include_deleted: bool,
        skip: u64,
        limit: u32,
    ) -> StoreResult<Vec<AnnotationRecord>> {
        self.inner
            .find_history(image_id, include_deleted, skip, limit)
            .await
    }

    async fn soft_delete(&self, id: &str, deleted_by: &str) -> StoreResult<bool> {
        self.inner.soft_delete(id, deleted_by).await
    }

    async fn delete_all(&self, image_id: &str) -> StoreResult<u64> {
        self.inner.delete_all(image_id).await
    }
}

/// A counter that can be switched to refuse every operation.
#[derive(Debug, Default)]
pub struct FailingCounter {
    inner: MemoryVersionCounter,
    failing: AtomicBool,
}

impl FailingCounter {
    /// A counter that fails from the start.
    pub fn failing() -> Self {
        let counter = Self::default();
        counter.set_failing(true);
        counter
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> CounterResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CounterError::Unavailable {
                backend_name: "failing-counter".to_string(),
                message: "injected counter failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VersionCounter for FailingCounter {
    fn backend_name(&self) -> &'static str {
        "failing-counter"
    }

    async fn next_version(&self, image_id: &str) -> CounterResult<u64> {
        self.check()?;
        self.inner.next_version(image_id).await
    }

    async fn current_version(&self, image_id: &str) -> CounterResult<Option<u64>> {
        self.inner.current_version(image_id).await
    }

    async fn reset(&self, image_id: &str) -> CounterResult<()> {
        self.check()?;
        self.inner.reset(image_id).await
    }

    async fn health_check(&self) -> CounterResult<()> {
        self.check()
    }
}

/// A cache that fails every operation and counts the attempts.
#[derive(Debug, Default)]
pub struct FailingCache {
    puts: AtomicUsize,
    gets: AtomicUsize,
    invalidations: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    fn unavailable() -> CacheError {
        CacheError::Unavailable {
            message: "injected cache failure".to_string(),
        }
    }
}

#[async_trait]
impl CacheLayer for FailingCache {
    fn backend_name(&self) -> &'static str {
        "failing-cache"
    }

    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn invalidate(&self, _key: &str) -> CacheResult<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }
}
