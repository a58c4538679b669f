//! In-process annotation store.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::core::AnnotationStore;
use crate::error::StoreResult;
use crate::types::{
    AnnotationDraft, AnnotationRecord, DeletionState, RecordFilter, SearchFilter,
};

/// Annotation store held in memory.
///
/// Records live in an insertion-ordered vector behind a read/write lock, so
/// insertion order falls out of iteration order. Nothing survives the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AnnotationRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, deleted ones included.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, draft: AnnotationDraft) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.records.write().push(draft.into_record(id.clone()));
        Ok(id)
    }

    async fn find(&self, image_id: &str, filter: RecordFilter) -> StoreResult<Vec<AnnotationRecord>> {
        let records = self.records.read();
        Ok(records
            .iter()
            .filter(|r| r.image_id == image_id && filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AnnotationRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn find_deletion_state(&self, id: &str) -> StoreResult<Option<DeletionState>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.id == id)
            .map(AnnotationRecord::deletion_state))
    }

    async fn find_for_search(
        &self,
        filter: &SearchFilter,
        skip: u64,
        limit: u32,
    ) -> StoreResult<(Vec<AnnotationRecord>, u64)> {
        let records = self.records.read();
        let matching: Vec<&AnnotationRecord> = records.iter().filter(|r| filter.matches(r)).collect();
        let total = matching.len() as u64;

        let page = matching
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn find_history(
        &self,
        image_id: &str,
        include_deleted: bool,
        skip: u64,
        limit: u32,
    ) -> StoreResult<Vec<AnnotationRecord>> {
        let records = self.records.read();

        // Reverse insertion order first so the stable sort leaves ties newest-first.
        let mut history: Vec<&AnnotationRecord> = records
            .iter()
            .rev()
            .filter(|r| r.image_id == image_id && (include_deleted || !r.is_deleted))
            .collect();
        history.sort_by(|a, b| b.version.cmp(&a.version));

        Ok(history
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, id: &str, deleted_by: &str) -> StoreResult<bool> {
        let mut records = self.records.write();
        let deleted = records
            .iter_mut()
            .find(|r| r.id == id)
            .is_some_and(|r| r.mark_deleted(deleted_by, Utc::now()));
        Ok(deleted)
    }

    async fn delete_all(&self, image_id: &str) -> StoreResult<u64> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.image_id != image_id);
        let removed = (before - records.len()) as u64;
        debug!(image_id = %image_id, removed, "Removed image records from memory store");
        Ok(removed)
    }
}
