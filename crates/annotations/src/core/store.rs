//! Annotation store trait.
//!
//! This module defines [`AnnotationStore`], the durable source of truth for
//! every annotation record ever created.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{AnnotationDraft, AnnotationRecord, DeletionState, RecordFilter, SearchFilter};

/// Durable, queryable collection of annotation records.
///
/// The store is append-mostly: records are inserted once, may be soft-deleted
/// once, and are physically removed only by [`delete_all`](Self::delete_all).
/// It has no knowledge of the version counter; versions arrive already
/// assigned on the draft.
///
/// # Ordering
///
/// Unless stated otherwise, results come back in insertion order.
///
/// # Example
///
/// ```
/// use helios_annotations::backends::memory::MemoryStore;
/// use helios_annotations::core::AnnotationStore;
/// use helios_annotations::types::{AnnotationDraft, RecordFilter};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let draft = AnnotationDraft::new("img-1", "user-a", 1, json!({"shapes": []}), None);
/// let id = store.insert(draft).await.unwrap();
///
/// let records = store.find("img-1", RecordFilter::live()).await.unwrap();
/// assert_eq!(records[0].id, id);
///
/// assert!(store.soft_delete(&id, "user-a").await.unwrap());
/// assert!(!store.soft_delete(&id, "user-a").await.unwrap());
/// # });
/// ```
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Returns a human-readable name for this store backend.
    fn backend_name(&self) -> &'static str;

    /// Persists a new record and returns its generated id.
    ///
    /// # Errors
    ///
    /// * `StoreError::WriteFailed` - If the record was not durably committed.
    ///   Nothing is partially written.
    async fn insert(&self, draft: AnnotationDraft) -> StoreResult<String>;

    /// Returns the records of one image that pass the filter.
    ///
    /// No match is an empty list, not an error.
    async fn find(&self, image_id: &str, filter: RecordFilter) -> StoreResult<Vec<AnnotationRecord>>;

    /// Reads one record by id, deleted or not.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AnnotationRecord>>;

    /// Reads only the soft-delete fields of one record.
    ///
    /// `None` means the record no longer exists. Used to revalidate cached
    /// snapshots, so backends should answer without decoding the payload.
    async fn find_deletion_state(&self, id: &str) -> StoreResult<Option<DeletionState>> {
        Ok(self.find_by_id(id).await?.map(|r| r.deletion_state()))
    }

    /// Returns one page of records matching the filter and the total number
    /// of matching records before pagination.
    async fn find_for_search(
        &self,
        filter: &SearchFilter,
        skip: u64,
        limit: u32,
    ) -> StoreResult<(Vec<AnnotationRecord>, u64)>;

    /// Returns one page of an image's history, highest version first.
    ///
    /// Records sharing a version are ordered newest insertion first.
    async fn find_history(
        &self,
        image_id: &str,
        include_deleted: bool,
        skip: u64,
        limit: u32,
    ) -> StoreResult<Vec<AnnotationRecord>>;

    /// Marks one live record as deleted.
    ///
    /// The check and the update happen as one atomic step. Returns `false` if
    /// no record has this id or it was already deleted.
    async fn soft_delete(&self, id: &str, deleted_by: &str) -> StoreResult<bool>;

    /// Physically removes every record of an image, returning how many were
    /// removed.
    async fn delete_all(&self, image_id: &str) -> StoreResult<u64>;

    /// Verifies the store is reachable.
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
