//! The annotation service.
//!
//! [`AnnotationService`] is the only component callers talk to. It
//! coordinates three collaborators:
//!
//! - **Version counter**: asked for the next version before anything is
//!   written. Its failure aborts a create.
//! - **Store**: the source of truth. Its failures reach the caller.
//! - **Cache**: written after a successful insert and consulted by
//!   [`get_by_id`](AnnotationService::get_by_id) for the immutable fields of
//!   a record; deletion state always comes from the store. Its failures are
//!   logged and swallowed.
//!
//! The counter and the store are not joined by a transaction. If the insert
//! fails after the increment, that version number is never used.
//!
//! # Example
//!
//! ```
//! use helios_annotations::AnnotationService;
//! use helios_annotations::types::{HistoryQuery, ImageQuery};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let service = AnnotationService::in_memory();
//!
//! let first = service
//!     .create("img-1", json!({"shapes": [{"kind": "arrow"}]}), "dr-a")
//!     .await
//!     .unwrap();
//! let second = service
//!     .create("img-1", json!({"shapes": []}), "dr-b")
//!     .await
//!     .unwrap();
//! assert_eq!((first.version, second.version), (1, 2));
//!
//! let records = service
//!     .get_for_image("img-1", &ImageQuery::new())
//!     .await
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(records.len(), 2);
//!
//! let history = service.get_history("img-1", &HistoryQuery::new()).await.unwrap();
//! assert_eq!(history[0].version, 2);
//! # });
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::backends::memory::{MemoryCache, MemoryStore, MemoryVersionCounter};
use crate::config::ServiceConfig;
use crate::core::{DynCache, DynCounter, DynStore};
use crate::error::{AnnotationResult, ValidationError};
use crate::types::{
    AnnotationDraft, AnnotationMetadata, AnnotationRecord, CreatedAnnotation, HistoryQuery,
    ImageQuery, PageRequest, PageWindow, RecordFilter, SearchPage, SearchQuery,
};

/// Orchestrates version assignment, persistence and caching of annotation
/// records.
///
/// The service holds no locks of its own and is meant to be shared through
/// an [`Arc`].
pub struct AnnotationService {
    store: DynStore,
    counter: DynCounter,
    cache: DynCache,
    config: ServiceConfig,
}

impl std::fmt::Debug for AnnotationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationService")
            .field("store", &self.store.backend_name())
            .field("counter", &self.counter.backend_name())
            .field("cache", &self.cache.backend_name())
            .field("config", &self.config)
            .finish()
    }
}

impl AnnotationService {
    /// Creates a service over the given collaborators.
    pub fn new(store: DynStore, counter: DynCounter, cache: DynCache, config: ServiceConfig) -> Self {
        Self {
            store,
            counter,
            cache,
            config,
        }
    }

    /// Creates a service backed entirely by in-memory collaborators.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryVersionCounter::new()),
            Arc::new(MemoryCache::new()),
            ServiceConfig::default(),
        )
    }

    /// Returns the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Returns the underlying version counter.
    pub fn counter(&self) -> &DynCounter {
        &self.counter
    }

    /// Creates a new annotation version for an image.
    ///
    /// Search metadata is read from the payload's optional top-level
    /// `metadata` object (see [`AnnotationMetadata::from_payload`]).
    ///
    /// # Errors
    ///
    /// * `ValidationError` - blank `image_id`/`user_id` or a null payload
    /// * `CounterError` - no version could be assigned; nothing was written
    /// * `StoreError` - the record was not persisted; the assigned version
    ///   stays unused
    pub async fn create(
        &self,
        image_id: &str,
        payload: Value,
        user_id: &str,
    ) -> AnnotationResult<CreatedAnnotation> {
        let metadata = AnnotationMetadata::from_payload(&payload);
        self.create_with_metadata(image_id, payload, user_id, metadata)
            .await
    }

    /// Creates a new annotation version with explicit search metadata.
    #[instrument(skip(self, payload, metadata), fields(image_id = %image_id, user_id = %user_id))]
    pub async fn create_with_metadata(
        &self,
        image_id: &str,
        payload: Value,
        user_id: &str,
        metadata: Option<AnnotationMetadata>,
    ) -> AnnotationResult<CreatedAnnotation> {
        require("image_id", image_id)?;
        require("user_id", user_id)?;
        if payload.is_null() {
            return Err(ValidationError::InvalidPayload {
                message: "payload cannot be null".to_string(),
            }
            .into());
        }

        let version = self.counter.next_version(image_id).await?;

        let draft = AnnotationDraft::new(image_id, user_id, version, payload, metadata);
        let snapshot_source = draft.clone();

        let id = match self.store.insert(draft).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    version,
                    error = %e,
                    "Store write failed after version was assigned; version left unused"
                );
                return Err(e.into());
            }
        };

        let record = snapshot_source.into_record(id.clone());
        self.cache_snapshot(&record).await;

        info!(record_id = %id, version, "Created annotation");
        Ok(CreatedAnnotation { id, version })
    }

    /// Returns the records of one image.
    ///
    /// `Ok(None)` means nothing matched and is the normal not-found result;
    /// a returned list is never empty. With `include_metadata` off only the
    /// derived metadata field is dropped; payloads are never rewritten.
    #[instrument(skip(self, query), fields(image_id = %image_id))]
    pub async fn get_for_image(
        &self,
        image_id: &str,
        query: &ImageQuery,
    ) -> AnnotationResult<Option<Vec<AnnotationRecord>>> {
        require("image_id", image_id)?;

        let mut records = self.store.find(image_id, query.filter()).await?;
        debug!(count = records.len(), "Fetched image annotations");

        if records.is_empty() {
            return Ok(None);
        }

        if !query.include_metadata {
            for record in &mut records {
                record.metadata = None;
            }
        }

        Ok(Some(records))
    }

    /// Reads one record by id, consulting the cache first.
    ///
    /// A cached snapshot supplies the immutable fields only. Its deletion
    /// state is always re-read from the store, so a record deleted or purged
    /// through another service instance is never served stale. A miss, a
    /// cache failure and an undecodable snapshot all fall back to a full
    /// store read, after which the cache is repopulated.
    #[instrument(skip(self), fields(record_id = %record_id))]
    pub async fn get_by_id(&self, record_id: &str) -> AnnotationResult<Option<AnnotationRecord>> {
        require("record_id", record_id)?;

        if let Some(mut record) = self.cached_snapshot(record_id).await {
            let Some(state) = self.store.find_deletion_state(record_id).await? else {
                debug!("Cached record no longer in store");
                self.invalidate_cached(record_id).await;
                return Ok(None);
            };

            if record.deletion_state() != state {
                debug!("Refreshing stale deletion state of cached snapshot");
                record.apply_deletion_state(state);
                self.cache_snapshot(&record).await;
            } else {
                debug!("Cache hit");
            }
            return Ok(Some(record));
        }

        let record = self.store.find_by_id(record_id).await?;
        if let Some(record) = &record {
            self.cache_snapshot(record).await;
        }
        Ok(record)
    }

    /// Searches records by study and/or patient id.
    ///
    /// `total_count` counts every match before pagination, and `total_pages`
    /// is derived from it.
    #[instrument(skip(self, query), fields(study_id = ?query.study_id, patient_id = ?query.patient_id))]
    pub async fn search(&self, query: &SearchQuery) -> AnnotationResult<SearchPage<AnnotationRecord>> {
        let window = self.resolve_page(&query.pagination)?;

        let (records, total) = self
            .store
            .find_for_search(&query.filter(), window.skip(), window.limit)
            .await?;
        debug!(total, returned = records.len(), "Search complete");

        Ok(SearchPage::new(records, total, window))
    }

    /// Returns one page of an image's versions, highest version first.
    ///
    /// No total is reported; callers page until a short page comes back.
    #[instrument(skip(self, query), fields(image_id = %image_id))]
    pub async fn get_history(
        &self,
        image_id: &str,
        query: &HistoryQuery,
    ) -> AnnotationResult<Vec<AnnotationRecord>> {
        require("image_id", image_id)?;
        let window = self.resolve_page(&query.pagination)?;

        let records = self
            .store
            .find_history(image_id, query.include_deleted, window.skip(), window.limit)
            .await?;
        debug!(count = records.len(), "Fetched history page");

        Ok(records)
    }

    /// Soft-deletes one record.
    ///
    /// Returns `false` if the record does not exist or was already deleted.
    #[instrument(skip(self), fields(record_id = %record_id, user_id = %user_id))]
    pub async fn soft_delete(&self, record_id: &str, user_id: &str) -> AnnotationResult<bool> {
        require("record_id", record_id)?;
        require("user_id", user_id)?;

        let deleted = self.store.soft_delete(record_id, user_id).await?;
        if deleted {
            self.invalidate_cached(record_id).await;
            info!("Soft-deleted annotation");
        } else {
            debug!("Nothing to soft-delete");
        }

        Ok(deleted)
    }

    /// Physically removes every record of an image and resets its counter.
    ///
    /// Returns the number of records removed. The next create for the image
    /// starts again at version 1.
    #[instrument(skip(self), fields(image_id = %image_id))]
    pub async fn delete_all_for_image(&self, image_id: &str) -> AnnotationResult<u64> {
        require("image_id", image_id)?;

        let ids: Vec<String> = self
            .store
            .find(image_id, RecordFilter::all())
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let removed = self.store.delete_all(image_id).await?;

        for id in &ids {
            self.invalidate_cached(id).await;
        }

        if let Err(e) = self.counter.reset(image_id).await {
            warn!(error = %e, removed, "Records removed but version counter reset failed");
            return Err(e.into());
        }

        info!(removed, "Removed all annotations for image");
        Ok(removed)
    }

    /// Checks that the store and the counter are reachable.
    pub async fn health_check(&self) -> AnnotationResult<()> {
        self.store.health_check().await?;
        self.counter.health_check().await?;
        Ok(())
    }

    fn resolve_page(&self, request: &PageRequest) -> AnnotationResult<PageWindow> {
        let window = request.resolve(self.config.default_limit, self.config.max_limit)?;
        if window.clamped {
            debug!(
                requested = ?request.limit,
                max_limit = self.config.max_limit,
                "Clamped page size"
            );
        }
        Ok(window)
    }

    async fn cached_snapshot(&self, record_id: &str) -> Option<AnnotationRecord> {
        match self.cache.get(record_id).await {
            Ok(Some(snapshot)) => match serde_json::from_str::<AnnotationRecord>(&snapshot) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Discarding undecodable cache snapshot");
                    self.invalidate_cached(record_id).await;
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache read failed; falling back to store");
                None
            }
        }
    }

    async fn cache_snapshot(&self, record: &AnnotationRecord) {
        let snapshot = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Failed to serialize cache snapshot");
                return;
            }
        };

        if let Err(e) = self
            .cache
            .put(&record.id, snapshot, self.config.cache_ttl)
            .await
        {
            warn!(record_id = %record.id, error = %e, "Failed to cache annotation snapshot");
        }
    }

    async fn invalidate_cached(&self, record_id: &str) {
        if let Err(e) = self.cache.invalidate(record_id).await {
            warn!(record_id = %record_id, error = %e, "Failed to invalidate cached snapshot");
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingRequiredField {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}
