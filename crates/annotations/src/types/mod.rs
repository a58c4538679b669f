//! Core types for the annotation engine.
//!
//! - [`AnnotationRecord`], [`AnnotationDraft`], [`AnnotationMetadata`] - the record model
//! - [`ImageQuery`], [`SearchQuery`], [`HistoryQuery`] - caller-facing query parameters
//! - [`PageRequest`], [`SearchPage`] - pagination
//!
//! # Examples
//!
//! ```
//! use helios_annotations::types::{AnnotationDraft, AnnotationMetadata};
//! use serde_json::json;
//!
//! let payload = json!({
//!     "shapes": [{"kind": "ellipse", "cx": 10, "cy": 12}],
//!     "metadata": {"studyId": "study-1"}
//! });
//! let metadata = AnnotationMetadata::from_payload(&payload);
//! let record = AnnotationDraft::new("img-1", "dr-house", 1, payload, metadata)
//!     .into_record("b3c1");
//!
//! assert_eq!(record.version, 1);
//! assert_eq!(record.study_id(), Some("study-1"));
//! assert!(!record.is_deleted);
//! ```

mod pagination;
mod query;
mod record;

pub use pagination::{PageRequest, PageWindow, SearchPage};
pub use query::{HistoryQuery, ImageQuery, RecordFilter, SearchFilter, SearchQuery};
pub use record::{
    AnnotationDraft, AnnotationMetadata, AnnotationRecord, CreatedAnnotation, DeletionState,
};
