//! Query parameters for the retrieval operations.
//!
//! The `*Query` types are what service callers build. The `*Filter` types are
//! the narrower shapes handed to the store once the service has resolved
//! pagination and defaults.

use serde::{Deserialize, Serialize};

use super::AnnotationRecord;
use super::pagination::PageRequest;

/// Parameters for retrieving the records of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageQuery {
    /// Restrict to one version.
    pub version: Option<u64>,

    /// Include soft-deleted records.
    pub include_deleted: bool,

    /// Keep the derived `metadata` field on returned records.
    ///
    /// Only [`AnnotationRecord::metadata`] is cleared when this is false. The
    /// payload is returned untouched, so any `metadata` object inside it still
    /// carries the study and patient identifiers.
    pub include_metadata: bool,
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self {
            version: None,
            include_deleted: false,
            include_metadata: true,
        }
    }
}

impl ImageQuery {
    /// Creates a query with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to one version.
    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets whether to include deleted records.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Sets whether to keep the derived metadata field on returned records.
    ///
    /// This never rewrites the payload.
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    /// The store filter for this query.
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            version: self.version,
            include_deleted: self.include_deleted,
        }
    }
}

/// Parameters for searching by clinical identifiers.
///
/// Absent identifiers do not constrain the search, so an empty query matches
/// every live record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Match this study id.
    pub study_id: Option<String>,
    /// Match this patient id.
    pub patient_id: Option<String>,
    /// Include soft-deleted records.
    #[serde(default)]
    pub include_deleted: bool,
    /// Page and page size.
    #[serde(default)]
    pub pagination: PageRequest,
}

impl SearchQuery {
    /// Creates an unconstrained query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters on study id.
    pub fn study_id(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    /// Filters on patient id.
    pub fn patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    /// Sets whether to include deleted records.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.pagination.page = page;
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    /// The store filter for this query.
    pub fn filter(&self) -> SearchFilter {
        SearchFilter {
            study_id: self.study_id.clone(),
            patient_id: self.patient_id.clone(),
            include_deleted: self.include_deleted,
        }
    }
}

/// Parameters for the version history of one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// Include soft-deleted versions.
    #[serde(default)]
    pub include_deleted: bool,
    /// Page and page size.
    #[serde(default)]
    pub pagination: PageRequest,
}

impl HistoryQuery {
    /// Creates a query for the first page with the default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to include deleted versions.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.pagination.page = page;
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.pagination.limit = Some(limit);
        self
    }
}

/// Store-level filter for per-image lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Restrict to one version.
    pub version: Option<u64>,
    /// Include soft-deleted records.
    pub include_deleted: bool,
}

impl RecordFilter {
    /// Live records of every version.
    pub fn live() -> Self {
        Self::default()
    }

    /// Every record, deleted or not.
    pub fn all() -> Self {
        Self {
            version: None,
            include_deleted: true,
        }
    }

    /// Returns true if the record passes the filter.
    pub fn matches(&self, record: &AnnotationRecord) -> bool {
        (self.include_deleted || !record.is_deleted)
            && self.version.is_none_or(|v| record.version == v)
    }
}

/// Store-level filter for clinical-identifier search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Match this study id.
    pub study_id: Option<String>,
    /// Match this patient id.
    pub patient_id: Option<String>,
    /// Include soft-deleted records.
    pub include_deleted: bool,
}

impl SearchFilter {
    /// Returns true if the record passes the filter.
    pub fn matches(&self, record: &AnnotationRecord) -> bool {
        (self.include_deleted || !record.is_deleted)
            && self
                .study_id
                .as_deref()
                .is_none_or(|s| record.study_id() == Some(s))
            && self
                .patient_id
                .as_deref()
                .is_none_or(|p| record.patient_id() == Some(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotationDraft, AnnotationMetadata, AnnotationRecord};
    use serde_json::json;

    fn record(version: u64, study: Option<&str>, patient: Option<&str>) -> AnnotationRecord {
        AnnotationDraft::new(
            "img-1",
            "user-a",
            version,
            json!({}),
            AnnotationMetadata::new(study.map(String::from), patient.map(String::from)),
        )
        .into_record(format!("r-{version}"))
    }

    #[test]
    fn test_image_query_defaults() {
        let query = ImageQuery::new();
        assert!(query.version.is_none());
        assert!(!query.include_deleted);
        assert!(query.include_metadata);
    }

    #[test]
    fn test_builders() {
        let query = SearchQuery::new().study_id("s-1").page(2).limit(5);
        assert_eq!(query.study_id.as_deref(), Some("s-1"));
        assert_eq!(query.pagination, PageRequest::new(2, 5));

        let history = HistoryQuery::new().include_deleted(true).limit(3);
        assert!(history.include_deleted);
        assert_eq!(history.pagination.page, 1);
        assert_eq!(history.pagination.limit, Some(3));
    }

    #[test]
    fn test_record_filter() {
        let mut rec = record(2, None, None);
        assert!(RecordFilter::live().matches(&rec));
        assert!(ImageQuery::new().version(2).filter().matches(&rec));
        assert!(!ImageQuery::new().version(1).filter().matches(&rec));

        rec.mark_deleted("admin", chrono::Utc::now());
        assert!(!RecordFilter::live().matches(&rec));
        assert!(RecordFilter::all().matches(&rec));
    }

    #[test]
    fn test_search_filter() {
        let rec = record(1, Some("s-1"), Some("p-1"));
        let other = record(2, Some("s-2"), None);

        let by_study = SearchQuery::new().study_id("s-1").filter();
        assert!(by_study.matches(&rec));
        assert!(!by_study.matches(&other));

        let both = SearchQuery::new().study_id("s-1").patient_id("p-2").filter();
        assert!(!both.matches(&rec));

        let unconstrained = SearchFilter::default();
        assert!(unconstrained.matches(&rec));
        assert!(unconstrained.matches(&other));
    }
}
