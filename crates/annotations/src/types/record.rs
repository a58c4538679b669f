//! Annotation record types.
//!
//! This module defines [`AnnotationRecord`], one immutable versioned set of
//! markup for one image, together with the [`AnnotationDraft`] it is built
//! from before the store assigns an id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Clinical identifiers used by search filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationMetadata {
    /// Study the annotated image belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,

    /// Patient the annotated image belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

impl AnnotationMetadata {
    /// Creates metadata from optional identifiers.
    ///
    /// Returns `None` when both identifiers are absent or blank.
    pub fn new(study_id: Option<String>, patient_id: Option<String>) -> Option<Self> {
        Self {
            study_id: study_id.filter(|s| !s.trim().is_empty()),
            patient_id: patient_id.filter(|s| !s.trim().is_empty()),
        }
        .normalized()
    }

    /// Reads the optional top-level `metadata` object of a payload.
    ///
    /// Only string `studyId` and `patientId` members are considered; anything
    /// else in the payload is left alone.
    ///
    /// ```
    /// use helios_annotations::types::AnnotationMetadata;
    /// use serde_json::json;
    ///
    /// let payload = json!({
    ///     "shapes": [],
    ///     "metadata": {"studyId": "study-7", "patientId": "pat-3"}
    /// });
    /// let metadata = AnnotationMetadata::from_payload(&payload).unwrap();
    /// assert_eq!(metadata.study_id.as_deref(), Some("study-7"));
    ///
    /// assert!(AnnotationMetadata::from_payload(&json!({"shapes": []})).is_none());
    /// ```
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let metadata = payload.get("metadata")?;
        let field = |name: &str| metadata.get(name).and_then(Value::as_str).map(String::from);
        Self::new(field("studyId"), field("patientId"))
    }

    /// Returns true when neither identifier is set.
    pub fn is_empty(&self) -> bool {
        self.study_id.is_none() && self.patient_id.is_none()
    }

    fn normalized(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

/// An annotation record before the store has assigned its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDraft {
    /// The annotated image.
    pub image_id: String,
    /// The creating user.
    pub user_id: String,
    /// Version already assigned by the counter.
    pub version: u64,
    /// Annotation content.
    pub payload: Value,
    /// Optional clinical identifiers.
    pub metadata: Option<AnnotationMetadata>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at` for a new record.
    pub updated_at: DateTime<Utc>,
}

impl AnnotationDraft {
    /// Creates a draft stamped with the current time.
    pub fn new(
        image_id: impl Into<String>,
        user_id: impl Into<String>,
        version: u64,
        payload: Value,
        metadata: Option<AnnotationMetadata>,
    ) -> Self {
        let now = Utc::now();
        Self {
            image_id: image_id.into(),
            user_id: user_id.into(),
            version,
            payload,
            metadata: metadata.and_then(AnnotationMetadata::normalized),
            created_at: now,
            updated_at: now,
        }
    }

    /// Turns the draft into a live record with the given id.
    pub fn into_record(self, id: impl Into<String>) -> AnnotationRecord {
        AnnotationRecord {
            id: id.into(),
            image_id: self.image_id,
            user_id: self.user_id,
            version: self.version,
            payload: self.payload,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: false,
            deleted_by: None,
            deleted_at: None,
        }
    }
}

/// One versioned set of annotations for one image.
///
/// Records are immutable except for the soft-delete fields, which move from
/// unset to set at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    /// Store-assigned opaque id.
    pub id: String,

    /// The annotated image.
    pub image_id: String,

    /// The user who created this version.
    pub user_id: String,

    /// Per-image version, assigned once at creation.
    pub version: u64,

    /// Caller-owned annotation content (shapes, labels, measurements).
    pub payload: Value,

    /// Optional clinical identifiers.
    #[serde(default)]
    pub metadata: Option<AnnotationMetadata>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// Last modification; only a soft delete moves it.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,

    /// Who soft-deleted the record.
    #[serde(default)]
    pub deleted_by: Option<String>,

    /// When the record was soft-deleted.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AnnotationRecord {
    /// Marks the record deleted.
    ///
    /// Returns false without touching the record if it was already deleted.
    pub fn mark_deleted(&mut self, deleted_by: &str, at: DateTime<Utc>) -> bool {
        if self.is_deleted {
            return false;
        }
        self.is_deleted = true;
        self.deleted_by = Some(deleted_by.to_string());
        self.deleted_at = Some(at);
        self.updated_at = at;
        true
    }

    /// Returns the soft-delete fields of the record.
    pub fn deletion_state(&self) -> DeletionState {
        DeletionState {
            is_deleted: self.is_deleted,
            deleted_by: self.deleted_by.clone(),
            deleted_at: self.deleted_at,
            updated_at: self.updated_at,
        }
    }

    /// Overwrites the soft-delete fields with the given state.
    pub fn apply_deletion_state(&mut self, state: DeletionState) {
        self.is_deleted = state.is_deleted;
        self.deleted_by = state.deleted_by;
        self.deleted_at = state.deleted_at;
        self.updated_at = state.updated_at;
    }

    /// Returns the study id, if any.
    pub fn study_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.study_id.as_deref())
    }

    /// Returns the patient id, if any.
    pub fn patient_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.patient_id.as_deref())
    }
}

/// The only part of a stored record that changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionState {
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Who soft-deleted the record.
    pub deleted_by: Option<String>,
    /// When the record was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// The outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAnnotation {
    /// Store-assigned record id.
    pub id: String,
    /// Version assigned to the record.
    pub version: u64,
}
