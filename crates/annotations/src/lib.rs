//! Helios Image Annotation Store
//!
//! This crate stores versioned annotation records for medical images. Every
//! save creates a new immutable version, older versions stay available as
//! history, and deletion is a soft delete that keeps the record for audit.
//!
//! # Features
//!
//! - **Per-image versions**: an atomic counter hands out strictly increasing
//!   version numbers, safe under concurrent writers
//! - **Soft delete**: records are flagged with who deleted them and when,
//!   never silently removed
//! - **Queries**: by image (optionally one version), by study/patient id with
//!   page totals, and by version history
//! - **Best-effort cache**: record snapshots are cached with a TTL; cache
//!   failures never fail an operation
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite store and counter with in-memory and file modes
//!
//! In-memory store, counter and cache backends are always available.
//!
//! # Quick Start
//!
//! ```
//! use helios_annotations::AnnotationService;
//! use helios_annotations::types::{ImageQuery, SearchQuery};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let service = AnnotationService::in_memory();
//!
//! let created = service
//!     .create(
//!         "img-42",
//!         json!({
//!             "shapes": [{"kind": "polygon", "points": [[0, 0], [4, 0], [4, 3]]}],
//!             "metadata": {"studyId": "study-1", "patientId": "patient-9"}
//!         }),
//!         "radiologist-7",
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(created.version, 1);
//!
//! let page = service
//!     .search(&SearchQuery::new().patient_id("patient-9"))
//!     .await
//!     .unwrap();
//! assert_eq!(page.total_count, 1);
//!
//! assert!(service.soft_delete(&created.id, "radiologist-7").await.unwrap());
//! assert!(service
//!     .get_for_image("img-42", &ImageQuery::new())
//!     .await
//!     .unwrap()
//!     .is_none());
//! # });
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    ┌───────────────────┐
//!                    │ AnnotationService │
//!                    └─────────┬─────────┘
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │ VersionCounter  │ │ AnnotationStore │ │   CacheLayer    │
//! │ (atomic, fatal) │ │ (durable, fatal)│ │ (best-effort)   │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod service;
pub mod types;

pub use config::ServiceConfig;
pub use error::{AnnotationError, AnnotationResult};
pub use service::AnnotationService;
pub use types::{AnnotationRecord, CreatedAnnotation};

pub use crate::core::{AnnotationStore, CacheLayer, VersionCounter};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
