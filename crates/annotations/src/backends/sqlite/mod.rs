//! SQLite backend implementation.
//!
//! [`SqliteBackend`] implements both the annotation store and the version
//! counter over an r2d2 pool of rusqlite connections. All database work runs
//! on tokio's blocking thread pool.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use helios_annotations::AnnotationService;
//! use helios_annotations::backends::memory::MemoryCache;
//! use helios_annotations::backends::sqlite::SqliteBackend;
//! use helios_annotations::config::ServiceConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Records and counters in one file
//! let backend = Arc::new(SqliteBackend::open("annotations.db")?);
//!
//! let service = AnnotationService::new(
//!     backend.clone(),
//!     backend,
//!     Arc::new(MemoryCache::new()),
//!     ServiceConfig::default(),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE annotations (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order
//!     id TEXT NOT NULL UNIQUE,
//!     image_id TEXT NOT NULL,
//!     user_id TEXT NOT NULL,
//!     version INTEGER NOT NULL,
//!     payload TEXT NOT NULL,                   -- JSON
//!     study_id TEXT,
//!     patient_id TEXT,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     is_deleted INTEGER NOT NULL DEFAULT 0,
//!     deleted_by TEXT,
//!     deleted_at TEXT
//! );
//!
//! CREATE TABLE version_counters (
//!     image_id TEXT PRIMARY KEY,
//!     version INTEGER NOT NULL
//! );
//! ```

mod backend;
mod counter;
pub(crate) mod schema;
mod store;

pub use backend::{SqliteBackend, SqliteBackendConfig};
