//! Backend implementations of the collaborator traits.
//!
//! # Available Backends
//!
//! | Backend | Feature | Provides |
//! |---------|---------|----------|
//! | Memory | always | store, counter, cache |
//! | SQLite | `sqlite` (default) | store, counter |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! use helios_annotations::backends::sqlite::SqliteBackend;
//!
//! # #[cfg(feature = "sqlite")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory database, schema created on open
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Or a file-based database
//! let backend = SqliteBackend::open("./data/annotations.db")?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
