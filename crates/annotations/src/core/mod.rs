//! Collaborator traits.
//!
//! The [`AnnotationService`](crate::AnnotationService) orchestrates three
//! collaborators, each behind its own trait:
//!
//! - [`VersionCounter`] - atomic per-image version numbers
//! - [`AnnotationStore`] - durable record storage
//! - [`CacheLayer`] - best-effort TTL cache
//!
//! The counter and the store are not transactionally joined. A create that
//! increments the counter and then fails to insert leaves a version gap,
//! which is tolerated.

mod cache;
mod counter;
mod store;

use std::sync::Arc;

pub use cache::CacheLayer;
pub use counter::VersionCounter;
pub use store::AnnotationStore;

/// Shared handle to a store.
pub type DynStore = Arc<dyn AnnotationStore>;

/// Shared handle to a counter.
pub type DynCounter = Arc<dyn VersionCounter>;

/// Shared handle to a cache.
pub type DynCache = Arc<dyn CacheLayer>;
