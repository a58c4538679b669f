//! Service construction helpers and the cross-backend test macro.

use std::sync::Arc;

use helios_annotations::AnnotationService;
use helios_annotations::backends::memory::{MemoryCache, MemoryStore, MemoryVersionCounter};
use helios_annotations::config::ServiceConfig;
use helios_annotations::core::{DynCache, DynCounter, DynStore};

/// A service over in-memory store, counter and cache.
pub fn memory_service() -> AnnotationService {
    AnnotationService::in_memory()
}

/// A service over an in-memory SQLite database used as both store and
/// counter, with an in-memory cache.
#[cfg(feature = "sqlite")]
pub fn sqlite_service() -> AnnotationService {
    use helios_annotations::backends::sqlite::SqliteBackend;

    let backend = Arc::new(SqliteBackend::in_memory().expect("Failed to create SQLite backend"));
    AnnotationService::new(
        backend.clone(),
        backend,
        Arc::new(MemoryCache::new()),
        ServiceConfig::default(),
    )
}

/// A service over the given collaborators with default configuration.
pub fn service_with(store: DynStore, counter: DynCounter, cache: DynCache) -> AnnotationService {
    AnnotationService::new(store, counter, cache, ServiceConfig::default())
}

/// Memory collaborators the test keeps handles to.
pub struct MemoryParts {
    pub store: Arc<MemoryStore>,
    pub counter: Arc<MemoryVersionCounter>,
    pub cache: Arc<MemoryCache>,
}

impl MemoryParts {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            counter: Arc::new(MemoryVersionCounter::new()),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    pub fn service(&self) -> AnnotationService {
        service_with(self.store.clone(), self.counter.clone(), self.cache.clone())
    }
}

/// Runs an `async fn(Arc<AnnotationService>)` scenario against each backend.
///
/// Generates `memory_<name>` and, with the `sqlite` feature, `sqlite_<name>`.
#[macro_export]
macro_rules! service_test {
    ($test_name:ident, $test_fn:expr) => {
        paste::paste! {
            #[tokio::test]
            async fn [<memory_ $test_name>]() {
                let service = std::sync::Arc::new($crate::common::memory_service());
                let test_fn = $test_fn;
                test_fn(service).await;
            }

            #[cfg(feature = "sqlite")]
            #[tokio::test]
            async fn [<sqlite_ $test_name>]() {
                let service = std::sync::Arc::new($crate::common::sqlite_service());
                let test_fn = $test_fn;
                test_fn(service).await;
            }
        }
    };
}
