//! Error types for the annotation engine.
//!
//! Errors are split by the collaborator that produced them. Store and counter
//! failures are fatal and reach the caller through [`AnnotationError`]. Cache
//! failures have their own [`CacheError`] type with no conversion
//! into [`AnnotationError`]: the service logs and swallows them.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The error type returned by every [`AnnotationService`](crate::AnnotationService) operation.
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// Caller input errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Annotation store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Version counter errors
    #[error(transparent)]
    Counter(#[from] CounterError),
}

impl AnnotationError {
    /// Returns true if the error was caused by caller input rather than a
    /// failing collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(self, AnnotationError::Validation(_))
    }
}

/// Errors related to caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required identifier was missing or blank.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The annotation payload cannot be stored.
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },

    /// Page or limit outside the accepted range.
    #[error("invalid pagination: {message}")]
    InvalidPagination { message: String },
}

/// Errors originating from the annotation store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("annotation store unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// A write was not durably committed.
    #[error("annotation store write failed in {backend_name}: {message}")]
    WriteFailed {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A read query failed.
    #[error("annotation store query failed in {backend_name}: {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
    },

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// Errors originating from the version counter.
#[derive(Error, Debug)]
pub enum CounterError {
    /// The counter substrate could not be reached or refused the increment.
    #[error("version counter unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// The counter for an image cannot be incremented further.
    #[error("version counter overflow for image {image_id}")]
    Overflow { image_id: String },
}

/// Errors originating from the cache layer.
///
/// These never reach service callers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache could not be reached.
    #[error("cache unavailable: {message}")]
    Unavailable { message: String },

    /// The cache is full and the entry was not stored.
    #[error("cache capacity of {max_entries} entries exceeded")]
    CapacityExceeded { max_entries: usize },

    /// A snapshot could not be encoded.
    #[error("cache serialization error: {message}")]
    Serialization { message: String },
}

/// Result type alias for service operations.
pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for counter operations.
pub type CounterResult<T> = Result<T, CounterError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for CounterError {
    fn from(err: rusqlite::Error) -> Self {
        CounterError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for CounterError {
    fn from(err: r2d2::Error) -> Self {
        CounterError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: format!("blocking task failed: {}", err),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<tokio::task::JoinError> for CounterError {
    fn from(err: tokio::task::JoinError) -> Self {
        CounterError::Unavailable {
            backend_name: "sqlite".to_string(),
            message: format!("blocking task failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = AnnotationError::Validation(ValidationError::MissingRequiredField {
            field: "image_id".to_string(),
        });
        assert_eq!(err.to_string(), "missing required field: image_id");
        assert!(err.is_validation());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::WriteFailed {
            backend_name: "sqlite".to_string(),
            message: "disk full".to_string(),
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "annotation store write failed in sqlite: disk full"
        );
    }

    #[test]
    fn test_counter_error_converts() {
        let err: AnnotationError = CounterError::Overflow {
            image_id: "img-1".to_string(),
        }
        .into();
        assert!(matches!(err, AnnotationError::Counter(_)));
        assert!(!err.is_validation());
        assert!(err.to_string().contains("img-1"));
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::CapacityExceeded { max_entries: 4 };
        assert_eq!(err.to_string(), "cache capacity of 4 entries exceeded");
    }

    #[test]
    fn test_serde_error_becomes_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }
}
