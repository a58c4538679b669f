//! Version counter trait.

use async_trait::async_trait;

use crate::error::CounterResult;

/// Atomic per-image version counter.
///
/// Implementations must guarantee that concurrent
/// [`next_version`](Self::next_version) calls for the same image never return
/// the same value. Values are never handed back: a caller that fails after
/// incrementing leaves a gap.
#[async_trait]
pub trait VersionCounter: Send + Sync {
    /// Returns a human-readable name for this counter backend.
    fn backend_name(&self) -> &'static str;

    /// Increments and returns the counter for an image.
    ///
    /// The first call for an image returns 1.
    ///
    /// # Errors
    ///
    /// * `CounterError::Unavailable` - If the substrate refused the increment
    /// * `CounterError::Overflow` - If the counter is already at `u64::MAX`
    async fn next_version(&self, image_id: &str) -> CounterResult<u64>;

    /// Returns the last issued value, or `None` if none was issued.
    async fn current_version(&self, image_id: &str) -> CounterResult<Option<u64>>;

    /// Drops the counter for an image so the next version starts at 1.
    async fn reset(&self, image_id: &str) -> CounterResult<()>;

    /// Verifies the counter substrate is reachable.
    async fn health_check(&self) -> CounterResult<()> {
        Ok(())
    }
}
