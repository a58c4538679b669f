//! Cache layer trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Key/value cache with per-entry TTL.
///
/// The cache holds serialized record snapshots keyed by record id. It is an
/// accelerator only: losing an entry never affects correctness, and callers
/// treat every error as a miss.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Returns a human-readable name for this cache backend.
    fn backend_name(&self) -> &'static str;

    /// Stores a value that expires after `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Returns the value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Removes the entry immediately.
    async fn invalidate(&self, key: &str) -> CacheResult<()>;
}
