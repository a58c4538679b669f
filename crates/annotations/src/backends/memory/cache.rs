//! In-process cache implementations.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::MemoryCacheConfig;
use crate::core::CacheLayer;
use crate::error::{CacheError, CacheResult};

const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Bounded TTL cache held in memory.
///
/// Expiry is lazy: expired entries are dropped when read, and purged in bulk
/// only when a put finds the cache full.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: MemoryCacheConfig,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }
}

impl MemoryCache {
    /// Creates a cache with default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with the given configuration.
    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl).unwrap_or(now + MAX_TTL),
        };

        let mut entries = self.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired(now));
            debug!(purged = before - entries.len(), "Cache full, purged expired entries");

            if entries.len() >= self.config.max_entries {
                return Err(CacheError::CapacityExceeded {
                    max_entries: self.config.max_entries,
                });
            }
        }

        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a concurrent put already refreshed it.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Cache that stores nothing.
///
/// Every get is a miss. Used when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl CacheLayer for NoopCache {
    fn backend_name(&self) -> &'static str {
        "noop"
    }

    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn invalidate(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }
}
