//! Configuration for the annotation service and the in-memory cache.
//!
//! Both types deserialize with serde defaults, so a partial JSON document
//! (or none at all) yields a working configuration. Durations use humantime
//! strings such as `"1h"` or `"90s"`.
//!
//! ```
//! use std::time::Duration;
//! use helios_annotations::config::ServiceConfig;
//!
//! let config: ServiceConfig = serde_json::from_str(r#"{"cacheTtl": "15m"}"#).unwrap();
//! assert_eq!(config.cache_ttl, Duration::from_secs(900));
//! assert_eq!(config.default_limit, 10);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Service-level defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Page size used when a query does not set one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Largest accepted page size; larger requests are clamped.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Time-to-live of cached record snapshots.
    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub cache_ttl: Duration,
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

impl ServiceConfig {
    /// Sets the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the default and maximum page sizes.
    pub fn with_limits(mut self, default_limit: u32, max_limit: u32) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.default_limit == 0 {
            errors.push("Default limit cannot be 0".to_string());
        }

        if self.max_limit == 0 {
            errors.push("Max limit cannot be 0".to_string());
        }

        if self.default_limit > self.max_limit {
            errors.push("Default limit cannot exceed max limit".to_string());
        }

        if self.cache_ttl.is_zero() {
            errors.push("Cache TTL cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration for [`MemoryCache`](crate::backends::memory::MemoryCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCacheConfig {
    /// Maximum number of entries held at once.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    10_000
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
