//! Command-line configuration.
//!
//! Every global option can also be set from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ANNOTATIONS_BACKEND` | sqlite | Storage backend (`memory` or `sqlite`) |
//! | `ANNOTATIONS_DATABASE` | annotations.db | SQLite database holding the records |
//! | `ANNOTATIONS_COUNTER_DATABASE` | (same as database) | SQLite database holding version counters |
//! | `ANNOTATIONS_CACHE_TTL` | 1h | Snapshot cache TTL |
//! | `ANNOTATIONS_CACHE_MAX_ENTRIES` | 10000 | Snapshot cache capacity |
//! | `ANNOTATIONS_DISABLE_CACHE` | false | Turn the snapshot cache off |
//! | `ANNOTATIONS_DEFAULT_PAGE_SIZE` | 10 | Page size when none is given |
//! | `ANNOTATIONS_MAX_PAGE_SIZE` | 100 | Largest accepted page size |
//! | `ANNOTATIONS_LOG_LEVEL` | warn | Log level |

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use helios_annotations::config::{MemoryCacheConfig, ServiceConfig};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Everything in process memory; lost on exit.
    Memory,
    /// SQLite database files.
    Sqlite,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone, Parser)]
#[command(name = "hfs-annotations")]
#[command(about = "Versioned image annotation store", version)]
pub struct CliConfig {
    /// Storage backend.
    #[arg(long, env = "ANNOTATIONS_BACKEND", value_enum, default_value = "sqlite")]
    pub backend: BackendKind,

    /// SQLite database file for records.
    #[arg(long, env = "ANNOTATIONS_DATABASE", default_value = "annotations.db")]
    pub database: String,

    /// SQLite database file for version counters. Defaults to `--database`.
    #[arg(long, env = "ANNOTATIONS_COUNTER_DATABASE")]
    pub counter_database: Option<String>,

    /// How long record snapshots stay cached (e.g. `90s`, `1h`).
    #[arg(
        long,
        env = "ANNOTATIONS_CACHE_TTL",
        default_value = "1h",
        value_parser = humantime::parse_duration
    )]
    pub cache_ttl: Duration,

    /// Maximum number of cached snapshots.
    #[arg(long, env = "ANNOTATIONS_CACHE_MAX_ENTRIES", default_value = "10000")]
    pub cache_max_entries: usize,

    /// Disable the snapshot cache.
    #[arg(long, env = "ANNOTATIONS_DISABLE_CACHE")]
    pub disable_cache: bool,

    /// Page size used when a command does not pass `--limit`.
    #[arg(long, env = "ANNOTATIONS_DEFAULT_PAGE_SIZE", default_value = "10")]
    pub default_page_size: u32,

    /// Largest accepted page size.
    #[arg(long, env = "ANNOTATIONS_MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ANNOTATIONS_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Annotation operations.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Store a new annotation version for an image.
    Create {
        #[arg(long)]
        image_id: String,
        #[arg(long)]
        user_id: String,
        /// Inline JSON, or `@path` to read it from a file.
        #[arg(long)]
        payload: String,
    },

    /// List the annotations of an image.
    Get {
        #[arg(long)]
        image_id: String,
        /// Only this version.
        #[arg(long)]
        version: Option<u64>,
        #[arg(long)]
        include_deleted: bool,
        /// Drop the study/patient metadata from the output.
        #[arg(long)]
        no_metadata: bool,
    },

    /// Show one record by id.
    Show {
        #[arg(long)]
        record_id: String,
    },

    /// List an image's versions, newest first.
    History {
        #[arg(long)]
        image_id: String,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        include_deleted: bool,
    },

    /// Find records by study or patient.
    Search {
        #[arg(long)]
        study_id: Option<String>,
        #[arg(long)]
        patient_id: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        include_deleted: bool,
    },

    /// Soft-delete one record.
    Delete {
        #[arg(long)]
        record_id: String,
        #[arg(long)]
        user_id: String,
    },

    /// Remove every record of an image and restart its versions.
    Purge {
        #[arg(long)]
        image_id: String,
    },
}

impl CliConfig {
    /// Service settings derived from the options.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::default()
            .with_limits(self.default_page_size, self.max_page_size)
            .with_cache_ttl(self.cache_ttl)
    }

    /// Cache settings derived from the options.
    pub fn cache_config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig {
            max_entries: self.cache_max_entries,
        }
    }

    /// Counter database path, falling back to the record database.
    pub fn counter_database(&self) -> &str {
        self.counter_database.as_deref().unwrap_or(&self.database)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.service_config().validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if !self.disable_cache && self.cache_max_entries == 0 {
            errors.push("Cache max entries cannot be 0 while the cache is enabled".to_string());
        }

        match self.backend {
            BackendKind::Sqlite => {
                if self.database.trim().is_empty() {
                    errors.push("Database path cannot be empty".to_string());
                }
                if self
                    .counter_database
                    .as_deref()
                    .is_some_and(|path| path.trim().is_empty())
                {
                    errors.push("Counter database path cannot be empty".to_string());
                }
            }
            BackendKind::Memory => {
                if self.counter_database.is_some() {
                    errors.push("--counter-database requires the sqlite backend".to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
