//! Helios annotation store command-line tool.
//!
//! Wires configuration, logging and storage backends, runs one command and
//! prints its result as JSON on stdout. Logs go to stderr.

mod commands;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use helios_annotations::AnnotationService;
use helios_annotations::backends::memory::{
    MemoryCache, MemoryStore, MemoryVersionCounter, NoopCache,
};
use helios_annotations::core::DynCache;

use crate::commands::Outcome;
use crate::config::{BackendKind, CliConfig};

/// Exit status for a lookup that matched nothing.
const EXIT_NOT_FOUND: u8 = 2;

/// Installs the stderr log subscriber; `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helios_annotations={level},hfs_annotations={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn create_cache(config: &CliConfig) -> DynCache {
    if config.disable_cache {
        Arc::new(NoopCache)
    } else {
        Arc::new(MemoryCache::with_config(config.cache_config()))
    }
}

/// Builds the service over SQLite database files.
#[cfg(feature = "sqlite")]
fn create_sqlite_service(config: &CliConfig) -> anyhow::Result<AnnotationService> {
    use helios_annotations::backends::sqlite::SqliteBackend;

    info!(database = %config.database, "Initializing SQLite backend");
    let store = Arc::new(SqliteBackend::open(&config.database)?);

    let counter = if config.counter_database() == config.database {
        store.clone()
    } else {
        info!(database = %config.counter_database(), "Using separate counter database");
        Arc::new(SqliteBackend::open(config.counter_database())?)
    };

    Ok(AnnotationService::new(
        store,
        counter,
        create_cache(config),
        config.service_config(),
    ))
}

/// Fallback when the sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
fn create_sqlite_service(_config: &CliConfig) -> anyhow::Result<AnnotationService> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p helios-annotations-cli --features sqlite"
    )
}

fn create_service(config: &CliConfig) -> anyhow::Result<AnnotationService> {
    match config.backend {
        BackendKind::Memory => Ok(AnnotationService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryVersionCounter::new()),
            create_cache(config),
            config.service_config(),
        )),
        BackendKind::Sqlite => create_sqlite_service(config),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        return Ok(ExitCode::FAILURE);
    }

    info!(backend = %config.backend, "Starting annotation command");

    let service = create_service(&config)?;

    match commands::execute(&service, config.command).await? {
        Outcome::Found(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::NotFound => {
            println!("null");
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
    }
}
