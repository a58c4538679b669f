//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

use super::schema;

/// SQLite backend for annotation records and version counters.
///
/// One backend implements both [`AnnotationStore`](crate::core::AnnotationStore)
/// and [`VersionCounter`](crate::core::VersionCounter). The service may use the
/// same instance for both, or two instances over different files.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .field("pool_state", &self.pool.state())
            .finish()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend with its schema initialized.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based database and initializes its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend with custom configuration.
    ///
    /// An in-memory database lives only as long as its connection, so for
    /// `":memory:"` the pool is pinned to a single connection that is never
    /// recycled.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteBackendConfig) -> StoreResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| conn.busy_timeout(busy_timeout));

        let builder = Pool::builder()
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
        let builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder
            .build(manager)
            .map_err(|e| StoreError::Unavailable {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })?;

        let backend = Self {
            pool,
            config,
            is_memory,
        };

        backend.configure_connection()?;
        backend.init_schema()?;

        info!(
            path = %path.as_ref().display(),
            is_memory,
            "Opened SQLite annotation backend"
        );

        Ok(backend)
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Runs `f` against a pooled connection on the blocking thread pool.
    ///
    /// The connection is acquired and released inside the blocking task, so
    /// it is never held across an await point.
    pub(crate) async fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<r2d2::Error> + From<tokio::task::JoinError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }

    /// Configure database-wide settings.
    fn configure_connection(&self) -> StoreResult<()> {
        if self.config.enable_wal && !self.is_memory {
            let conn = self.get_connection()?;
            let mode: String = conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .map_err(|e| internal_error(format!("Failed to enable WAL mode: {}", e)))?;
            debug!(journal_mode = %mode, "Configured SQLite journal mode");
        }

        Ok(())
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }

    /// Runs a trivial query to confirm the database answers.
    pub(crate) async fn ping<E>(&self) -> Result<(), E>
    where
        E: From<r2d2::Error> + From<tokio::task::JoinError> + From<rusqlite::Error> + Send + 'static,
    {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}

pub(crate) fn internal_error(message: String) -> StoreError {
    StoreError::Unavailable {
        backend_name: "sqlite".to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CounterError;

    #[test]
    fn test_in_memory_backend() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert!(backend.is_memory());
        assert_eq!(backend.config().max_connections, 10);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: SqliteBackendConfig = serde_json::from_str(r#"{"max_connections": 4}"#).unwrap();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.enable_wal);
    }

    #[tokio::test]
    async fn test_memory_database_survives_across_calls() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .with_connection(|conn| -> StoreResult<()> {
                conn.execute("CREATE TABLE scratch (x INTEGER)", [])?;
                conn.execute("INSERT INTO scratch (x) VALUES (7)", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let x: i64 = backend
            .with_connection(|conn| -> StoreResult<i64> {
                Ok(conn.query_row("SELECT x FROM scratch", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(x, 7);
    }

    #[tokio::test]
    async fn test_ping() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.ping::<StoreError>().await.unwrap();
        backend.ping::<CounterError>().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.db");

        let backend = SqliteBackend::open(&path).unwrap();
        assert!(!backend.is_memory());
        backend.ping::<StoreError>().await.unwrap();
        assert!(path.exists());
    }
}
