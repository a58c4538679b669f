//! VersionCounter implementation for SQLite.
//!
//! Counters live in their own `version_counters` table and are never touched
//! by the annotation insert, so the counter and the store stay independent
//! even when they share a database file.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, TransactionBehavior};

use crate::core::VersionCounter;
use crate::error::{CounterError, CounterResult};

use super::SqliteBackend;

#[async_trait]
impl VersionCounter for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn next_version(&self, image_id: &str) -> CounterResult<u64> {
        let image_id = image_id.to_string();

        self.with_connection(move |conn| -> CounterResult<u64> {
            // IMMEDIATE takes the write lock up front so concurrent
            // increments wait on the busy timeout instead of failing.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // The WHERE guard leaves the row untouched at i64::MAX, in which
            // case RETURNING yields nothing.
            let next: Option<i64> = tx
                .query_row(
                    "INSERT INTO version_counters (image_id, version) VALUES (?1, 1)
                     ON CONFLICT(image_id) DO UPDATE SET version = version + 1
                     WHERE version < 9223372036854775807
                     RETURNING version",
                    [&image_id],
                    |row| row.get(0),
                )
                .optional()?;
            tx.commit()?;

            next.and_then(|v| u64::try_from(v).ok())
                .ok_or(CounterError::Overflow { image_id })
        })
        .await
    }

    async fn current_version(&self, image_id: &str) -> CounterResult<Option<u64>> {
        let image_id = image_id.to_string();

        let current = self
            .with_connection(move |conn| -> CounterResult<Option<i64>> {
                Ok(conn
                    .query_row(
                        "SELECT version FROM version_counters WHERE image_id = ?1",
                        [&image_id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        Ok(current.and_then(|v| u64::try_from(v).ok()))
    }

    async fn reset(&self, image_id: &str) -> CounterResult<()> {
        let image_id = image_id.to_string();

        self.with_connection(move |conn| -> CounterResult<()> {
            conn.execute("DELETE FROM version_counters WHERE image_id = ?1", [&image_id])?;
            Ok(())
        })
        .await
    }

    async fn health_check(&self) -> CounterResult<()> {
        self.ping().await
    }
}
