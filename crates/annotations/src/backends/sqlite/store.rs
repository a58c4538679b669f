//! AnnotationStore implementation for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use crate::core::AnnotationStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    AnnotationDraft, AnnotationMetadata, AnnotationRecord, DeletionState, RecordFilter,
    SearchFilter,
};

use super::SqliteBackend;

const RECORD_COLUMNS: &str = "id, image_id, user_id, version, payload, study_id, patient_id, \
     created_at, updated_at, is_deleted, deleted_by, deleted_at";

fn write_error(message: String, source: rusqlite::Error) -> StoreError {
    StoreError::WriteFailed {
        backend_name: "sqlite".to_string(),
        message,
        source: Some(Box::new(source)),
    }
}

fn serialization_error(message: String) -> StoreError {
    StoreError::Serialization { message }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_timestamp(column: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("Invalid {} '{}': {}", column, value, e)))
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A row as stored, before its text columns are decoded.
struct RawRecord {
    id: String,
    image_id: String,
    user_id: String,
    version: i64,
    payload: String,
    study_id: Option<String>,
    patient_id: Option<String>,
    created_at: String,
    updated_at: String,
    is_deleted: bool,
    deleted_by: Option<String>,
    deleted_at: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            image_id: row.get(1)?,
            user_id: row.get(2)?,
            version: row.get(3)?,
            payload: row.get(4)?,
            study_id: row.get(5)?,
            patient_id: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            is_deleted: row.get(9)?,
            deleted_by: row.get(10)?,
            deleted_at: row.get(11)?,
        })
    }
}

impl TryFrom<RawRecord> for AnnotationRecord {
    type Error = StoreError;

    fn try_from(raw: RawRecord) -> StoreResult<Self> {
        let version = u64::try_from(raw.version).map_err(|_| {
            serialization_error(format!("Invalid version {} for record {}", raw.version, raw.id))
        })?;
        let payload = serde_json::from_str(&raw.payload)
            .map_err(|e| serialization_error(format!("Invalid payload for record {}: {}", raw.id, e)))?;
        let deleted_at = raw
            .deleted_at
            .as_deref()
            .map(|ts| parse_timestamp("deleted_at", ts))
            .transpose()?;

        Ok(AnnotationRecord {
            created_at: parse_timestamp("created_at", &raw.created_at)?,
            updated_at: parse_timestamp("updated_at", &raw.updated_at)?,
            metadata: AnnotationMetadata::new(raw.study_id, raw.patient_id),
            id: raw.id,
            image_id: raw.image_id,
            user_id: raw.user_id,
            version,
            payload,
            is_deleted: raw.is_deleted,
            deleted_by: raw.deleted_by,
            deleted_at,
        })
    }
}

fn decode_all(rows: Vec<RawRecord>) -> StoreResult<Vec<AnnotationRecord>> {
    rows.into_iter().map(AnnotationRecord::try_from).collect()
}

#[async_trait]
impl AnnotationStore for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, draft: AnnotationDraft) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let version = i64::try_from(draft.version).map_err(|_| StoreError::WriteFailed {
            backend_name: "sqlite".to_string(),
            message: format!("Version {} exceeds the SQLite integer range", draft.version),
            source: None,
        })?;
        let payload = serde_json::to_string(&draft.payload)?;
        let (study_id, patient_id) = match draft.metadata {
            Some(m) => (m.study_id, m.patient_id),
            None => (None, None),
        };
        let created_at = format_timestamp(&draft.created_at);
        let updated_at = format_timestamp(&draft.updated_at);

        let record_id = id.clone();
        self.with_connection(move |conn| -> StoreResult<()> {
            conn.execute(
                "INSERT INTO annotations
                    (id, image_id, user_id, version, payload, study_id, patient_id,
                     created_at, updated_at, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
                params![
                    record_id,
                    draft.image_id,
                    draft.user_id,
                    version,
                    payload,
                    study_id,
                    patient_id,
                    created_at,
                    updated_at,
                ],
            )
            .map_err(|e| write_error(format!("Failed to insert annotation {}", record_id), e))?;
            Ok(())
        })
        .await?;

        Ok(id)
    }

    async fn find(&self, image_id: &str, filter: RecordFilter) -> StoreResult<Vec<AnnotationRecord>> {
        let image_id = image_id.to_string();

        let rows = self
            .with_connection(move |conn| -> StoreResult<Vec<RawRecord>> {
                let mut sql = format!(
                    "SELECT {} FROM annotations WHERE image_id = ?1",
                    RECORD_COLUMNS
                );
                let mut params: Vec<SqlValue> = vec![SqlValue::Text(image_id)];

                if let Some(version) = filter.version {
                    params.push(SqlValue::Integer(to_sql_int(version)));
                    sql.push_str(&format!(" AND version = ?{}", params.len()));
                }
                if !filter.include_deleted {
                    sql.push_str(" AND is_deleted = 0");
                }
                sql.push_str(" ORDER BY seq");

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params), RawRecord::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        decode_all(rows)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AnnotationRecord>> {
        let id = id.to_string();

        let row = self
            .with_connection(move |conn| -> StoreResult<Option<RawRecord>> {
                let sql = format!("SELECT {} FROM annotations WHERE id = ?1", RECORD_COLUMNS);
                Ok(conn
                    .query_row(&sql, [id], RawRecord::from_row)
                    .optional()?)
            })
            .await?;

        row.map(AnnotationRecord::try_from).transpose()
    }

    async fn find_deletion_state(&self, id: &str) -> StoreResult<Option<DeletionState>> {
        let id = id.to_string();

        type RawState = (bool, Option<String>, Option<String>, String);
        let row = self
            .with_connection(move |conn| -> StoreResult<Option<RawState>> {
                Ok(conn
                    .query_row(
                        "SELECT is_deleted, deleted_by, deleted_at, updated_at
                         FROM annotations WHERE id = ?1",
                        [id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?)
            })
            .await?;

        row.map(|(is_deleted, deleted_by, deleted_at, updated_at)| -> StoreResult<DeletionState> {
            Ok(DeletionState {
                is_deleted,
                deleted_by,
                deleted_at: deleted_at
                    .as_deref()
                    .map(|ts| parse_timestamp("deleted_at", ts))
                    .transpose()?,
                updated_at: parse_timestamp("updated_at", &updated_at)?,
            })
        })
        .transpose()
    }

    async fn find_for_search(
        &self,
        filter: &SearchFilter,
        skip: u64,
        limit: u32,
    ) -> StoreResult<(Vec<AnnotationRecord>, u64)> {
        let filter = filter.clone();

        let (rows, total) = self
            .with_connection(move |conn| -> StoreResult<(Vec<RawRecord>, u64)> {
                let mut conditions: Vec<String> = Vec::new();
                let mut params: Vec<SqlValue> = Vec::new();

                if let Some(study_id) = filter.study_id {
                    params.push(SqlValue::Text(study_id));
                    conditions.push(format!("study_id = ?{}", params.len()));
                }
                if let Some(patient_id) = filter.patient_id {
                    params.push(SqlValue::Text(patient_id));
                    conditions.push(format!("patient_id = ?{}", params.len()));
                }
                if !filter.include_deleted {
                    conditions.push("is_deleted = 0".to_string());
                }

                let where_clause = if conditions.is_empty() {
                    String::new()
                } else {
                    format!(" WHERE {}", conditions.join(" AND "))
                };

                // Count and page inside one read transaction so the total
                // matches the page.
                let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

                let total: i64 = tx.query_row(
                    &format!("SELECT COUNT(*) FROM annotations{}", where_clause),
                    params_from_iter(params.iter()),
                    |row| row.get(0),
                )?;

                let page_sql = format!(
                    "SELECT {} FROM annotations{} ORDER BY seq LIMIT ?{} OFFSET ?{}",
                    RECORD_COLUMNS,
                    where_clause,
                    params.len() + 1,
                    params.len() + 2
                );
                params.push(SqlValue::Integer(i64::from(limit)));
                params.push(SqlValue::Integer(to_sql_int(skip)));

                let rows = {
                    let mut stmt = tx.prepare(&page_sql)?;
                    stmt.query_map(params_from_iter(params), RawRecord::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                };
                tx.commit()?;

                Ok((rows, u64::try_from(total).unwrap_or(0)))
            })
            .await?;

        Ok((decode_all(rows)?, total))
    }

    async fn find_history(
        &self,
        image_id: &str,
        include_deleted: bool,
        skip: u64,
        limit: u32,
    ) -> StoreResult<Vec<AnnotationRecord>> {
        let image_id = image_id.to_string();

        let rows = self
            .with_connection(move |conn| -> StoreResult<Vec<RawRecord>> {
                let deleted_clause = if include_deleted { "" } else { " AND is_deleted = 0" };
                let sql = format!(
                    "SELECT {} FROM annotations WHERE image_id = ?1{}
                     ORDER BY version DESC, seq DESC LIMIT ?2 OFFSET ?3",
                    RECORD_COLUMNS, deleted_clause
                );

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(
                        params![image_id, i64::from(limit), to_sql_int(skip)],
                        RawRecord::from_row,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        decode_all(rows)
    }

    async fn soft_delete(&self, id: &str, deleted_by: &str) -> StoreResult<bool> {
        let id = id.to_string();
        let deleted_by = deleted_by.to_string();
        let now = format_timestamp(&Utc::now());

        self.with_connection(move |conn| -> StoreResult<bool> {
            // The is_deleted guard makes check-and-set a single statement.
            let changed = conn
                .execute(
                    "UPDATE annotations
                     SET is_deleted = 1, deleted_by = ?1, deleted_at = ?2, updated_at = ?2
                     WHERE id = ?3 AND is_deleted = 0",
                    params![deleted_by, now, id],
                )
                .map_err(|e| write_error(format!("Failed to soft-delete annotation {}", id), e))?;
            Ok(changed == 1)
        })
        .await
    }

    async fn delete_all(&self, image_id: &str) -> StoreResult<u64> {
        let image_id = image_id.to_string();

        let removed = self
            .with_connection(move |conn| -> StoreResult<u64> {
                let removed = conn
                    .execute("DELETE FROM annotations WHERE image_id = ?1", [&image_id])
                    .map_err(|e| {
                        write_error(format!("Failed to delete annotations of {}", image_id), e)
                    })?;
                debug!(image_id = %image_id, removed, "Removed image records from SQLite store");
                Ok(removed as u64)
            })
            .await?;

        Ok(removed)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.ping().await
    }
}
