//! Processing status store
//!
//! Keyed table of in-flight work items, one row per document. The row is the
//! only shared mutable state in the pipeline, so every operation here is a
//! single atomic statement on the `document_uuid` key: upserts let a newer
//! submission overwrite an older queued one, and deletes are conditioned on
//! `(request_id, status)` so a consumer can never erase a row written by a
//! newer submission.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{ProcessingStatus, QueueStatus};
use crate::models::Document;

/// Status store failure
///
/// Always fatal for the message being processed; the orchestrator abandons
/// the message unacked and lets the transport redeliver.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt document snapshot for {uuid}: {source}")]
    CorruptSnapshot {
        uuid: Uuid,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable store of in-flight work items
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Exact-match lookup by `(document_uuid, request_id)`.
    async fn find(
        &self,
        uuid: Uuid,
        request_id: &str,
    ) -> Result<Option<ProcessingStatus>, StoreError>;

    /// Idempotent upsert keyed by `document_uuid`; a newer submission always
    /// wins over an older queued one still present.
    async fn create_or_update(&self, status: ProcessingStatus) -> Result<(), StoreError>;

    /// Delete only if the row still matches on `request_id` and `status`;
    /// returns whether a row was removed. A mismatch means a newer submission
    /// already replaced the row and the delete is skipped.
    async fn delete_matching(
        &self,
        uuid: Uuid,
        request_id: &str,
        status: QueueStatus,
    ) -> Result<bool, StoreError>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

/// Postgres-backed status store
///
/// Row-level atomicity comes from single-statement upsert/delete; no
/// cross-row transactions are needed.
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn find(
        &self,
        uuid: Uuid,
        request_id: &str,
    ) -> Result<Option<ProcessingStatus>, StoreError> {
        let row = sqlx::query_as::<_, StatusRow>(
            r#"
            SELECT document_uuid, request_id, added_at, status, message, document
            FROM processing_status
            WHERE document_uuid = $1 AND request_id = $2
            "#,
        )
        .bind(uuid)
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProcessingStatus::try_from).transpose()
    }

    async fn create_or_update(&self, status: ProcessingStatus) -> Result<(), StoreError> {
        let snapshot =
            serde_json::to_value(&status.document).map_err(|e| StoreError::CorruptSnapshot {
                uuid: status.document_uuid,
                source: e,
            })?;

        sqlx::query(
            r#"
            INSERT INTO processing_status
                (document_uuid, request_id, added_at, status, message, document)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (document_uuid) DO UPDATE SET
                request_id = EXCLUDED.request_id,
                added_at = EXCLUDED.added_at,
                status = EXCLUDED.status,
                message = EXCLUDED.message,
                document = EXCLUDED.document
            "#,
        )
        .bind(status.document_uuid)
        .bind(&status.request_id)
        .bind(status.added_at)
        .bind(status.status.as_str())
        .bind(&status.message)
        .bind(snapshot)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_matching(
        &self,
        uuid: Uuid,
        request_id: &str,
        status: QueueStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM processing_status
            WHERE document_uuid = $1 AND request_id = $2 AND status = $3
            "#,
        )
        .bind(uuid)
        .bind(request_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// Helper struct for sqlx query_as
#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    document_uuid: Uuid,
    request_id: String,
    added_at: DateTime<Utc>,
    status: String,
    message: Option<String>,
    document: serde_json::Value,
}

impl TryFrom<StatusRow> for ProcessingStatus {
    type Error = StoreError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        let document: Document =
            serde_json::from_value(row.document).map_err(|e| StoreError::CorruptSnapshot {
                uuid: row.document_uuid,
                source: e,
            })?;

        Ok(Self {
            document_uuid: row.document_uuid,
            request_id: row.request_id,
            added_at: row.added_at,
            status: QueueStatus::from(row.status),
            message: row.message,
            document,
        })
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-memory status store for tests and local runs.
///
/// A single map mutex gives the same per-row atomicity the Postgres store
/// gets from single-statement operations.
#[derive(Default)]
pub struct MemoryStatusStore {
    rows: Mutex<HashMap<Uuid, ProcessingStatus>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held; test helper.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn find(
        &self,
        uuid: Uuid,
        request_id: &str,
    ) -> Result<Option<ProcessingStatus>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&uuid)
            .filter(|row| row.request_id == request_id)
            .cloned())
    }

    async fn create_or_update(&self, status: ProcessingStatus) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        rows.insert(status.document_uuid, status);
        Ok(())
    }

    async fn delete_matching(
        &self,
        uuid: Uuid,
        request_id: &str,
        status: QueueStatus,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        match rows.get(&uuid) {
            Some(row) if row.request_id == request_id && row.status == status => {
                rows.remove(&uuid);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn status(request_id: &str) -> ProcessingStatus {
        let uuid = Uuid::new_v4();
        ProcessingStatus::queued(Document::new(
            uuid,
            request_id,
            "https://content.example.org/doc.txt",
        ))
    }

    #[tokio::test]
    async fn test_find_requires_matching_request_id() {
        let store = MemoryStatusStore::new();
        let row = status("req-1");
        let uuid = row.document_uuid;
        store.create_or_update(row).await.unwrap();

        assert!(store.find(uuid, "req-1").await.unwrap().is_some());
        assert!(store.find(uuid, "req-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_newer_submission_overwrites_row() {
        let store = MemoryStatusStore::new();
        let first = status("req-1");
        let uuid = first.document_uuid;
        store.create_or_update(first).await.unwrap();

        let mut second = status("req-2");
        second.document_uuid = uuid;
        second.document.uuid = uuid;
        store.create_or_update(second).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.find(uuid, "req-1").await.unwrap().is_none());
        assert!(store.find(uuid, "req-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_matching_removes_exact_row() {
        let store = MemoryStatusStore::new();
        let row = status("req-1");
        let uuid = row.document_uuid;
        store.create_or_update(row).await.unwrap();

        let removed = store
            .delete_matching(uuid, "req-1", QueueStatus::QueuedOk)
            .await
            .unwrap();
        assert!(removed);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_skips_row_replaced_by_newer_submission() {
        let store = MemoryStatusStore::new();
        let first = status("req-1");
        let uuid = first.document_uuid;
        store.create_or_update(first).await.unwrap();

        // A newer submission lands for the same document
        let mut second = status("req-2");
        second.document_uuid = uuid;
        second.document.uuid = uuid;
        store.create_or_update(second).await.unwrap();

        // A consumer finishing the first submission must not erase it
        let removed = store
            .delete_matching(uuid, "req-1", QueueStatus::QueuedOk)
            .await
            .unwrap();
        assert!(!removed);
        assert!(store.find(uuid, "req-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_skips_on_status_mismatch() {
        let store = MemoryStatusStore::new();
        let row = status("req-1");
        let uuid = row.document_uuid;
        store.create_or_update(row).await.unwrap();

        let removed = store
            .delete_matching(uuid, "req-1", QueueStatus::Failed)
            .await
            .unwrap();
        assert!(!removed);
        assert_eq!(store.len().await, 1);
    }
}
