//! Search index commits
//!
//! The indexer owns the committed copy of every document. Each commit moves
//! `updated_at`, which is what the freshness oracle compares against, so a
//! commit is also the event that makes older in-flight work stale.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use super::download::ContentFile;
use super::extract::extract_text;
use crate::models::{Document, DocumentStatus};

/// Index commit failure
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Commits documents to the search index
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Extract text from the staged content and commit it together with the
    /// document metadata as the nominal indexed state.
    async fn index_with_extraction(
        &self,
        document: &Document,
        file: &ContentFile,
    ) -> Result<(), IndexError>;

    /// Commit only the metadata and status fields, leaving any previously
    /// extracted text untouched. Used for failure-status writes, which must
    /// not attempt re-extraction.
    async fn index_metadata_only(&self, document: &Document) -> Result<(), IndexError>;
}

/// Postgres full-text indexer
///
/// The documents table maintains a generated tsvector over title,
/// description and extracted text; committing a row is all that is needed
/// to make it searchable.
pub struct PgIndexer {
    pool: PgPool,
}

impl PgIndexer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Indexer for PgIndexer {
    async fn index_with_extraction(
        &self,
        document: &Document,
        file: &ContentFile,
    ) -> Result<(), IndexError> {
        let content = tokio::fs::read(&file.path).await?;
        let content_type = file
            .content_type
            .as_deref()
            .or(document.content_type.as_deref());
        let text = extract_text(&content, content_type)?;

        sqlx::query(
            r#"
            INSERT INTO documents
                (uuid, request_id, title, description, content_url, content_type,
                 status, error_status, extracted_text, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, now())
            ON CONFLICT (uuid) DO UPDATE SET
                request_id = EXCLUDED.request_id,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content_url = EXCLUDED.content_url,
                content_type = EXCLUDED.content_type,
                status = EXCLUDED.status,
                error_status = NULL,
                extracted_text = EXCLUDED.extracted_text,
                updated_at = now()
            "#,
        )
        .bind(document.uuid)
        .bind(&document.request_id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.content_url)
        .bind(content_type)
        .bind(DocumentStatus::Indexed.as_str())
        .bind(&text)
        .execute(&self.pool)
        .await?;

        info!(
            document_uuid = %document.uuid,
            request_id = %document.request_id,
            text_len = text.len(),
            "Document committed to search index"
        );

        Ok(())
    }

    async fn index_metadata_only(&self, document: &Document) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            INSERT INTO documents
                (uuid, request_id, title, description, content_url, content_type,
                 status, error_status, extracted_text, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, now())
            ON CONFLICT (uuid) DO UPDATE SET
                request_id = EXCLUDED.request_id,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content_url = EXCLUDED.content_url,
                content_type = EXCLUDED.content_type,
                status = EXCLUDED.status,
                error_status = EXCLUDED.error_status,
                updated_at = now()
            "#,
        )
        .bind(document.uuid)
        .bind(&document.request_id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.content_url)
        .bind(&document.content_type)
        .bind(document.status.as_str())
        .bind(&document.error_status)
        .execute(&self.pool)
        .await?;

        info!(
            document_uuid = %document.uuid,
            request_id = %document.request_id,
            status = %document.status,
            "Document status committed to search index"
        );

        Ok(())
    }
}
