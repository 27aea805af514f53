//! Domain models
//!
//! The document catalog entity and its ingestion status codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ingestion outcome recorded on the committed document
///
/// `Queued` is the state between submission and the first index commit;
/// the other three are terminal for a given submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Queued,
    Indexed,
    DownloadFailed,
    IndexFailed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentStatus::Queued => "queued",
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::DownloadFailed => "download_failed",
            DocumentStatus::IndexFailed => "index_failed",
        }
    }

    /// Whether this status marks the end of automatic processing for the
    /// current submission.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentStatus::Queued)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DocumentStatus::Queued),
            "indexed" => Ok(DocumentStatus::Indexed),
            "download_failed" => Ok(DocumentStatus::DownloadFailed),
            "index_failed" => Ok(DocumentStatus::IndexFailed),
            _ => Err(anyhow::anyhow!("Invalid document status: {}", s)),
        }
    }
}

/// A content catalog record submitted for ingestion.
///
/// The committed copy lives in the search index and is owned exclusively by
/// the indexer; everything the pipeline passes around is a snapshot taken at
/// submission time and may be stale by the time it is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier for the catalog record
    pub uuid: Uuid,
    /// Identifier of the submission attempt that produced this snapshot
    pub request_id: String,
    /// Display title carried through to the index
    pub title: Option<String>,
    /// Display description carried through to the index
    pub description: Option<String>,
    /// Where the referenced content is fetched from
    pub content_url: String,
    /// Declared MIME type of the referenced content
    pub content_type: Option<String>,
    /// Ingestion outcome code
    pub status: DocumentStatus,
    /// Human-readable diagnostic for the failure states
    pub error_status: Option<String>,
    /// Maintained by the indexer whenever the committed copy changes
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new submission snapshot.
    pub fn new(uuid: Uuid, request_id: impl Into<String>, content_url: impl Into<String>) -> Self {
        Self {
            uuid,
            request_id: request_id.into(),
            title: None,
            description: None,
            content_url: content_url.into(),
            content_type: None,
            status: DocumentStatus::Queued,
            error_status: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Validate the fields the pipeline depends on.
    pub fn validate(&self) -> Result<(), String> {
        if self.uuid.is_nil() {
            return Err("document uuid must not be nil".to_string());
        }
        if self.request_id.trim().is_empty() {
            return Err("request_id must not be empty".to_string());
        }
        url::Url::parse(&self.content_url)
            .map_err(|e| format!("invalid content_url '{}': {}", self.content_url, e))?;
        Ok(())
    }

    /// Check whether the last attempt for this record failed.
    pub fn has_failed(&self) -> bool {
        matches!(
            self.status,
            DocumentStatus::DownloadFailed | DocumentStatus::IndexFailed
        ) || self.error_status.is_some()
    }
}
