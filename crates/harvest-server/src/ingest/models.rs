//! Data models for ingestion
//!
//! Work-item tracking rows and the queue message that points at them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Document, DocumentStatus};

/// Queuing outcome recorded on a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// The submission was accepted and a message was published
    QueuedOk,
    /// Retained for diagnostics when queuing itself failed
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QueueStatus::QueuedOk => "queued_ok",
            QueueStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for QueueStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "failed" => QueueStatus::Failed,
            _ => QueueStatus::QueuedOk,
        }
    }
}

/// A queued ingestion attempt, one row per document.
///
/// The row for a document always describes the most recent submission; a new
/// submission overwrites it rather than appending. Consumers delete the row
/// once the attempt reaches a terminal outcome, so a missing or mismatched
/// row tells a consumer its message is superseded or already handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    /// Primary key; at most one active work item per document
    pub document_uuid: Uuid,
    /// Submission attempt identifier
    pub request_id: String,
    /// When the submission was queued
    pub added_at: DateTime<Utc>,
    pub status: QueueStatus,
    /// Optional diagnostic text
    pub message: Option<String>,
    /// Snapshot of the document as submitted
    pub document: Document,
}

impl ProcessingStatus {
    /// Create the work item for a fresh submission.
    pub fn queued(mut document: Document) -> Self {
        document.status = DocumentStatus::Queued;
        document.error_status = None;
        Self {
            document_uuid: document.uuid,
            request_id: document.request_id.clone(),
            added_at: Utc::now(),
            status: QueueStatus::QueuedOk,
            message: None,
            document,
        }
    }

    /// Check whether this row belongs to the given delivery.
    pub fn matches(&self, message: &IngestMessage) -> bool {
        self.document_uuid == message.uuid && self.request_id == message.request_id
    }
}

/// Work queue payload: a pointer into the processing status store.
///
/// Not authoritative on its own; re-validated against the status store on
/// every delivery, because the queue may deliver it late, twice, or to
/// several consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestMessage {
    pub uuid: Uuid,
    pub request_id: String,
}

impl IngestMessage {
    pub fn new(uuid: Uuid, request_id: impl Into<String>) -> Self {
        Self {
            uuid,
            request_id: request_id.into(),
        }
    }

    /// The message pointing at a given work item.
    pub fn for_status(status: &ProcessingStatus) -> Self {
        Self::new(status.document_uuid, status.request_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        Document::new(Uuid::new_v4(), "req-1", "https://content.example.org/doc.txt")
    }

    #[test]
    fn test_queue_status_round_trip() {
        assert_eq!(QueueStatus::QueuedOk.to_string(), "queued_ok");
        assert_eq!(QueueStatus::Failed.to_string(), "failed");
        assert_eq!(QueueStatus::from("queued_ok".to_string()), QueueStatus::QueuedOk);
        assert_eq!(QueueStatus::from("failed".to_string()), QueueStatus::Failed);
        // Unknown values default to the nominal state
        assert_eq!(QueueStatus::from("bogus".to_string()), QueueStatus::QueuedOk);
    }

    #[test]
    fn test_processing_status_queued_resets_outcome_fields() {
        let mut doc = document();
        doc.status = DocumentStatus::IndexFailed;
        doc.error_status = Some("previous failure".to_string());

        let status = ProcessingStatus::queued(doc.clone());

        assert_eq!(status.document_uuid, doc.uuid);
        assert_eq!(status.request_id, doc.request_id);
        assert_eq!(status.status, QueueStatus::QueuedOk);
        assert_eq!(status.document.status, DocumentStatus::Queued);
        assert!(status.document.error_status.is_none());
    }

    #[test]
    fn test_message_matches_status() {
        let status = ProcessingStatus::queued(document());
        let message = IngestMessage::for_status(&status);
        assert!(status.matches(&message));

        let other = IngestMessage::new(status.document_uuid, "req-2");
        assert!(!status.matches(&other));

        let other = IngestMessage::new(Uuid::new_v4(), status.request_id.clone());
        assert!(!status.matches(&other));
    }
}
