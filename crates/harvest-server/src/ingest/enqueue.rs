//! Submission enqueuing
//!
//! Entry point for the request-handling layer: record the work item
//! durably, then publish the message pointing at it. The order matters; a
//! published message with no tracking row would be untrackable work, so the
//! status write happens first and a failure there aborts the submission.

use std::sync::Arc;
use tracing::{error, info};

use super::models::{IngestMessage, ProcessingStatus, QueueStatus};
use super::queue::WorkQueue;
use super::store::StatusStore;
use crate::error::IngestError;
use crate::models::Document;

/// Accepts validated documents and queues them for ingestion
pub struct Enqueuer {
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn WorkQueue>,
}

impl Enqueuer {
    pub fn new(store: Arc<dyn StatusStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Queue a document for ingestion.
    ///
    /// Overwrites any older work item for the same document, then publishes
    /// the ingestion message. Errors are surfaced to the caller; retrying is
    /// the caller's responsibility.
    pub async fn submit(&self, document: Document) -> Result<bool, IngestError> {
        document.validate().map_err(IngestError::InvalidDocument)?;

        let status = ProcessingStatus::queued(document);
        let message = IngestMessage::for_status(&status);

        self.store.create_or_update(status.clone()).await?;

        if let Err(err) = self.queue.publish(message.clone()).await {
            // The submission never made it onto the queue; keep the row as a
            // diagnostic marker. Consumers only delete queued_ok rows, and
            // the next submission overwrites this one.
            let mut failed = status;
            failed.status = QueueStatus::Failed;
            failed.message = Some(err.to_string());
            if let Err(store_err) = self.store.create_or_update(failed).await {
                error!(
                    document_uuid = %message.uuid,
                    error = %store_err,
                    "Failed to record queuing failure"
                );
            }
            return Err(err.into());
        }

        info!(
            document_uuid = %message.uuid,
            request_id = %message.request_id,
            "Submission queued for ingestion"
        );

        Ok(true)
    }
}
