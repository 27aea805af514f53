//! Processing orchestrator
//!
//! The queue consumer. Each delivery is one idempotent unit of ingestion
//! work: re-validate the message against the status store, check freshness,
//! download, extract and commit, and record failures on the document itself.
//!
//! Freshness is checked twice: once before any work, and again before a
//! failure-status write. The second check closes the race where a slow
//! download is overtaken by a fresher, faster submission, which would
//! otherwise end with a stale failure status written over a fresh success.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::download::Downloader;
use super::freshness::FreshnessOracle;
use super::index::Indexer;
use super::models::{IngestMessage, ProcessingStatus, QueueStatus};
use super::queue::WorkQueue;
use super::store::StatusStore;
use crate::error::IngestError;
use crate::models::DocumentStatus;

/// Terminal outcome of one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Content downloaded, extracted and committed
    Indexed,
    /// No matching work item; duplicate or superseded delivery
    MissingStatus,
    /// The committed result is already newer than this submission
    Superseded,
    /// A failure was recorded on the document (or skipped as stale)
    FailureRecorded(DocumentStatus),
}

/// Per-consumer counters, logged when a consumer drains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub indexed: u64,
    pub missing: u64,
    pub superseded: u64,
    pub failures_recorded: u64,
    pub requeued: u64,
}

impl ConsumerStats {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Indexed => self.indexed += 1,
            Outcome::MissingStatus => self.missing += 1,
            Outcome::Superseded => self.superseded += 1,
            Outcome::FailureRecorded(_) => self.failures_recorded += 1,
        }
    }

    /// Merge another consumer's counters into this one
    pub fn merge(self, other: Self) -> Self {
        Self {
            received: self.received + other.received,
            indexed: self.indexed + other.indexed,
            missing: self.missing + other.missing,
            superseded: self.superseded + other.superseded,
            failures_recorded: self.failures_recorded + other.failures_recorded,
            requeued: self.requeued + other.requeued,
        }
    }
}

/// The queue consumer coordinating store, oracle, downloader and indexer
pub struct Orchestrator {
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn WorkQueue>,
    oracle: Arc<dyn FreshnessOracle>,
    downloader: Arc<dyn Downloader>,
    indexer: Arc<dyn Indexer>,
    poll_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StatusStore>,
        queue: Arc<dyn WorkQueue>,
        oracle: Arc<dyn FreshnessOracle>,
        downloader: Arc<dyn Downloader>,
        indexer: Arc<dyn Indexer>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            oracle,
            downloader,
            indexer,
            poll_interval,
        }
    }

    /// Process one delivery to a terminal outcome.
    ///
    /// `Ok(_)` means the message can be acknowledged, including the discard
    /// and recorded-failure outcomes. `Err(_)` means the unit of work could
    /// not reach a terminal outcome (store, oracle or queue trouble); the
    /// message must stay unacknowledged so the transport redelivers it.
    pub async fn process(&self, message: &IngestMessage) -> Result<Outcome, IngestError> {
        let Some(status) = self.store.find(message.uuid, &message.request_id).await? else {
            // Duplicate delivery after completion, or superseded by a newer
            // submission that already replaced the row.
            info!(
                document_uuid = %message.uuid,
                request_id = %message.request_id,
                "No matching work item; nothing to do"
            );
            return Ok(Outcome::MissingStatus);
        };

        if self
            .oracle
            .is_newer_than(status.document_uuid, status.added_at)
            .await?
        {
            info!(
                document_uuid = %status.document_uuid,
                request_id = %status.request_id,
                added_at = %status.added_at,
                "Committed result is newer than this submission; discarding"
            );
            self.remove_work_item(&status).await?;
            return Ok(Outcome::Superseded);
        }

        let document = status.document.clone();

        match self.downloader.fetch(&document).await {
            Ok(file) => {
                let result = self.indexer.index_with_extraction(&document, &file).await;
                file.remove().await;

                match result {
                    Ok(()) => {
                        self.remove_work_item(&status).await?;
                        Ok(Outcome::Indexed)
                    }
                    Err(err) => {
                        warn!(
                            document_uuid = %document.uuid,
                            error = %err,
                            "Extraction/indexing failed"
                        );
                        self.record_failure(&status, DocumentStatus::IndexFailed, &err.to_string())
                            .await?;
                        Ok(Outcome::FailureRecorded(DocumentStatus::IndexFailed))
                    }
                }
            }
            Err(err) => {
                warn!(
                    document_uuid = %document.uuid,
                    url = %document.content_url,
                    error = %err,
                    "Download failed"
                );
                self.record_failure(&status, DocumentStatus::DownloadFailed, &err.to_string())
                    .await?;
                Ok(Outcome::FailureRecorded(DocumentStatus::DownloadFailed))
            }
        }
    }

    /// Record a terminal failure on the document, unless a newer result was
    /// committed while this attempt was running.
    ///
    /// This is the second freshness check, taken at the current time: the
    /// download attempt took a while, and a fresher submission may have
    /// finished meanwhile. Either way the work item is removed.
    async fn record_failure(
        &self,
        status: &ProcessingStatus,
        outcome: DocumentStatus,
        detail: &str,
    ) -> Result<(), IngestError> {
        if self
            .oracle
            .is_newer_than(status.document_uuid, Utc::now())
            .await?
        {
            info!(
                document_uuid = %status.document_uuid,
                request_id = %status.request_id,
                "Newer result committed during the attempt; skipping failure write"
            );
        } else {
            let mut document = status.document.clone();
            document.status = outcome;
            document.error_status = Some(detail.to_string());
            self.indexer.index_metadata_only(&document).await?;
        }

        self.remove_work_item(status).await?;
        Ok(())
    }

    /// Conditionally delete the work item; a skipped delete means a newer
    /// submission already replaced it.
    async fn remove_work_item(&self, status: &ProcessingStatus) -> Result<(), IngestError> {
        let removed = self
            .store
            .delete_matching(status.document_uuid, &status.request_id, QueueStatus::QueuedOk)
            .await?;

        if !removed {
            debug!(
                document_uuid = %status.document_uuid,
                request_id = %status.request_id,
                "Work item already replaced by a newer submission"
            );
        }

        Ok(())
    }

    /// Consumer loop: receive, process, acknowledge.
    ///
    /// Runs until the shutdown signal flips. Several consumers may run this
    /// loop concurrently with no coordination beyond the status store.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ConsumerStats {
        let mut stats = ConsumerStats::default();

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.queue.receive(self.poll_interval) => received,
            };

            let delivery = match received {
                Ok(Some(delivery)) => delivery,
                Ok(None) => continue,
                Err(err) => {
                    error!(error = %err, "Failed to receive from work queue");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            };

            stats.received += 1;

            match self.process(&delivery.message).await {
                Ok(outcome) => {
                    stats.record(&outcome);
                    if let Err(err) = self.queue.ack(&delivery).await {
                        // The work already reached a terminal outcome; a
                        // redelivered message hits the missing-status no-op.
                        error!(error = %err, "Failed to acknowledge delivery");
                    }
                }
                Err(err) => {
                    error!(
                        document_uuid = %delivery.message.uuid,
                        request_id = %delivery.message.request_id,
                        attempt = delivery.attempt,
                        error = %err,
                        "Processing failed; returning message for redelivery"
                    );
                    stats.requeued += 1;
                    if let Err(err) = self.queue.nack(&delivery).await {
                        error!(error = %err, "Failed to return delivery to the queue");
                    }
                }
            }
        }

        info!(
            received = stats.received,
            indexed = stats.indexed,
            missing = stats.missing,
            superseded = stats.superseded,
            failures_recorded = stats.failures_recorded,
            requeued = stats.requeued,
            "Consumer stopped"
        );

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record_outcomes() {
        let mut stats = ConsumerStats::default();
        stats.record(&Outcome::Indexed);
        stats.record(&Outcome::MissingStatus);
        stats.record(&Outcome::Superseded);
        stats.record(&Outcome::FailureRecorded(DocumentStatus::DownloadFailed));

        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.superseded, 1);
        assert_eq!(stats.failures_recorded, 1);
    }

    #[test]
    fn test_stats_merge() {
        let a = ConsumerStats {
            received: 3,
            indexed: 2,
            requeued: 1,
            ..Default::default()
        };
        let b = ConsumerStats {
            received: 2,
            superseded: 1,
            ..Default::default()
        };

        let merged = a.merge(b);
        assert_eq!(merged.received, 5);
        assert_eq!(merged.indexed, 2);
        assert_eq!(merged.superseded, 1);
        assert_eq!(merged.requeued, 1);
    }
}
