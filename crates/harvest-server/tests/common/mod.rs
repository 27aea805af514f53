//! Shared test doubles for pipeline tests
//!
//! The orchestrator is exercised against the in-memory store and queue plus
//! scripted downloader/indexer/oracle doubles that count their invocations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvest_common::checksum::Checksum;
use harvest_server::ingest::{
    ContentFile, DownloadError, Downloader, FreshnessOracle, IndexError, Indexer, ProcessingStatus,
    QueueStatus, StatusStore, StoreError,
};
use harvest_server::models::Document;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub fn document(uuid: Uuid, request_id: &str) -> Document {
    Document::new(uuid, request_id, "https://content.example.org/doc.txt")
        .with_title("Example document")
        .with_content_type("text/plain")
}

/// Freshness oracle answering from a scripted sequence; once the script is
/// exhausted it keeps answering `false` (nothing newer committed).
pub struct ScriptedOracle {
    answers: Mutex<VecDeque<bool>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn with_answers(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never_newer() -> Self {
        Self::with_answers(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FreshnessOracle for ScriptedOracle {
    async fn is_newer_than(
        &self,
        _uuid: Uuid,
        _timestamp: DateTime<Utc>,
    ) -> Result<bool, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// Downloader double: either hands out a staged file or fails every fetch.
pub struct StubDownloader {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StubDownloader {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for StubDownloader {
    async fn fetch(&self, document: &Document) -> Result<ContentFile, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.failure {
            Some(message) => Err(DownloadError::Decompression(message.clone())),
            None => Ok(ContentFile {
                path: PathBuf::from(format!("/nonexistent/{}", document.uuid)),
                size: 11,
                checksum: Checksum::of_bytes(b"hello world"),
                content_type: document.content_type.clone(),
            }),
        }
    }
}

/// Indexer double recording both kinds of commit.
pub struct StubIndexer {
    fail_extraction: bool,
    extractions: AtomicUsize,
    metadata_writes: Mutex<Vec<Document>>,
}

impl StubIndexer {
    pub fn succeeding() -> Self {
        Self {
            fail_extraction: false,
            extractions: AtomicUsize::new(0),
            metadata_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_extraction() -> Self {
        Self {
            fail_extraction: true,
            ..Self::succeeding()
        }
    }

    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    pub fn metadata_writes(&self) -> Vec<Document> {
        self.metadata_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Indexer for StubIndexer {
    async fn index_with_extraction(
        &self,
        _document: &Document,
        _file: &ContentFile,
    ) -> Result<(), IndexError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        if self.fail_extraction {
            Err(IndexError::Extraction("unsupported binary content".to_string()))
        } else {
            Ok(())
        }
    }

    async fn index_metadata_only(&self, document: &Document) -> Result<(), IndexError> {
        self.metadata_writes.lock().unwrap().push(document.clone());
        Ok(())
    }
}

/// Status store double whose every operation fails, for the
/// storage-unavailable path.
pub struct BrokenStore;

#[async_trait]
impl StatusStore for BrokenStore {
    async fn find(
        &self,
        _uuid: Uuid,
        _request_id: &str,
    ) -> Result<Option<ProcessingStatus>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn create_or_update(&self, _status: ProcessingStatus) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn delete_matching(
        &self,
        _uuid: Uuid,
        _request_id: &str,
        _status: QueueStatus,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }
}
