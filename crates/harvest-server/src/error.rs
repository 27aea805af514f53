//! Server-specific error types

use thiserror::Error;

use crate::ingest::index::IndexError;
use crate::ingest::queue::QueueError;
use crate::ingest::store::StoreError;

/// Pipeline error surfaced to callers and the transport.
///
/// Download and extraction failures never show up here; they are absorbed
/// into a status recorded on the document. What remains is infrastructure
/// trouble that must fail the unit of work so the transport can redeliver.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Status store error: {0}")]
    Store(#[from] StoreError),

    #[error("Work queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Search index error: {0}")]
    Index(#[from] IndexError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}
