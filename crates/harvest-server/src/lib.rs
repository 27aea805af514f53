//! Harvest Server Library
//!
//! Asynchronous content-ingestion and search-indexing service.
//!
//! # Overview
//!
//! Externally submitted content metadata is queued for ingestion, the
//! referenced content is downloaded, indexable text is extracted, and the
//! result is committed to a Postgres full-text search index. The pipeline
//! tolerates duplicate and out-of-order delivery: work items are tracked in
//! a durable status store, and a freshness oracle guarantees a late or
//! duplicate message can never overwrite a newer result.
//!
//! # Architecture
//!
//! - **config**: Environment-based configuration management
//! - **models**: The document catalog entity and its status codes
//! - **ingest**: The pipeline (enqueuer, store, queue, orchestrator, collaborators)
//!
//! ## Framework Stack
//!
//! - **Tokio**: Async runtime for the consumers
//! - **SQLx**: Postgres access for the status store, queue and index
//! - **Tracing**: Structured logging throughout
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use harvest_server::ingest::{Enqueuer, MemoryQueue, MemoryStatusStore};
//! use harvest_server::models::Document;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let enqueuer = Enqueuer::new(
//!         Arc::new(MemoryStatusStore::new()),
//!         Arc::new(MemoryQueue::new()),
//!     );
//!
//!     let document = Document::new(
//!         uuid::Uuid::new_v4(),
//!         "request-1",
//!         "https://content.example.org/report.html",
//!     );
//!     enqueuer.submit(document).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod models;

// Re-export commonly used types
pub use error::IngestError;
pub use models::{Document, DocumentStatus};
