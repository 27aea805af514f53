//! Asynchronous ingestion pipeline
//!
//! Submissions flow through: enqueue -> work queue -> orchestrator ->
//! {status store, freshness oracle, downloader, indexer}.
//!
//! # Architecture
//!
//! - **config**: Configuration for consumers and downloads (INGEST_* environment variables)
//! - **models**: Work items and the queue message that points at them
//! - **store**: Durable processing status store (Postgres + in-memory)
//! - **queue**: Work queue transport (Postgres SKIP LOCKED + in-memory)
//! - **freshness**: Staleness decisions against the committed index
//! - **download**: HTTP content fetching with retry
//! - **extract**: Content-to-text extraction
//! - **index**: Search index commits
//! - **enqueue**: Submission entry point
//! - **orchestrator**: The queue consumer
//!
//! The queue delivers at-least-once with no ordering guarantee. Every
//! delivery is re-validated against the status store, and staleness is
//! decided logically by comparing the work item's `added_at` against the
//! committed document's `updated_at`, so duplicates, redeliveries and
//! out-of-order generations of the same document are all safe.

pub mod config;
pub mod download;
pub mod enqueue;
pub mod extract;
pub mod freshness;
pub mod index;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod store;

pub use config::{DownloadConfig, IngestConfig};
pub use download::{ContentFile, DownloadError, Downloader, HttpDownloader};
pub use enqueue::Enqueuer;
pub use freshness::{FreshnessOracle, PgFreshnessOracle};
pub use index::{IndexError, Indexer, PgIndexer};
pub use models::{IngestMessage, ProcessingStatus, QueueStatus};
pub use orchestrator::{ConsumerStats, Orchestrator, Outcome};
pub use queue::{Delivery, MemoryQueue, PgWorkQueue, QueueError, WorkQueue};
pub use store::{MemoryStatusStore, PgStatusStore, StatusStore, StoreError};
