//! Content downloader
//!
//! Fetches the content a document points at and stages it as a local file
//! for text extraction. Each fetch produces its own file; nothing is shared
//! or cached between messages.

use async_trait::async_trait;
use harvest_common::checksum::Checksum;
use harvest_common::compress;
use reqwest::Client;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::DownloadConfig;
use crate::models::Document;

const USER_AGENT: &str = concat!("harvest-ingest/", env!("CARGO_PKG_VERSION"));

/// Download failure
///
/// Recoverable from the pipeline's point of view: the orchestrator records
/// it on the document instead of propagating.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Content too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decompression error: {0}")]
    Decompression(String),
}

/// Downloaded content staged on local disk
#[derive(Debug, Clone)]
pub struct ContentFile {
    pub path: PathBuf,
    pub size: u64,
    pub checksum: Checksum,
    /// Effective content type: the response header when present, the
    /// document's declared type otherwise
    pub content_type: Option<String>,
}

impl ContentFile {
    /// Remove the staged file. Best effort; the cache directory is
    /// disposable either way.
    pub async fn remove(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            debug!(path = %self.path.display(), error = %e, "Failed to remove staged content file");
        }
    }
}

/// Fetches raw content bytes for a document
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, document: &Document) -> Result<ContentFile, DownloadError>;
}

/// HTTP downloader with bounded retry
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
}

impl HttpDownloader {
    /// Create a new downloader with configuration
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a URL with retry and exponential backoff
    async fn download_with_retry(
        &self,
        url: &str,
    ) -> Result<(Vec<u8>, Option<String>), DownloadError> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            match self.download_once(url).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(
                        url,
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Download attempt failed"
                    );
                    last_error = Some(e);

                    if attempt < self.config.max_retries {
                        let backoff = self.config.retry_backoff() * 2u32.pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        // max_retries >= 1, so at least one attempt ran and set last_error
        Err(last_error.unwrap_or_else(|| DownloadError::Status {
            status: 0,
            url: url.to_string(),
        }))
    }

    /// Single download attempt, bounded by the configured size limit
    async fn download_once(&self, url: &str) -> Result<(Vec<u8>, Option<String>), DownloadError> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.config.max_bytes {
                return Err(DownloadError::TooLarge {
                    size: length,
                    limit: self.config.max_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.config.max_bytes {
                return Err(DownloadError::TooLarge {
                    size: (body.len() + chunk.len()) as u64,
                    limit: self.config.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok((body, content_type))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, document: &Document) -> Result<ContentFile, DownloadError> {
        info!(
            document_uuid = %document.uuid,
            url = %document.content_url,
            "Downloading content"
        );

        let (mut body, header_type) = self.download_with_retry(&document.content_url).await?;

        // Compressed payloads are sniffed by magic bytes; declared content
        // types are unreliable for submitted URLs.
        if compress::is_gzip(&body) {
            body = compress::decompress_gzip(&body)
                .map_err(|e| DownloadError::Decompression(e.to_string()))?;
            if body.len() as u64 > self.config.max_bytes {
                return Err(DownloadError::TooLarge {
                    size: body.len() as u64,
                    limit: self.config.max_bytes,
                });
            }
        }

        tokio::fs::create_dir_all(&self.config.cache_dir).await?;
        let path = self
            .config
            .cache_dir
            .join(format!("{}-{}", document.uuid, Uuid::new_v4()));
        tokio::fs::write(&path, &body).await?;

        let checksum = Checksum::of_bytes(&body);
        debug!(
            document_uuid = %document.uuid,
            path = %path.display(),
            size = body.len(),
            %checksum,
            "Content staged"
        );

        Ok(ContentFile {
            path,
            size: body.len() as u64,
            checksum,
            content_type: header_type.or_else(|| document.content_type.clone()),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
