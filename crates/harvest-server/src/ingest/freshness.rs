//! Freshness oracle
//!
//! The single decision point that keeps an out-of-order or delayed message
//! from clobbering a result produced by a later submission. Backed by the
//! committed document's `updated_at`, which only the indexer moves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::index::IndexError;

/// Answers "is the committed result newer than timestamp T?"
#[async_trait]
pub trait FreshnessOracle: Send + Sync {
    /// True iff the committed document's `updated_at` is strictly after
    /// `timestamp`. A document that was never committed is never newer.
    async fn is_newer_than(
        &self,
        uuid: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, IndexError>;
}

/// Oracle over the Postgres documents table
pub struct PgFreshnessOracle {
    pool: PgPool,
}

impl PgFreshnessOracle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FreshnessOracle for PgFreshnessOracle {
    async fn is_newer_than(
        &self,
        uuid: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, IndexError> {
        let committed_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM documents WHERE uuid = $1")
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;

        Ok(committed_at.map(|at| at > timestamp).unwrap_or(false))
    }
}
