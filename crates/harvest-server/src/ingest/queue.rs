//! Work queue transport
//!
//! At-least-once delivery of ingestion messages. The transport makes no
//! ordering promises; consumers tolerate duplicates and supersession by
//! re-validating every delivery against the status store.
//!
//! Acknowledgement protocol: `ack` retires a delivery, `nack` returns it for
//! redelivery. A consumer that dies holding a claim loses it after the
//! visibility timeout.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use super::models::IngestMessage;

/// Work queue failure
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt message payload: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A claimed message, held until acked or nacked.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: Uuid,
    pub message: IngestMessage,
    /// Delivery attempt counter, 1 on first delivery
    pub attempt: i32,
}

/// Durable channel between the enqueuer and the processing consumers
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Publish a message for processing.
    async fn publish(&self, message: IngestMessage) -> Result<(), QueueError>;

    /// Wait up to `wait` for a message; `None` when nothing arrived.
    async fn receive(&self, wait: Duration) -> Result<Option<Delivery>, QueueError>;

    /// Retire a delivery after a terminal outcome.
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Return a delivery for redelivery.
    async fn nack(&self, delivery: &Delivery) -> Result<(), QueueError>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

/// Postgres-backed work queue.
///
/// Claims use `FOR UPDATE SKIP LOCKED` so concurrent consumers never contend
/// on the same row; a claim expires after the visibility timeout and the row
/// becomes claimable again.
pub struct PgWorkQueue {
    pool: PgPool,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl PgWorkQueue {
    pub fn new(pool: PgPool, visibility_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            pool,
            visibility_timeout,
            poll_interval,
        }
    }

    async fn claim(&self) -> Result<Option<Delivery>, QueueError> {
        let cutoff = Utc::now()
            - chrono::Duration::seconds(self.visibility_timeout.as_secs().min(i64::MAX as u64) as i64);

        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            UPDATE ingest_queue
            SET locked_at = now(), attempts = attempts + 1
            WHERE id = (
                SELECT id FROM ingest_queue
                WHERE locked_at IS NULL OR locked_at < $1
                ORDER BY enqueued_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, message, attempts
            "#,
        )
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Delivery {
                id: row.id,
                message: serde_json::from_value(row.message)?,
                attempt: row.attempts,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    async fn publish(&self, message: IngestMessage) -> Result<(), QueueError> {
        let payload = serde_json::to_value(&message)?;

        sqlx::query("INSERT INTO ingest_queue (id, message) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(payload)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn receive(&self, wait: Duration) -> Result<Option<Delivery>, QueueError> {
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            if let Some(delivery) = self.claim().await? {
                return Ok(Some(delivery));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM ingest_queue WHERE id = $1")
            .bind(delivery.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        sqlx::query("UPDATE ingest_queue SET locked_at = NULL WHERE id = $1")
            .bind(delivery.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// Helper struct for sqlx query_as
#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    message: serde_json::Value,
    attempts: i32,
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-process queue for tests and local runs.
#[derive(Default)]
pub struct MemoryQueue {
    ready: Mutex<VecDeque<Delivery>>,
    in_flight: Mutex<HashMap<Uuid, (tokio::time::Instant, Delivery)>>,
    visibility_timeout: Option<Duration>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose claims expire, matching the Postgres queue's at-least-once
    /// behavior when a consumer dies holding a delivery.
    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            visibility_timeout: Some(visibility_timeout),
            ..Self::default()
        }
    }

    /// Messages waiting for delivery; test helper.
    pub async fn pending(&self) -> usize {
        self.ready.lock().await.len()
    }

    pub async fn is_drained(&self) -> bool {
        self.ready.lock().await.is_empty() && self.in_flight.lock().await.is_empty()
    }

    /// Return expired claims to the ready queue. Caller holds both locks.
    fn reclaim_expired(
        &self,
        in_flight: &mut HashMap<Uuid, (tokio::time::Instant, Delivery)>,
        ready: &mut VecDeque<Delivery>,
    ) {
        let Some(timeout) = self.visibility_timeout else {
            return;
        };

        let now = tokio::time::Instant::now();
        let expired: Vec<Uuid> = in_flight
            .iter()
            .filter(|(_, (claimed_at, _))| now.duration_since(*claimed_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some((_, delivery)) = in_flight.remove(&id) {
                ready.push_back(delivery);
            }
        }
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn publish(&self, message: IngestMessage) -> Result<(), QueueError> {
        let mut ready = self.ready.lock().await;
        ready.push_back(Delivery {
            id: Uuid::new_v4(),
            message,
            attempt: 0,
        });
        drop(ready);
        self.notify.notify_one();

        Ok(())
    }

    async fn receive(&self, wait: Duration) -> Result<Option<Delivery>, QueueError> {
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            {
                // Lock order matches nack: in_flight before ready. Holding
                // both keeps the pop-and-claim step free of await points, so
                // a caller cancelled mid-receive cannot lose a message.
                let mut in_flight = self.in_flight.lock().await;
                let mut ready = self.ready.lock().await;
                self.reclaim_expired(&mut in_flight, &mut ready);
                if let Some(mut delivery) = ready.pop_front() {
                    delivery.attempt += 1;
                    in_flight.insert(delivery.id, (tokio::time::Instant::now(), delivery.clone()));
                    return Ok(Some(delivery));
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // Missed notifications are fine; the loop re-checks the queue.
            let _ = tokio::time::timeout(deadline - now, self.notify.notified()).await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.in_flight.lock().await.remove(&delivery.id);
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some((_, delivery)) = in_flight.remove(&delivery.id) {
            self.ready.lock().await.push_front(delivery);
            self.notify.notify_one();
        }
        Ok(())
    }
}
