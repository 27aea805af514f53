//! harvest-server: the ingestion pipeline binary
//!
//! Connects to Postgres, applies migrations and runs the processing
//! consumers until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use harvest_common::logging::{init_logging, LogConfig};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use harvest_server::config::Config;
use harvest_server::ingest::{
    ConsumerStats, HttpDownloader, IngestConfig, Orchestrator, PgFreshnessOracle, PgIndexer,
    PgStatusStore, PgWorkQueue,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Builder defaults, overridable through LOG_* variables
    let log_config = LogConfig::builder()
        .file_prefix("harvest-server")
        .directives("harvest_server=debug,sqlx=warn")
        .build()
        .load_env()?;
    init_logging(&log_config)?;

    info!("Starting harvest-server");

    let config = Config::load()?;
    let ingest_config = IngestConfig::from_env()?;

    let db_pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("failed to connect to Postgres")?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .context("failed to apply database migrations")?;

    info!("Connected to Postgres, migrations applied");

    if !ingest_config.enabled {
        info!("Ingestion is disabled (INGEST_ENABLED=false), nothing to do");
        return Ok(());
    }

    let downloader =
        HttpDownloader::new(ingest_config.download.clone()).context("failed to build downloader")?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PgStatusStore::new(db_pool.clone())),
        Arc::new(PgWorkQueue::new(
            db_pool.clone(),
            ingest_config.visibility_timeout(),
            ingest_config.poll_interval(),
        )),
        Arc::new(PgFreshnessOracle::new(db_pool.clone())),
        Arc::new(downloader),
        Arc::new(PgIndexer::new(db_pool.clone())),
        ingest_config.poll_interval(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut consumers = Vec::with_capacity(ingest_config.consumers);

    for consumer in 0..ingest_config.consumers {
        let orchestrator = orchestrator.clone();
        let shutdown = shutdown_rx.clone();
        consumers.push(tokio::spawn(async move {
            info!(consumer, "Processing consumer started");
            orchestrator.run(shutdown).await
        }));
    }

    info!(consumers = ingest_config.consumers, "Ingestion pipeline running");

    shutdown_signal().await;
    info!("Shutting down, draining consumers");

    if shutdown_tx.send(true).is_err() {
        warn!("All consumers already stopped");
    }

    match tokio::time::timeout(
        config.shutdown_timeout(),
        futures::future::join_all(consumers),
    )
    .await
    {
        Ok(results) => {
            let mut totals = ConsumerStats::default();
            for result in results {
                match result {
                    Ok(stats) => totals = totals.merge(stats),
                    Err(e) => error!(error = %e, "Consumer task panicked"),
                }
            }

            info!(
                received = totals.received,
                indexed = totals.indexed,
                missing = totals.missing,
                superseded = totals.superseded,
                failures_recorded = totals.failures_recorded,
                requeued = totals.requeued,
                "Shutdown complete"
            );
        }
        Err(_) => warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Consumers still running at the shutdown deadline, exiting anyway"
        ),
    }

    Ok(())
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "Cannot listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("SIGINT received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
