use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    bootstrap::{bootstrap, spawn_chains},
    client::{HttpLedgerClient, create_shared_client},
    config::SwarmConfig,
    pool::SharedIdentityPool,
    stats::{SwarmStats, log_final_report, run_stats_reporter},
};

/// How long in-flight attempts get to finish after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Main entry point: bootstrap the swarm and drive it until duration, Ctrl+C or SIGTERM.
pub async fn run_swarm(config: SwarmConfig) -> Result<()> {
    info!(endpoint = %config.endpoint, "Starting txswarm");

    let delay = config.delay_window()?;
    let duration = config.parse_duration()?;
    let stats_interval = config.parse_stats_interval()?;

    let http = create_shared_client(config.parse_request_timeout()?)
        .context("Failed to build HTTP client")?;
    let client = Arc::new(HttpLedgerClient::new(http, &config.endpoint));

    // Step 1: size the pool
    let count = config.pick_identity_count(&mut rand::thread_rng());
    info!(
        count,
        min = config.min_identities,
        max = config.max_identities,
        max_delay_secs = delay.max().as_secs(),
        "Configuration loaded"
    );

    // Step 2: mint and fund identities
    let stats = SwarmStats::shared();
    let pool: SharedIdentityPool = Arc::new(
        bootstrap(client.as_ref(), count, config.setup_concurrency, &stats)
            .await
            .context("Bootstrap failed")?,
    );

    // Step 3: one activity chain per identity, plus the progress reporter
    let cancel = CancellationToken::new();
    let mut set = JoinSet::new();
    spawn_chains(&pool, &client, &stats, delay, &cancel, &mut set);
    set.spawn(run_stats_reporter(Arc::clone(&stats), stats_interval, cancel.clone()));

    // Step 4: wait for the run to end
    match duration {
        Some(d) => {
            info!(duration_secs = d.as_secs(), "Swarm running");
            tokio::select! {
                _ = tokio::time::sleep(d) => info!("Duration elapsed"),
                _ = shutdown_signal() => {}
            }
        }
        None => {
            info!("Swarm running until Ctrl+C");
            shutdown_signal().await;
        }
    }

    // Step 5: stop chains, letting in-flight attempts finish
    info!("Shutting down...");
    cancel.cancel();
    drain(set).await;

    log_final_report(&stats.snapshot());
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = interrupt() => info!("Received SIGINT"),
        _ = terminate() => info!("Received SIGTERM"),
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Joins every task, aborting whatever is still running after `DRAIN_TIMEOUT`.
async fn drain(mut set: JoinSet<()>) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;

    loop {
        tokio::select! {
            result = set.join_next() => match result {
                Some(Ok(())) => {}
                Some(Err(e)) => warn!(error = %e, "Task panicked during shutdown"),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline) => {
                warn!(remaining = set.len(), "Drain timeout reached, aborting remaining tasks");
                set.abort_all();
                while set.join_next().await.is_some() {}
                break;
            }
        }
    }
}
