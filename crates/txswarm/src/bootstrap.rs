//! One-time setup: mint and fund the identity pool, then start a chain per identity.

use std::sync::Arc;

use anyhow::{Result, bail};
use futures_util::stream::{self, StreamExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    client::LedgerApi,
    error::LedgerError,
    pool::{IdentityPool, SharedIdentityPool},
    scheduler::{ActivityChain, DelayWindow},
    stats::{SharedStats, SwarmStats},
    types::Identity,
};

/// Mints one identity and requests faucet funds for it.
///
/// Either failure aborts the identity: an unfunded identity is never returned.
pub async fn enroll_identity<C: LedgerApi + ?Sized>(client: &C) -> Result<Identity, LedgerError> {
    let identity = client.generate_key_pair().await?;
    client.request_faucet_funds(&identity.address).await?;
    Ok(identity)
}

/// Enrolls `count` identities, at most `concurrency` at a time, and freezes them
/// into the pool. Slots that fail are logged and skipped.
pub async fn bootstrap<C: LedgerApi + ?Sized>(
    client: &C,
    count: usize,
    concurrency: usize,
    stats: &SwarmStats,
) -> Result<IdentityPool> {
    info!(count, concurrency, "Enrolling identities");

    // `buffered` keeps slot order, so pool indices follow enrollment order.
    let results: Vec<(usize, Result<Identity, LedgerError>)> = stream::iter(0..count)
        .map(|slot| async move { (slot, enroll_identity(client).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut identities = Vec::with_capacity(count);
    for (slot, result) in results {
        match result {
            Ok(identity) => {
                info!(slot, address = %identity.address, "Identity enrolled");
                stats.record_enrolled();
                identities.push(identity);
            }
            Err(e) => {
                warn!(slot, error = %e, "Failed to enroll identity, skipping");
                stats.record_enroll_failed();
            }
        }
    }

    if identities.is_empty() {
        bail!("no identity could be enrolled ({count} attempted)");
    }

    info!(enrolled = identities.len(), requested = count, "Identity pool ready");
    Ok(IdentityPool::new(identities))
}

/// Starts one activity chain per pool identity and returns the number spawned.
/// Does not wait for any chain to make progress.
pub fn spawn_chains<C: LedgerApi + 'static>(
    pool: &SharedIdentityPool,
    client: &Arc<C>,
    stats: &SharedStats,
    delay: DelayWindow,
    cancel: &CancellationToken,
    set: &mut JoinSet<()>,
) -> usize {
    let mut spawned = 0;
    for index in 0..pool.size() {
        let Some(chain) = ActivityChain::new(
            index,
            Arc::clone(pool),
            Arc::clone(client),
            Arc::clone(stats),
            delay,
        ) else {
            continue;
        };
        set.spawn(chain.run(cancel.clone()));
        spawned += 1;
    }

    info!(chains = spawned, max_delay_secs = delay.max().as_secs(), "Activity chains started");
    spawned
}
