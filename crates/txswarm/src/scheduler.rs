//! Per-identity activity chains.
//!
//! Each chain alternates between a random wait and one transaction attempt,
//! forever. Rescheduling is a flat loop, so a chain's stack and memory stay
//! constant no matter how long the run lasts.

use std::{sync::Arc, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    builder::{self, NoOpReason, Plan},
    client::LedgerApi,
    pool::SharedIdentityPool,
    stats::SharedStats,
};

/// Window the inter-attempt delay is drawn from: whole seconds in `[1, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    max_secs: u64,
}

impl DelayWindow {
    /// Builds a window up to `max`, rounded down to whole seconds and never below 1s.
    pub fn up_to(max: Duration) -> Self {
        Self { max_secs: max.as_secs().max(1) }
    }

    pub const fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }

    pub fn draw(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_secs(rng.gen_range(1..=self.max_secs))
    }
}

/// Result of one `Executing` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Submitted,
    NoOp(NoOpReason),
    Failed,
}

/// One identity's indefinite wait-then-attempt loop.
pub struct ActivityChain<C: LedgerApi> {
    index: usize,
    pool: SharedIdentityPool,
    client: Arc<C>,
    stats: SharedStats,
    delay: DelayWindow,
    rng: StdRng,
}

impl<C: LedgerApi> ActivityChain<C> {
    /// Creates the chain for pool member `index`, or `None` if no such member exists.
    pub fn new(
        index: usize,
        pool: SharedIdentityPool,
        client: Arc<C>,
        stats: SharedStats,
        delay: DelayWindow,
    ) -> Option<Self> {
        pool.get(index)?;
        Some(Self { index, pool, client, stats, delay, rng: StdRng::from_entropy() })
    }

    /// Replaces the chain's RNG, for reproducible runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Runs until `cancel` fires. An attempt already executing always completes first.
    pub async fn run(mut self, cancel: CancellationToken) {
        debug!(identity = self.index, "Activity chain started");

        loop {
            let delay = self.delay.draw(&mut self.rng);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            self.execute_once().await;
        }

        debug!(identity = self.index, "Activity chain stopped");
    }

    /// Fetches fresh unspent outputs, builds a transaction and submits it.
    ///
    /// Errors are logged and counted, never propagated: the chain carries on
    /// with its next wait either way.
    pub async fn execute_once(&mut self) -> AttemptOutcome {
        self.stats.record_attempt();
        let sender = &self.pool.all()[self.index];

        let unspent = match self.client.list_unspent(&sender.address).await {
            Ok(unspent) => unspent,
            Err(e) => {
                warn!(
                    identity = self.index,
                    address = %sender.address,
                    error = %e,
                    "Failed to list unspent outputs"
                );
                self.stats.record_failed();
                return AttemptOutcome::Failed;
            }
        };

        let request = match builder::build(sender, &self.pool, &unspent, &mut self.rng) {
            Plan::Submit(request) => request,
            Plan::NoOp(reason) => {
                debug!(identity = self.index, reason = ?reason, "Nothing to spend");
                self.stats.record_no_op();
                return AttemptOutcome::NoOp(reason);
            }
        };

        match self.client.submit_transaction(&request).await {
            Ok(_) => {
                debug!(
                    identity = self.index,
                    inputs = request.input_ids.len(),
                    outputs = request.outputs.len(),
                    value = request.output_total(),
                    "Transaction submitted"
                );
                self.stats.record_submitted();
                AttemptOutcome::Submitted
            }
            Err(e) => {
                warn!(
                    identity = self.index,
                    address = %sender.address,
                    error = %e,
                    "Failed to submit transaction"
                );
                self.stats.record_failed();
                AttemptOutcome::Failed
            }
        }
    }
}
