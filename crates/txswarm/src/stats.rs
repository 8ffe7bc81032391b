use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lock-free counters updated by bootstrap and every activity chain.
#[derive(Debug)]
pub struct SwarmStats {
    started_at: Instant,
    enrolled: AtomicU64,
    enroll_failed: AtomicU64,
    attempts: AtomicU64,
    submitted: AtomicU64,
    no_ops: AtomicU64,
    failed: AtomicU64,
}

pub type SharedStats = Arc<SwarmStats>;

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub enrolled: u64,
    pub enroll_failed: u64,
    pub attempts: u64,
    pub submitted: u64,
    pub no_ops: u64,
    pub failed: u64,
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    /// Submitted transactions per second since start.
    pub fn tps(&self) -> f64 {
        if self.elapsed_secs > 0.0 { self.submitted as f64 / self.elapsed_secs } else { 0.0 }
    }
}

impl Default for SwarmStats {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            enrolled: AtomicU64::new(0),
            enroll_failed: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            no_ops: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

impl SwarmStats {
    pub fn shared() -> SharedStats {
        Arc::new(Self::default())
    }

    pub fn record_enrolled(&self) {
        self.enrolled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enroll_failed(&self) {
        self.enroll_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_op(&self) {
        self.no_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enrolled: self.enrolled.load(Ordering::Relaxed),
            enroll_failed: self.enroll_failed.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            no_ops: self.no_ops.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

/// Logs a progress line every `period` until `cancel` fires.
pub async fn run_stats_reporter(stats: SharedStats, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately; skip it so the first report has data.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => log_progress(&stats.snapshot()),
            _ = cancel.cancelled() => break,
        }
    }
}

fn log_progress(snapshot: &StatsSnapshot) {
    info!(
        attempts = snapshot.attempts,
        submitted = snapshot.submitted,
        no_ops = snapshot.no_ops,
        failed = snapshot.failed,
        tps = format!("{:.2}", snapshot.tps()),
        "Progress"
    );
}

/// Logs the end-of-run summary.
pub fn log_final_report(snapshot: &StatsSnapshot) {
    info!(
        identities = snapshot.enrolled,
        enroll_failed = snapshot.enroll_failed,
        attempts = snapshot.attempts,
        submitted = snapshot.submitted,
        no_ops = snapshot.no_ops,
        failed = snapshot.failed,
        elapsed_secs = format!("{:.1}", snapshot.elapsed_secs),
        tps = format!("{:.2}", snapshot.tps()),
        "Final report"
    );
}
