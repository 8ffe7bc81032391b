use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::SwarmConfig;

#[derive(Debug, Parser)]
#[command(name = "txswarm", version)]
#[command(
    about = "Synthetic ledger load generator - mints and funds identities, then has each one send randomized transactions forever"
)]
pub struct Args {
    /// YAML config file. Flags and env vars override its values.
    #[arg(long, env = "TXSWARM_CONFIG")]
    pub config: Option<PathBuf>,

    // ========== Ledger ==========

    /// Base URL of the ledger node's REST API
    #[arg(long, env = "TXSWARM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Per-request timeout (e.g. "30s")
    #[arg(long, env = "TXSWARM_REQUEST_TIMEOUT")]
    pub request_timeout: Option<String>,

    // ========== Identities ==========

    /// Exact number of identities (overrides --min-identities/--max-identities)
    #[arg(long, env = "TXSWARM_IDENTITIES")]
    pub identities: Option<usize>,

    /// Lower bound of the random pool size
    #[arg(long, env = "TXSWARM_MIN_IDENTITIES")]
    pub min_identities: Option<usize>,

    /// Upper bound of the random pool size
    #[arg(long, env = "TXSWARM_MAX_IDENTITIES")]
    pub max_identities: Option<usize>,

    /// Identities enrolled in parallel during bootstrap
    #[arg(long, env = "TXSWARM_SETUP_CONCURRENCY")]
    pub setup_concurrency: Option<usize>,

    // ========== Activity ==========

    /// Longest wait between two attempts of one identity (e.g. "10m")
    #[arg(long, env = "TXSWARM_MAX_DELAY")]
    pub max_delay: Option<String>,

    /// Run duration (e.g. "1h"). Runs until Ctrl+C if not specified
    #[arg(long, env = "TXSWARM_DURATION")]
    pub duration: Option<String>,

    /// Interval between progress log lines
    #[arg(long, env = "TXSWARM_STATS_INTERVAL")]
    pub stats_interval: Option<String>,

    // ========== Logging ==========

    /// Log filter directive (e.g. "info", "txswarm=debug")
    #[arg(long, env = "TXSWARM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format: `json` or `text`
    #[arg(long, env = "TXSWARM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Args {
    /// Layers defaults, the optional config file, then flags, and validates the result.
    pub fn resolve_config(&self) -> Result<SwarmConfig> {
        let mut config = match &self.config {
            Some(path) => SwarmConfig::load(path)?,
            None => SwarmConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut SwarmConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout) = &self.request_timeout {
            config.request_timeout = timeout.clone();
        }
        if let Some(min) = self.min_identities {
            config.min_identities = min;
        }
        if let Some(max) = self.max_identities {
            config.max_identities = max;
        }
        if let Some(n) = self.identities {
            config.min_identities = n;
            config.max_identities = n;
        }
        if let Some(concurrency) = self.setup_concurrency {
            config.setup_concurrency = concurrency;
        }
        if let Some(delay) = &self.max_delay {
            config.max_delay = delay.clone();
        }
        if let Some(duration) = &self.duration {
            config.duration = Some(duration.clone());
        }
        if let Some(interval) = &self.stats_interval {
            config.stats_interval = interval.clone();
        }
    }
}
