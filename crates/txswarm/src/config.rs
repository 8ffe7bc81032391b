use std::{path::Path, time::Duration};

use anyhow::{Context, Result, bail, ensure};
use rand::Rng;
use serde::Deserialize;
use url::Url;

use crate::scheduler::DelayWindow;

fn default_endpoint() -> String {
    "http://127.0.0.1:8080".to_string()
}

const fn default_min_identities() -> usize {
    10
}

const fn default_max_identities() -> usize {
    100
}

fn default_max_delay() -> String {
    "600s".to_string()
}

const fn default_setup_concurrency() -> usize {
    1
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

fn default_stats_interval() -> String {
    "30s".to_string()
}

/// Run configuration, loadable from YAML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwarmConfig {
    /// Base URL of the ledger node's REST API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Lower bound of the randomly drawn pool size
    #[serde(default = "default_min_identities")]
    pub min_identities: usize,
    /// Upper bound of the randomly drawn pool size
    #[serde(default = "default_max_identities")]
    pub max_identities: usize,
    /// Longest wait between two attempts of the same identity
    #[serde(default = "default_max_delay")]
    pub max_delay: String,
    /// Identities enrolled in parallel during bootstrap
    #[serde(default = "default_setup_concurrency")]
    pub setup_concurrency: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default = "default_stats_interval")]
    pub stats_interval: String,
    /// Stop after this long. Runs until interrupted when absent.
    #[serde(default)]
    pub duration: Option<String>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            min_identities: default_min_identities(),
            max_identities: default_max_identities(),
            max_delay: default_max_delay(),
            setup_concurrency: default_setup_concurrency(),
            request_timeout: default_request_timeout(),
            stats_interval: default_stats_interval(),
            duration: None,
        }
    }
}

fn parse_humantime(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).with_context(|| format!("invalid {field}: {value}"))
}

impl SwarmConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&contents).context("failed to parse config YAML")
    }

    pub fn parse_max_delay(&self) -> Result<Duration> {
        parse_humantime("max_delay", &self.max_delay)
    }

    pub fn parse_request_timeout(&self) -> Result<Duration> {
        parse_humantime("request_timeout", &self.request_timeout)
    }

    pub fn parse_stats_interval(&self) -> Result<Duration> {
        parse_humantime("stats_interval", &self.stats_interval)
    }

    pub fn parse_duration(&self) -> Result<Option<Duration>> {
        self.duration.as_deref().map(|d| parse_humantime("duration", d)).transpose()
    }

    pub fn delay_window(&self) -> Result<DelayWindow> {
        Ok(DelayWindow::up_to(self.parse_max_delay()?))
    }

    /// Checks ranges, durations and the endpoint URL.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint URL: {}", self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("endpoint must be http or https, got {}", url.scheme());
        }

        ensure!(self.min_identities >= 1, "min_identities must be at least 1");
        ensure!(
            self.min_identities <= self.max_identities,
            "min_identities ({}) exceeds max_identities ({})",
            self.min_identities,
            self.max_identities
        );
        ensure!(self.setup_concurrency >= 1, "setup_concurrency must be at least 1");

        ensure!(self.parse_max_delay()? >= Duration::from_secs(1), "max_delay must be at least 1s");
        ensure!(!self.parse_request_timeout()?.is_zero(), "request_timeout must be positive");
        ensure!(!self.parse_stats_interval()?.is_zero(), "stats_interval must be positive");
        self.parse_duration()?;
        Ok(())
    }

    /// Draws the pool size uniformly from `[min_identities, max_identities]`.
    pub fn pick_identity_count(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(self.min_identities..=self.max_identities.max(self.min_identities))
    }
}
