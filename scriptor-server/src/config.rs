//! Server configuration
//!
//! Bind address, worker pool size and the timing knobs of the job service.

use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_PARALLEL_JOBS: usize = 16;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 500;
const DEFAULT_BLOCKING_TIMEOUT_MS: u64 = 2500;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Upper bound on jobs executing at the same time
    pub max_parallel_jobs: usize,

    /// How often running jobs have their output copied into the store
    pub sample_interval: Duration,

    /// Longest time a blocking submission waits for its job to finish
    pub blocking_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bind_addr: String) -> Self {
        Self {
            bind_addr,
            max_parallel_jobs: DEFAULT_MAX_PARALLEL_JOBS,
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            blocking_timeout: Duration::from_millis(DEFAULT_BLOCKING_TIMEOUT_MS),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - SCRIPTOR_BIND_ADDR (default: 0.0.0.0:8080)
    /// - MAX_PARALLEL_JOBS (default: 16)
    /// - SAMPLE_INTERVAL_MS (milliseconds, default: 500)
    /// - BLOCKING_TIMEOUT_MS (milliseconds, default: 2500)
    ///
    /// Values that fail to parse fall back to their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("SCRIPTOR_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let max_parallel_jobs = lookup("MAX_PARALLEL_JOBS")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_PARALLEL_JOBS);

        let sample_interval = lookup("SAMPLE_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS));

        let blocking_timeout = lookup("BLOCKING_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_BLOCKING_TIMEOUT_MS));

        Self {
            bind_addr,
            max_parallel_jobs,
            sample_interval,
            blocking_timeout,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.sample_interval.is_zero() {
            anyhow::bail!("sample_interval must be greater than 0");
        }

        if self.blocking_timeout.is_zero() {
            anyhow::bail!("blocking_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BIND_ADDR.to_string())
    }
}
