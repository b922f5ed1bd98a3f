//! Pipeline configuration.
//!
//! All knobs live in one closed [`PipelineConfig`] value. Defaults are applied
//! once when the value is built (either [`Default`] or serde defaults while
//! loading YAML) and the result is validated once when a pipeline is
//! constructed. Nothing is merged per call; the only per-call override is
//! `BatchOptions::max_concurrency`.
//!
//! # Example `config.yaml`
//!
//! ```yaml
//! concurrency_limit: 8
//! user_agent: "awful_content_fetch/0.1"
//! allowed_domains: ["apnews.com", "npr.org"]
//! timeout_ms: 8000
//! max_retries: 2
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Identity string sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; awful_content_fetch/0.1; +https://github.com/graves/awful_content_fetch)";

/// Runtime configuration for a fetch pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum simultaneous fetch+extract operations (default: 5)
    pub concurrency_limit: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Host allow-list; empty means every host is allowed
    pub allowed_domains: Vec<String>,
    /// Timeout for a single attempt in milliseconds (default: 10000)
    pub timeout_ms: u64,
    /// Attempts per URL for transient failures, the first one included (default: 3)
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds (default: 500)
    pub retry_delay_ms: u64,
    /// Upper bound for the exponential part of the delay (default: 10000)
    pub max_retry_delay_ms: u64,
    /// Growth factor applied per retry (default: 2.0)
    pub backoff_multiplier: f64,
    /// Upper bound of the random jitter added to each delay (default: 250)
    pub jitter_ms: u64,
    /// Optional deadline for a whole batch in milliseconds
    pub batch_timeout_ms: Option<u64>,
    /// Keep the raw HTML on successful results (default: false)
    pub include_raw_html: bool,
    /// Redirects followed before giving up (default: 5)
    pub max_redirects: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_domains: Vec::new(),
            timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 500,
            max_retry_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_ms: 250,
            batch_timeout_ms: None,
            include_raw_html: false,
            max_redirects: 5,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file; missing keys take their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&raw)?;
        info!(concurrency = config.concurrency_limit, "Loaded pipeline configuration");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reject values that would make a batch impossible to run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency_limit));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(self.backoff_multiplier));
        }
        if self.max_retry_delay_ms < self.retry_delay_ms {
            return Err(ConfigError::InvalidRetryDelay {
                base: self.retry_delay_ms,
                max: self.max_retry_delay_ms,
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }
}
