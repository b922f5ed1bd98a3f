//! Error types for the fetch pipeline.
//!
//! Two layers of errors exist:
//!
//! - [`FetchError`]: the outcome of a single fetch attempt, classified so the
//!   retry controller can decide whether another attempt is worthwhile.
//! - [`ConfigError`]: upfront validation failures. These are the only errors a
//!   batch call ever returns; per-URL failures are reported inside each
//!   result instead.
//!
//! [`ErrorCode`] is the stable wire code attached to every failed result and
//! used as the key of `BatchStats::failure_reasons`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable failure codes reported on failed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "DOMAIN_NOT_ALLOWED")]
    DomainNotAllowed,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "NETWORK_ERROR")]
    NetworkError,
    #[serde(rename = "HTTP_4XX")]
    Http4xx,
    #[serde(rename = "HTTP_5XX")]
    Http5xx,
    #[serde(rename = "INVALID_URL")]
    InvalidUrl,
    #[serde(rename = "FETCH_ERROR")]
    FetchError,
    /// The extraction task died; the fallback tier itself always yields a result.
    #[serde(rename = "EXTRACTION_FAILED")]
    ExtractionFailed,
    #[serde(rename = "CANCELED")]
    Canceled,
}

impl ErrorCode {
    /// The wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Http4xx => "HTTP_4XX",
            ErrorCode::Http5xx => "HTTP_5XX",
            ErrorCode::InvalidUrl => "INVALID_URL",
            ErrorCode::FetchError => "FETCH_ERROR",
            ErrorCode::ExtractionFailed => "EXTRACTION_FAILED",
            ErrorCode::Canceled => "CANCELED",
        }
    }

    /// Whether a failure with this code is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::Timeout | ErrorCode::NetworkError | ErrorCode::Http5xx
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single failed fetch attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out fetching {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("domain not allowed: {0}")]
    DomainNotAllowed(String),
    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Map the attempt error onto its wire code.
    pub fn code(&self) -> ErrorCode {
        match self {
            FetchError::Timeout(_) => ErrorCode::Timeout,
            FetchError::Network(_) => ErrorCode::NetworkError,
            FetchError::Status { status, .. } if (400..500).contains(status) => ErrorCode::Http4xx,
            FetchError::Status { status, .. } if (500..600).contains(status) => ErrorCode::Http5xx,
            FetchError::Status { .. } => ErrorCode::FetchError,
            FetchError::InvalidUrl(_) => ErrorCode::InvalidUrl,
            FetchError::DomainNotAllowed(_) => ErrorCode::DomainNotAllowed,
            FetchError::Other(_) => ErrorCode::FetchError,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// Configuration rejected before any work started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("concurrency limit must be at least 1 (got {0})")]
    InvalidConcurrency(usize),
    #[error("timeout_ms must be greater than zero")]
    InvalidTimeout,
    #[error("backoff_multiplier must be >= 1.0 (got {0})")]
    InvalidBackoffMultiplier(f64),
    #[error("max_retry_delay_ms ({max}) must not be below retry_delay_ms ({base})")]
    InvalidRetryDelay { base: u64, max: u64 },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
