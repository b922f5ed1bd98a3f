//! Bounded retries with exponential backoff around a [`Fetch`] implementation.
//!
//! [`RetryFetch`] is a decorator: it owns an inner fetcher and adds
//!
//! - URL validation (http/https with a host) before any network call,
//! - the domain allow-list filter, also before any network call,
//! - a per-attempt timeout independent of any batch deadline,
//! - up to `max_retries` attempts for transient failures (`TIMEOUT`,
//!   `NETWORK_ERROR`, `HTTP_5XX`), each failed one counted in `retry_count`.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay(n) = max(min(base * multiplier^(n-1), max_delay) + jitter(0..=jitter_ms), delay(n-1))
//! ```
//!
//! Clamping against the previous delay keeps the sequence non-decreasing even
//! though the jitter is random.

use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::fetcher::{Fetch, FetchedPage};
use crate::models::FetchFailure;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};
use url::Url;

/// Backoff curve between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: Duration,
}

impl BackoffPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.retry_delay_ms),
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
            multiplier: config.backoff_multiplier,
            jitter: Duration::from_millis(config.jitter_ms),
        }
    }

    /// Delay before retry number `retry` (1-based), never shorter than `previous`.
    pub fn delay_for(&self, retry: u32, previous: Duration) -> Duration {
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let scaled = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_millis() as f64).max(0.0);
        let jitter_ms: u64 = if self.jitter.is_zero() {
            0
        } else {
            rng().random_range(0..=self.jitter.as_millis() as u64)
        };
        let delay = Duration::from_millis(capped as u64) + Duration::from_millis(jitter_ms);
        delay.max(previous)
    }
}

/// A page fetched after zero or more retries.
#[derive(Debug, Clone)]
pub struct RetriedPage {
    pub page: FetchedPage,
    pub retry_count: u32,
    /// Time spent in the whole retry loop, backoff included.
    pub elapsed: Duration,
}

/// Terminal failure of the retry loop.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    pub failure: FetchFailure,
    pub elapsed: Duration,
}

/// Wrapper that adds validation, the allow-list and retries to any [`Fetch`].
pub struct RetryFetch<F> {
    /// The underlying single-attempt fetcher.
    inner: F,
    /// Attempts allowed per URL, the first one included.
    max_retries: u32,
    backoff: BackoffPolicy,
    /// Deadline enforced on each attempt.
    attempt_timeout: Duration,
    /// Normalised allow-list; empty allows every host.
    allowed_domains: Vec<String>,
}

impl<F> RetryFetch<F>
where
    F: Fetch,
{
    pub fn new(inner: F, config: &PipelineConfig) -> Self {
        Self {
            inner,
            max_retries: config.max_retries,
            backoff: BackoffPolicy::from_config(config),
            attempt_timeout: config.timeout(),
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| normalize_domain(d))
                .collect(),
        }
    }

    /// Fetch `url`, retrying transient failures.
    ///
    /// At most `max_retries` attempts are made (one when it is zero), and
    /// every failed transient attempt increments the reported retry count.
    ///
    /// # Arguments
    ///
    /// * `url` - The article URL; it must be http(s) with a host
    ///
    /// # Returns
    ///
    /// The fetched page together with the number of failed attempts before
    /// it, or a [`RetryFailure`] carrying the terminal error.
    ///
    /// # Errors
    ///
    /// - `INVALID_URL` or `DOMAIN_NOT_ALLOWED` before any network call,
    ///   with `retry_count == 0`
    /// - a non-retryable failure (`HTTP_4XX`, `FETCH_ERROR`) immediately,
    ///   counting only the transient failures that preceded it
    /// - the last transient failure once the attempts are used up, with
    ///   `retry_count == max_retries`
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<RetriedPage, RetryFailure> {
        let total_t0 = Instant::now();

        let parsed = parse_article_url(url).map_err(|e| terminal(e, 0, total_t0))?;
        let host = parsed.host_str().unwrap_or_default();
        if !domain_allowed(host, &self.allowed_domains) {
            info!(%host, "Host not in allow-list; skipping fetch");
            return Err(terminal(
                FetchError::DomainNotAllowed(host.to_string()),
                0,
                total_t0,
            ));
        }

        let max_attempts = self.max_retries.max(1);
        let mut failed = 0u32;
        let mut previous_delay = Duration::ZERO;
        loop {
            let attempt_t0 = Instant::now();
            let attempt = match timeout(self.attempt_timeout, self.inner.fetch(&parsed)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(url.to_string())),
            };

            match attempt {
                Ok(page) => {
                    return Ok(RetriedPage {
                        page,
                        retry_count: failed,
                        elapsed: total_t0.elapsed(),
                    });
                }
                Err(e) => {
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() {
                        warn!(
                            attempt = failed + 1,
                            code = %e.code(),
                            error = %e,
                            "fetch failed with non-retryable error"
                        );
                        return Err(terminal(e, failed, total_t0));
                    }

                    failed += 1;
                    if failed >= max_attempts {
                        error!(
                            attempt = failed,
                            max = max_attempts,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        // A zero budget still makes one attempt but reports no retries.
                        return Err(terminal(e, failed.min(self.max_retries), total_t0));
                    }

                    let delay = self.backoff.delay_for(failed, previous_delay);
                    previous_delay = delay;

                    warn!(
                        attempt = failed,
                        max = max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<F> fmt::Debug for RetryFetch<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("allowed_domains", &self.allowed_domains)
            .finish()
    }
}

fn terminal(e: FetchError, retry_count: u32, started: Instant) -> RetryFailure {
    RetryFailure {
        failure: FetchFailure {
            message: e.to_string(),
            code: e.code(),
            status_code: e.status_code(),
            retry_count,
        },
        elapsed: started.elapsed(),
    }
}

/// Parse an article URL, accepting only http(s) URLs with a host.
pub fn parse_article_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!("{raw}: unsupported scheme")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::InvalidUrl(format!("{raw}: missing host")));
    }
    Ok(url)
}

fn normalize_domain(entry: &str) -> String {
    entry
        .trim()
        .trim_start_matches("*.")
        .trim_matches('.')
        .to_ascii_lowercase()
}

/// Case-insensitive exact-or-subdomain match of `host` against `allowed`.
///
/// An empty list allows everything. Entries are expected to be normalised
/// (see [`RetryFetch::new`]); blank entries never match.
pub fn domain_allowed(host: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    allowed.iter().any(|entry| {
        !entry.is_empty()
            && (host == *entry
                || (host.len() > entry.len()
                    && host.ends_with(entry.as_str())
                    && host.as_bytes()[host.len() - entry.len() - 1] == b'.'))
    })
}
