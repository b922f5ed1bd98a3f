//! Single-attempt HTTP fetching.
//!
//! [`Fetch`] is the seam between the pipeline and the network: one call, one
//! GET, one classified outcome. [`HttpFetcher`] is the `reqwest`-backed
//! implementation used in production; tests plug in scripted fetchers.
//! Retrying, backoff and the domain allow-list live one layer up in
//! [`crate::retry`].

use crate::config::PipelineConfig;
use crate::error::{ConfigError, FetchError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

/// A successfully downloaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub html: String,
}

/// Trait for a single fetch attempt.
///
/// Implementors perform exactly one request and classify the outcome into a
/// [`FetchError`] on failure. They must not retry on their own.
pub trait Fetch {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// `reqwest`-backed fetcher carrying the configured identity and timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the configured User-Agent, per-request timeout and
    /// redirect limit.
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Non-success response");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        debug!(
            bytes = html.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page body"
        );
        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            html,
        })
    }
}

impl<T: Fetch> Fetch for Arc<T> {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url).await
    }
}

fn classify_transport_error(url: &Url, e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if e.is_builder() {
        FetchError::InvalidUrl(url.to_string())
    } else if e.is_redirect() {
        FetchError::Other(format!("redirect limit exceeded for {url}"))
    } else {
        FetchError::Network(e.to_string())
    }
}
