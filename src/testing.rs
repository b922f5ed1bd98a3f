//! Test doubles for the fetch layer.
//!
//! [`MockFetcher`] serves canned article pages without touching the network,
//! lets individual URLs fail a scripted number of times first, and records
//! call counts and peak concurrency for assertions.

use crate::error::FetchError;
use crate::fetcher::{Fetch, FetchedPage};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// A deterministic article page with `paragraphs` paragraphs of prose.
pub fn article_html(title: &str, paragraphs: usize) -> String {
    let body = (0..paragraphs)
        .map(|i| {
            format!(
                "<p>Paragraph {i} of the report explains, in plain language, how the city council \
                 voted on the transit budget, which neighborhoods gain new routes, and when the \
                 changes take effect for riders across the region.</p>"
            )
        })
        .collect::<String>();
    format!(
        r#"<!DOCTYPE html>
<html lang="en-US">
<head>
  <title>{title} | Example News</title>
  <meta property="og:title" content="{title}">
  <meta name="author" content="Jane Reporter">
  <meta property="article:published_time" content="2025-05-06T14:30:00Z">
</head>
<body>
  <nav><a href="/">Home</a> <a href="/world">World</a></nav>
  <article class="story-body"><h1>{title}</h1>{body}</article>
  <footer>Copyright Example News</footer>
</body>
</html>"#
    )
}

/// Scripted [`Fetch`] implementation.
#[derive(Default)]
pub struct MockFetcher {
    /// Errors returned (in order) before a URL starts succeeding.
    failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    /// Per-URL response latency overrides.
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn delay_url(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn fail_then_succeed(&self, url: &str, errors: Vec<FetchError>) {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), errors.into());
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the request future is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetch for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let key = url.as_str().to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        Ok(FetchedPage {
            final_url: key,
            status: 200,
            html: article_html("City council approves transit budget", 6),
        })
    }
}
