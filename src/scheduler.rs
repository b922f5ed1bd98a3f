//! Concurrent batch execution.
//!
//! [`Pipeline::run_batch`] fetches and extracts a list of URLs with at most
//! `K` operations in flight, and returns exactly one result per input URL in
//! input order no matter in which order they finish. Results are folded into
//! [`BatchStats`] as they arrive, and each completion is announced on the
//! optional progress channel.
//!
//! A batch stops early when its [`CancellationToken`] fires or the configured
//! batch deadline passes. Results that were already complete are kept;
//! everything else, including work that was in flight, is reported with the
//! `CANCELED` code.

use crate::aggregator::StatsAccumulator;
use crate::config::PipelineConfig;
use crate::error::{ConfigError, ErrorCode};
use crate::extractor::extract_article;
use crate::fetcher::Fetch;
use crate::models::{ArticleContentResult, BatchStats, FetchFailure, FetchTiming};
use crate::retry::RetryFetch;
use futures::stream::{self, StreamExt};
use std::pin::pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Per-call knobs for [`Pipeline::run_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Overrides `concurrency_limit` for this call; must be at least 1.
    pub max_concurrency: Option<usize>,
    /// Receives one [`BatchProgress`] per URL as it completes.
    pub progress: Option<UnboundedSender<BatchProgress>>,
    /// Stops the batch early when cancelled.
    pub cancel: Option<CancellationToken>,
}

/// Announcement that one URL reached its terminal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Position of the URL in the input.
    pub index: usize,
    pub url: String,
    pub success: bool,
    /// Results completed so far, this one included.
    pub completed: usize,
    pub total: usize,
}

/// Results in input order plus their statistics.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<ArticleContentResult>,
    pub stats: BatchStats,
}

/// Fetch, extract and score pipeline over a [`Fetch`] implementation.
#[derive(Debug)]
pub struct Pipeline<F> {
    fetcher: RetryFetch<F>,
    config: PipelineConfig,
}

impl<F> Pipeline<F>
where
    F: Fetch,
{
    /// Validate `config` once and wrap `fetcher` with the retry policy.
    pub fn new(fetcher: F, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fetcher: RetryFetch::new(fetcher, &config),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `urls` concurrently and return one result per URL, in order.
    ///
    /// # Arguments
    ///
    /// * `urls` - Article URLs; duplicates are processed independently
    /// * `options` - Per-call concurrency override, progress channel and
    ///   cancellation token
    ///
    /// # Returns
    ///
    /// A [`BatchOutcome`] whose `results[i]` belongs to `urls[i]`, plus the
    /// folded [`BatchStats`]. A canceled or timed-out batch still returns a
    /// full result set; unfinished URLs carry the `CANCELED` code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] when `max_concurrency` is
    /// `Some(0)`. Per-URL failures never surface here.
    #[instrument(level = "info", skip_all, fields(total = urls.len()))]
    pub async fn run_batch(
        &self,
        urls: &[String],
        options: BatchOptions,
    ) -> Result<BatchOutcome, ConfigError> {
        let limit = match options.max_concurrency {
            Some(0) => return Err(ConfigError::InvalidConcurrency(0)),
            Some(k) => k,
            None => self.config.concurrency_limit,
        };

        let total = urls.len();
        if total == 0 {
            debug!("Empty batch; nothing to fetch");
            return Ok(BatchOutcome {
                results: Vec::new(),
                stats: BatchStats::default(),
            });
        }

        let t0 = Instant::now();
        info!(concurrency = limit, "Starting batch");

        let cancel = options.cancel.unwrap_or_default();
        let batch_timeout = self.config.batch_timeout();
        let mut deadline = pin!(async move {
            match batch_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        });

        let mut slots: Vec<Option<ArticleContentResult>> = (0..total).map(|_| None).collect();
        let mut stats = StatsAccumulator::new();
        let progress = options.progress;
        let announce = |index: usize, result: &ArticleContentResult, stats: &mut StatsAccumulator| {
            stats.record(result);
            if let Some(tx) = &progress {
                // A dropped receiver only means nobody is listening any more.
                let _ = tx.send(BatchProgress {
                    index,
                    url: result.url().to_string(),
                    success: result.success(),
                    completed: stats.recorded(),
                    total,
                });
            }
        };

        let mut interrupted: Option<&'static str> = None;
        {
            let mut in_flight = pin!(
                stream::iter(urls.iter().enumerate())
                    .map(|(index, url)| async move { (index, self.process_one(url).await) })
                    .buffer_unordered(limit.min(total))
            );

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        interrupted = Some("canceled");
                        break;
                    }
                    _ = &mut deadline => {
                        interrupted = Some("batch deadline exceeded");
                        break;
                    }
                    next = in_flight.next() => {
                        let Some((index, result)) = next else { break };
                        announce(index, &result, &mut stats);
                        slots[index] = Some(result);
                    }
                }
            }
            // Dropping the stream here aborts whatever is still in flight.
        }

        if let Some(reason) = interrupted {
            let remaining = slots.iter().filter(|slot| slot.is_none()).count();
            warn!(reason, remaining, completed = total - remaining, "Batch stopped early");
        }

        let results: Vec<ArticleContentResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(result) => result,
                None => {
                    let url = &urls[index];
                    let result = ArticleContentResult::failed(
                        url.clone(),
                        FetchFailure::canceled(url),
                        FetchTiming::default(),
                    );
                    announce(index, &result, &mut stats);
                    result
                }
            })
            .collect();

        let stats = stats.finish();
        info!(
            successful = stats.successful_fetches,
            failed = stats.failed_fetches,
            total_words = stats.total_words,
            elapsed_ms = millis(t0.elapsed()),
            "Batch complete"
        );
        Ok(BatchOutcome { results, stats })
    }

    async fn process_one(&self, url: &str) -> ArticleContentResult {
        let t0 = Instant::now();
        match self.fetcher.fetch(url).await {
            Ok(retried) => {
                let fetch_time = millis(retried.elapsed);
                let page = retried.page;
                let page_url = if page.final_url.is_empty() {
                    url.to_string()
                } else {
                    page.final_url
                };
                debug!(%url, status = page.status, retries = retried.retry_count, "Page fetched");

                // Parsing is CPU-bound; keep it off the task driving the other fetches.
                let parse_t0 = Instant::now();
                let html = page.html;
                let parsed = tokio::task::spawn_blocking(move || {
                    let content = extract_article(&html, &page_url);
                    (content, html)
                })
                .await;
                let parse_time = millis(parse_t0.elapsed());

                let (mut content, html) = match parsed {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        error!(%url, error = %e, "Extraction task failed");
                        let timing = FetchTiming {
                            fetch_time,
                            parse_time,
                            total_time: millis(t0.elapsed()).max(fetch_time + parse_time),
                        };
                        return ArticleContentResult::failed(
                            url,
                            FetchFailure::new(
                                ErrorCode::ExtractionFailed,
                                format!("extraction failed for {url}: {e}"),
                            ),
                            timing,
                        );
                    }
                };

                if self.config.include_raw_html {
                    content.raw_html = Some(html);
                }

                debug!(
                    %url,
                    words = content.word_count,
                    quality = content.quality_score,
                    "Article extracted"
                );
                let timing = FetchTiming {
                    fetch_time,
                    parse_time,
                    total_time: millis(t0.elapsed()).max(fetch_time + parse_time),
                };
                ArticleContentResult::succeeded(url, content, timing)
            }
            Err(failure) => {
                info!(
                    %url,
                    code = %failure.failure.code,
                    retries = failure.failure.retry_count,
                    "Article fetch failed"
                );
                let fetch_time = millis(failure.elapsed);
                let timing = FetchTiming {
                    fetch_time,
                    parse_time: 0,
                    total_time: millis(t0.elapsed()).max(fetch_time),
                };
                ArticleContentResult::failed(url, failure.failure, timing)
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
