//! # Awful Content Fetch
//!
//! Concurrent article fetching, extraction and scoring.
//!
//! Given a batch of article URLs, the pipeline downloads each page with a
//! bounded number of requests in flight, retries transient failures with
//! exponential backoff, extracts clean article text and metadata through a
//! tiered extractor, scores the result, and returns one result per URL in
//! input order together with batch statistics.
//!
//! ## Architecture
//!
//! 1. **Scheduling** ([`scheduler`]): at most `K` fetch+extract operations at once
//! 2. **Fetching** ([`fetcher`], [`retry`]): allow-list, per-attempt timeout, backoff
//! 3. **Extraction** ([`extractor`]): readability → article-parser → fallback
//! 4. **Aggregation** ([`aggregator`]): counts, mean timings, failure reasons
//!
//! [`client::ContentClient`] wraps the pipeline for candidate-article records.
//!
//! ```no_run
//! use awful_content_fetch::{BatchOptions, HttpFetcher, Pipeline, PipelineConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::new(HttpFetcher::new(&config)?, config)?;
//! let urls = vec!["https://apnews.com/article/example".to_string()];
//! let outcome = pipeline.run_batch(&urls, BatchOptions::default()).await?;
//! println!("{} words", outcome.stats.total_words);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod input;
pub mod models;
pub mod outputs;
pub mod retry;
pub mod scheduler;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ArticlesWithContent, ContentClient, EnrichedArticle};
pub use config::PipelineConfig;
pub use error::{ConfigError, ErrorCode, FetchError};
pub use extractor::extract_article;
pub use fetcher::{Fetch, FetchedPage, HttpFetcher};
pub use models::{
    ArticleContent, ArticleContentResult, BatchStats, CandidateArticle, FetchFailure, FetchTiming,
};
pub use scheduler::{BatchOptions, BatchOutcome, BatchProgress, Pipeline};
