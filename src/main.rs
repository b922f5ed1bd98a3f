//! # Awful Content Fetch
//!
//! Fetches a batch of news articles, extracts their text and metadata, and
//! writes an enriched JSON report.
//!
//! ## Usage
//!
//! ```sh
//! awful_content_fetch -j ./json -i candidates.json
//! awful_content_fetch -j ./json https://apnews.com/article/example
//! ```
//!
//! ## Flow
//!
//! 1. **Configuration**: YAML file (optional) plus command-line overrides
//! 2. **Input**: candidate records or URLs from a file and/or the command line
//! 3. **Fetching**: concurrent fetch, extract and score, with progress logging
//! 4. **Output**: `{json_output_dir}/{date}/{time}.json`

use awful_content_fetch::config::PipelineConfig;
use awful_content_fetch::input::{candidate_from_url, parse_candidates};
use awful_content_fetch::outputs::json;
use awful_content_fetch::utils::{ensure_writable_dir, truncate_for_log};
use awful_content_fetch::{BatchOptions, BatchProgress, ContentClient, HttpFetcher};
use chrono::Local;
use clap::Parser;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let started_at = Local::now();
    info!("awful_content_fetch starting up");

    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.input, urls = args.urls.len(), "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // ---- Input ----
    let mut candidates = match &args.input {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            parse_candidates(&raw)?
        }
        None => Vec::new(),
    };
    candidates.extend(args.urls.iter().map(|url| candidate_from_url(url)));
    if candidates.is_empty() {
        warn!("No URLs given; writing an empty report");
    }
    info!(count = candidates.len(), "Total articles to fetch");

    // ---- Fetch ----
    let client = ContentClient::new(HttpFetcher::new(&config)?, config)?;
    let active = client.pipeline().config();
    info!(
        concurrency = active.concurrency_limit,
        max_retries = active.max_retries,
        timeout_ms = active.timeout_ms,
        batch_timeout_ms = ?active.batch_timeout_ms,
        allowed_domains = active.allowed_domains.len(),
        "Pipeline configured"
    );

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<BatchProgress>();
    let progress_logger = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            info!(
                index = event.index,
                url = %truncate_for_log(&event.url, 120),
                success = event.success,
                completed = event.completed,
                total = event.total,
                "Article finished"
            );
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; canceling remaining fetches");
            ctrl_c.cancel();
        }
    });

    let report = client
        .fetch_contents(
            candidates,
            BatchOptions {
                max_concurrency: None,
                progress: Some(progress_tx),
                cancel: Some(cancel),
            },
        )
        .await?;
    // The sender was moved into the batch and is dropped with it.
    if let Err(e) = progress_logger.await {
        warn!(error = %e, "Progress logger stopped unexpectedly");
    }

    let stats = &report.stats;
    info!(
        total = stats.total_articles,
        successful = stats.successful_fetches,
        failed = stats.failed_fetches,
        total_words = stats.total_words,
        average_fetch_ms = stats.average_fetch_time,
        average_parse_ms = stats.average_parse_time,
        failure_reasons = ?stats.failure_reasons,
        "Batch statistics"
    );

    // ---- Output ----
    let path = json::write_report(&report, &args.json_output_dir, &started_at).await?;
    info!(path = %path.display(), "Report written");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
