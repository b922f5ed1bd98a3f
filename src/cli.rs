//! Command-line interface definitions for Awful Content Fetch.
//!
//! All tuning flags are optional and override the values loaded from the
//! YAML config file (or the built-in defaults when no file is given).

use awful_content_fetch::config::PipelineConfig;
use clap::Parser;

/// Command-line arguments for the Awful Content Fetch application.
///
/// # Examples
///
/// ```sh
/// # URLs on the command line
/// awful_content_fetch -j ./json https://apnews.com/article/x https://www.npr.org/y
///
/// # Candidate records from a search step, restricted to two hosts
/// awful_content_fetch -j ./json -i candidates.json \
///     --allowed-domain apnews.com --allowed-domain npr.org --concurrency 8
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Article URLs to fetch
    pub urls: Vec<String>,

    /// File with a JSON array of candidate articles or one URL per line
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output directory for the JSON report
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "CONTENT_FETCH_CONFIG")]
    pub config: Option<String>,

    /// Maximum simultaneous fetches
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// User-Agent header sent with every request
    #[arg(long, env = "CONTENT_FETCH_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Only fetch from this host or its subdomains (repeatable)
    #[arg(long = "allowed-domain")]
    pub allowed_domains: Vec<String>,

    /// Attempts per URL for transient failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Timeout for a single attempt in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Deadline for the whole batch in milliseconds
    #[arg(long)]
    pub batch_timeout_ms: Option<u64>,

    /// Keep the raw HTML of each page in the report
    #[arg(long)]
    pub include_raw_html: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file or default configuration.
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency_limit = concurrency;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if !self.allowed_domains.is_empty() {
            config.allowed_domains = self.allowed_domains.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(batch_timeout_ms) = self.batch_timeout_ms {
            config.batch_timeout_ms = Some(batch_timeout_ms);
        }
        if self.include_raw_html {
            config.include_raw_html = true;
        }
    }
}
