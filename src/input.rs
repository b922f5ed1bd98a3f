//! Batch input parsing.
//!
//! Accepts either a JSON array of candidate-article records or a plain list
//! with one URL per line. Blank lines and `#` comments are skipped in the
//! line format.

use crate::models::CandidateArticle;
use tracing::{debug, instrument};
use url::Url;

/// Parse an input document into candidate articles.
#[instrument(level = "info", skip_all, fields(bytes = raw.len()))]
pub fn parse_candidates(raw: &str) -> Result<Vec<CandidateArticle>, serde_json::Error> {
    let trimmed = raw.trim_start();
    let candidates: Vec<CandidateArticle> = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<CandidateArticle>>(trimmed)?
            .into_iter()
            .map(fill_domain)
            .collect()
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(candidate_from_url)
            .collect()
    };
    debug!(count = candidates.len(), "Parsed batch input");
    Ok(candidates)
}

/// A bare candidate record for a URL given on the command line.
pub fn candidate_from_url(url: &str) -> CandidateArticle {
    fill_domain(CandidateArticle {
        url: url.trim().to_string(),
        ..CandidateArticle::default()
    })
}

fn fill_domain(mut article: CandidateArticle) -> CandidateArticle {
    if article.domain.is_empty() {
        if let Some(host) = Url::parse(&article.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
        {
            article.domain = host.trim_start_matches("www.").to_string();
        }
    }
    article
}
