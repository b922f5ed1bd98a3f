//! Data models for fetched articles and their extracted representations.
//!
//! This module defines the records that flow through the pipeline:
//! - [`CandidateArticle`]: an article record handed over by the search-results collaborator
//! - [`ArticleContent`]: clean text and metadata extracted from one page
//! - [`ArticleContentResult`]: the terminal per-URL record, success or failure
//! - [`BatchStats`]: batch-level statistics folded from all results
//!
//! Field names serialize as camelCase to match the JSON shape consumers of the
//! outer client already expect.

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An article record produced by the search-results collaborator.
///
/// Only `url` feeds the pipeline; the remaining fields are carried through
/// untouched and re-attached to the enriched output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateArticle {
    pub url: String,
    pub title: String,
    pub seendate: String,
    pub domain: String,
    pub language: String,
    pub sourcecountry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socialimage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<f64>,
}

/// Extraction tier that produced the article text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    #[serde(rename = "readability")]
    Readability,
    #[serde(rename = "article-parser")]
    ArticleParser,
    #[serde(rename = "fallback")]
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Readability => "readability",
            ExtractionMethod::ArticleParser => "article-parser",
            ExtractionMethod::Fallback => "fallback",
        }
    }
}

/// Structured metadata scraped alongside the article text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    /// `og:*` properties, keyed without the `og:` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_graph: Option<BTreeMap<String, String>>,
    /// `twitter:*` properties, keyed without the `twitter:` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_card: Option<BTreeMap<String, String>>,
    /// `article:*` properties, keyed without the `article:` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    pub extraction_method: ExtractionMethod,
    /// The chosen tier's own signal strength, in `[0, 1]`.
    pub extraction_confidence: f64,
}

/// Clean article content extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub word_count: usize,
    #[serde(rename = "rawHTML", skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    pub metadata: ContentMetadata,
    pub paywall_detected: bool,
    /// Blended confidence that the text is a complete article body, in `[0, 1]`.
    pub quality_score: f64,
}

/// Wall-clock timings for one URL, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTiming {
    pub fetch_time: u64,
    pub parse_time: u64,
    pub total_time: u64,
}

/// Terminal failure for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    pub message: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub retry_count: u32,
}

impl FetchFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status_code: None,
            retry_count: 0,
        }
    }

    pub fn canceled(url: &str) -> Self {
        Self::new(ErrorCode::Canceled, format!("batch canceled before {url} completed"))
    }
}

/// Either extracted content or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentOutcome {
    Content(ArticleContent),
    Error(FetchFailure),
}

/// Terminal per-URL record.
///
/// Built only through [`ArticleContentResult::succeeded`] and
/// [`ArticleContentResult::failed`], so `success` always agrees with which
/// side of the outcome is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleContentResult {
    url: String,
    success: bool,
    #[serde(flatten)]
    outcome: ContentOutcome,
    timing: FetchTiming,
}

impl ArticleContentResult {
    pub fn succeeded(url: impl Into<String>, content: ArticleContent, timing: FetchTiming) -> Self {
        Self {
            url: url.into(),
            success: true,
            outcome: ContentOutcome::Content(content),
            timing,
        }
    }

    pub fn failed(url: impl Into<String>, error: FetchFailure, timing: FetchTiming) -> Self {
        Self {
            url: url.into(),
            success: false,
            outcome: ContentOutcome::Error(error),
            timing,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn content(&self) -> Option<&ArticleContent> {
        match &self.outcome {
            ContentOutcome::Content(content) => Some(content),
            ContentOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchFailure> {
        match &self.outcome {
            ContentOutcome::Content(_) => None,
            ContentOutcome::Error(error) => Some(error),
        }
    }

    pub fn timing(&self) -> FetchTiming {
        self.timing
    }

    pub fn into_parts(self) -> (String, ContentOutcome, FetchTiming) {
        (self.url, self.outcome, self.timing)
    }
}

/// Statistics for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_articles: usize,
    pub successful_fetches: usize,
    pub failed_fetches: usize,
    /// Mean fetch time over all results, in milliseconds.
    pub average_fetch_time: f64,
    /// Mean parse time over all results, in milliseconds.
    pub average_parse_time: f64,
    /// Sum of per-URL total times, in milliseconds.
    pub total_fetch_time: u64,
    pub total_words: usize,
    pub failure_reasons: BTreeMap<String, usize>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_success_result_shape() {
        let result = ArticleContentResult::succeeded(
            "https://example.com/a",
            content_with_words(3),
            timing(10, 2),
        );

        assert!(result.success());
        assert!(result.content().is_some());
        assert!(result.error().is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["content"]["wordCount"], 3);
        assert_eq!(json["content"]["metadata"]["extractionMethod"], "readability");
        assert!(json.get("error").is_none());
        assert_eq!(json["timing"]["totalTime"], 12);
    }

    #[test]
    fn test_failure_result_shape() {
        let mut failure = FetchFailure::new(ErrorCode::Http4xx, "HTTP 404");
        failure.status_code = Some(404);
        let result = ArticleContentResult::failed("https://example.com/b", failure, timing(5, 0));

        assert!(!result.success());
        assert!(result.content().is_none());
        assert_eq!(result.error().map(|e| e.code), Some(ErrorCode::Http4xx));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "HTTP_4XX");
        assert_eq!(json["error"]["statusCode"], 404);
        assert_eq!(json["error"]["retryCount"], 0);
        assert!(json.get("content").is_none());
    }

    #[test]
    fn test_candidate_article_tolerates_missing_fields() {
        let json = r#"{"url": "https://npr.org/x", "title": "X", "tone": -1.5}"#;
        let article: CandidateArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.url, "https://npr.org/x");
        assert_eq!(article.tone, Some(-1.5));
        assert!(article.socialimage.is_none());
        assert!(article.domain.is_empty());
    }

    #[test]
    fn test_canceled_failure() {
        let failure = FetchFailure::canceled("https://example.com");
        assert_eq!(failure.code, ErrorCode::Canceled);
        assert_eq!(failure.retry_count, 0);
        assert!(failure.message.contains("example.com"));
    }
}
