//! Candidate-article enrichment.
//!
//! [`ContentClient`] takes the article records produced by the search-results
//! collaborator, runs their URLs through a [`Pipeline`], and re-attaches each
//! result to the record it came from.

use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::fetcher::Fetch;
use crate::models::{
    ArticleContent, BatchStats, CandidateArticle, ContentOutcome, FetchFailure, FetchTiming,
};
use crate::scheduler::{BatchOptions, Pipeline};
use serde::Serialize;
use tracing::{info, instrument};

/// A candidate record with its fetch outcome attached.
///
/// `content` is always present in the JSON form and is `null` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedArticle {
    #[serde(flatten)]
    pub article: CandidateArticle,
    pub content: Option<ArticleContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchFailure>,
    pub timing: FetchTiming,
}

/// Enriched articles in input order plus batch statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesWithContent {
    pub articles: Vec<EnrichedArticle>,
    pub stats: BatchStats,
}

#[derive(Debug)]
pub struct ContentClient<F> {
    pipeline: Pipeline<F>,
}

impl<F> ContentClient<F>
where
    F: Fetch,
{
    pub fn new(fetcher: F, config: PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: Pipeline::new(fetcher, config)?,
        })
    }

    pub fn pipeline(&self) -> &Pipeline<F> {
        &self.pipeline
    }

    /// Fetch content for every candidate and merge it back onto the records.
    #[instrument(level = "info", skip_all, fields(candidates = candidates.len()))]
    pub async fn fetch_contents(
        &self,
        candidates: Vec<CandidateArticle>,
        options: BatchOptions,
    ) -> Result<ArticlesWithContent, ConfigError> {
        let urls: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
        let outcome = self.pipeline.run_batch(&urls, options).await?;

        let articles: Vec<EnrichedArticle> = candidates
            .into_iter()
            .zip(outcome.results)
            .map(|(article, result)| {
                let (_, outcome, timing) = result.into_parts();
                let (content, error) = match outcome {
                    ContentOutcome::Content(content) => (Some(content), None),
                    ContentOutcome::Error(error) => (None, Some(error)),
                };
                EnrichedArticle {
                    article,
                    content,
                    error,
                    timing,
                }
            })
            .collect();

        info!(
            enriched = outcome.stats.successful_fetches,
            failed = outcome.stats.failed_fetches,
            "Candidate articles enriched"
        );
        Ok(ArticlesWithContent {
            articles,
            stats: outcome.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, FetchError};
    use crate::testing::MockFetcher;
    use std::sync::Arc;

    fn candidate(url: &str, title: &str) -> CandidateArticle {
        CandidateArticle {
            url: url.to_string(),
            title: title.to_string(),
            seendate: "20250506T143000Z".to_string(),
            domain: "news.example.com".to_string(),
            language: "English".to_string(),
            sourcecountry: "United States".to_string(),
            socialimage: None,
            tone: Some(-2.5),
        }
    }

    #[tokio::test]
    async fn test_results_reattach_to_candidates() {
        let ok_url = "https://news.example.com/ok";
        let missing_url = "https://news.example.com/missing";
        let mock = Arc::new(MockFetcher::new());
        mock.fail_then_succeed(
            missing_url,
            vec![FetchError::Status {
                status: 404,
                url: missing_url.to_string(),
            }],
        );

        let client = ContentClient::new(Arc::clone(&mock), PipelineConfig::default()).unwrap();
        let report = client
            .fetch_contents(
                vec![candidate(ok_url, "Works"), candidate(missing_url, "Gone")],
                BatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.articles.len(), 2);
        assert_eq!(report.articles[0].article.title, "Works");
        assert!(report.articles[0].content.is_some());
        assert!(report.articles[0].error.is_none());
        assert_eq!(report.articles[1].article.title, "Gone");
        assert!(report.articles[1].content.is_none());
        assert_eq!(report.articles[1].error.as_ref().map(|e| e.code), Some(ErrorCode::Http4xx));
        assert_eq!(report.stats.successful_fetches, 1);

        let json = serde_json::to_value(&report).unwrap();
        let gone = &json["articles"][1];
        assert_eq!(gone["url"], missing_url);
        assert_eq!(gone["tone"], -2.5);
        assert!(gone["content"].is_null());
        assert_eq!(gone["error"]["code"], "HTTP_4XX");
        assert!(gone["timing"]["totalTime"].is_u64());
        assert_eq!(json["articles"][0]["content"]["language"], "en");
        assert_eq!(json["stats"]["failureReasons"]["HTTP_4XX"], 1);
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let client =
            ContentClient::new(Arc::new(MockFetcher::new()), PipelineConfig::default()).unwrap();
        let report = client
            .fetch_contents(Vec::new(), BatchOptions::default())
            .await
            .unwrap();
        assert!(report.articles.is_empty());
        assert_eq!(report.stats.total_articles, 0);
        assert_eq!(client.pipeline().config(), &PipelineConfig::default());
    }
}
