//! Batch statistics.
//!
//! [`StatsAccumulator`] folds results one at a time so the scheduler can keep
//! running totals while results stream in; [`BatchStats::from_results`] runs
//! the same fold over a finished slice.

use crate::models::{ArticleContentResult, BatchStats};
use std::collections::BTreeMap;

/// Incremental fold of [`ArticleContentResult`]s into [`BatchStats`].
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    total: usize,
    successful: usize,
    fetch_time_sum: u64,
    parse_time_sum: u64,
    total_time_sum: u64,
    total_words: usize,
    failure_reasons: BTreeMap<String, usize>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &ArticleContentResult) {
        let timing = result.timing();
        self.total += 1;
        self.fetch_time_sum = self.fetch_time_sum.saturating_add(timing.fetch_time);
        self.parse_time_sum = self.parse_time_sum.saturating_add(timing.parse_time);
        self.total_time_sum = self.total_time_sum.saturating_add(timing.total_time);

        if let Some(content) = result.content() {
            self.successful += 1;
            self.total_words += content.word_count;
        }
        if let Some(error) = result.error() {
            *self
                .failure_reasons
                .entry(error.code.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    pub fn recorded(&self) -> usize {
        self.total
    }

    pub fn finish(&self) -> BatchStats {
        let mean = |sum: u64| {
            if self.total == 0 {
                0.0
            } else {
                sum as f64 / self.total as f64
            }
        };
        BatchStats {
            total_articles: self.total,
            successful_fetches: self.successful,
            failed_fetches: self.total - self.successful,
            average_fetch_time: mean(self.fetch_time_sum),
            average_parse_time: mean(self.parse_time_sum),
            total_fetch_time: self.total_time_sum,
            total_words: self.total_words,
            failure_reasons: self.failure_reasons.clone(),
        }
    }
}

impl BatchStats {
    /// Compute statistics over a complete set of results.
    pub fn from_results(results: &[ArticleContentResult]) -> Self {
        let mut acc = StatsAccumulator::new();
        results.iter().for_each(|r| acc.record(r));
        acc.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::FetchFailure;
    use crate::models::fixtures::{content_with_words, timing};

    fn mixed_results() -> Vec<ArticleContentResult> {
        vec![
            ArticleContentResult::succeeded("https://a.example/1", content_with_words(50), timing(100, 20)),
            ArticleContentResult::failed(
                "https://b.example/2",
                FetchFailure::new(ErrorCode::FetchError, "HTTP 302 loop"),
                timing(40, 0),
            ),
        ]
    }

    #[test]
    fn test_one_success_one_failure() {
        let stats = BatchStats::from_results(&mixed_results());

        assert_eq!(stats.total_articles, 2);
        assert_eq!(stats.successful_fetches, 1);
        assert_eq!(stats.failed_fetches, 1);
        assert_eq!(stats.total_words, 50);
        assert_eq!(stats.failure_reasons.get("FETCH_ERROR"), Some(&1));
        assert_eq!(stats.failure_reasons.len(), 1);
        assert!((stats.average_fetch_time - 70.0).abs() < 1e-9);
        assert!((stats.average_parse_time - 10.0).abs() < 1e-9);
        assert_eq!(stats.total_fetch_time, 160);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalArticles"], 2);
        assert_eq!(json["failureReasons"]["FETCH_ERROR"], 1);
    }

    #[test]
    fn test_empty_batch_has_zero_averages() {
        let stats = BatchStats::from_results(&[]);
        assert_eq!(stats, BatchStats::default());
        assert_eq!(stats.average_fetch_time, 0.0);
        assert!(stats.failure_reasons.is_empty());
    }

    #[test]
    fn test_incremental_fold_matches_batch() {
        let results = mixed_results();
        let mut acc = StatsAccumulator::new();
        for result in results.iter().rev() {
            acc.record(result);
        }
        assert_eq!(acc.recorded(), 2);
        assert_eq!(acc.finish(), BatchStats::from_results(&results));
    }

    #[test]
    fn test_counts_partition_total() {
        let mut results = mixed_results();
        results.push(ArticleContentResult::failed(
            "https://c.example/3",
            FetchFailure::canceled("https://c.example/3"),
            timing(0, 0),
        ));
        let stats = BatchStats::from_results(&results);

        assert_eq!(stats.successful_fetches + stats.failed_fetches, stats.total_articles);
        assert_eq!(stats.failure_reasons.values().sum::<usize>(), stats.failed_fetches);
    }
}
