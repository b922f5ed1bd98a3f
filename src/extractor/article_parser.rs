//! Structured article parsing.
//!
//! Trusts what the publisher declared: a JSON-LD `articleBody` first, then
//! semantic containers and well-known content classes. Each source carries a
//! base reliability that is scaled by how much text it produced.

use super::{Candidate, container_text, css, normalize_whitespace, word_count};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

/// Structured sources yielding fewer words than this are rejected.
pub const MIN_STRUCTURED_WORDS: usize = 25;

const JSON_LD_RELIABILITY: f64 = 0.9;

static CONTAINERS: Lazy<Vec<(Selector, f64)>> = Lazy::new(|| {
    vec![
        (css("[itemprop='articleBody']"), 0.85),
        (css("article"), 0.75),
        (
            css(".article-body, .article__body, .article-content, .story-body, .post-content, \
                 .entry-content, .content-body, #article-body"),
            0.65,
        ),
        (css("main, [role='main']"), 0.55),
    ]
});

/// Extract article text from structured sources, best source first.
pub fn extract(document: &Html, json_ld: &[Value]) -> Option<Candidate> {
    if let Some(body) = json_ld_article_body(json_ld) {
        let words = word_count(&body);
        if words >= MIN_STRUCTURED_WORDS {
            return Some(Candidate {
                confidence: scaled(JSON_LD_RELIABILITY, words),
                text: body,
            });
        }
    }

    for (selector, reliability) in CONTAINERS.iter() {
        // Largest matching container wins; the first one wins ties.
        let best = document
            .select(selector)
            .map(container_text)
            .fold(None::<(String, usize)>, |best, text| {
                let words = word_count(&text);
                match best {
                    Some((_, best_words)) if best_words >= words => best,
                    _ => Some((text, words)),
                }
            });
        if let Some((text, words)) = best {
            if words >= MIN_STRUCTURED_WORDS {
                return Some(Candidate {
                    confidence: scaled(*reliability, words),
                    text,
                });
            }
        }
    }

    None
}

fn scaled(reliability: f64, words: usize) -> f64 {
    let length = (words as f64 / 300.0).min(1.0);
    (reliability * (0.5 + 0.5 * length)).clamp(0.0, 1.0)
}

fn json_ld_article_body(objects: &[Value]) -> Option<String> {
    objects
        .iter()
        .filter_map(|obj| obj.get("articleBody").and_then(Value::as_str))
        .map(|body| {
            body.split("\n\n")
                .map(normalize_whitespace)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .find(|body| !body.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_json_ld_body_wins() {
        let document = Html::parse_document("<html><body><article>short</article></body></html>");
        let ld = vec![json!({"@type": "NewsArticle", "articleBody": words(300)})];

        let candidate = extract(&document, &ld).unwrap();
        assert_eq!(word_count(&candidate.text), 300);
        assert!((candidate.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_itemprop_container() {
        let html = format!(
            "<html><body><div itemprop=\"articleBody\"><p>{}</p></div></body></html>",
            words(60)
        );
        let document = Html::parse_document(&html);

        let candidate = extract(&document, &[]).unwrap();
        assert_eq!(word_count(&candidate.text), 60);
        assert!(candidate.confidence > 0.5 && candidate.confidence < 0.85);
    }

    #[test]
    fn test_falls_through_to_main() {
        let html = format!(
            "<html><body><article>{}</article><main>{}</main></body></html>",
            words(5),
            words(40)
        );
        let document = Html::parse_document(&html);

        let candidate = extract(&document, &[]).unwrap();
        assert_eq!(word_count(&candidate.text), 40);
    }

    #[test]
    fn test_too_short_everywhere() {
        let document = Html::parse_document("<html><body><article>tiny</article></body></html>");
        let ld = vec![json!({"@type": "Article", "articleBody": "also tiny"})];
        assert!(extract(&document, &ld).is_none());
    }
}
