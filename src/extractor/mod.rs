//! Tiered article extraction from raw HTML.
//!
//! [`extract_article`] is a pure function of `(html, url)`: the same input
//! always yields the same [`ArticleContent`]. Extraction tries three tiers in
//! order and records the one it used:
//!
//! | Tier | Module | Accepted when |
//! |------|--------|---------------|
//! | `readability` | [`readability`] | self-confidence ≥ 0.5 |
//! | `article-parser` | [`article_parser`] | structured source yields ≥ 25 words |
//! | `fallback` | [`fallback`] | always |
//!
//! Metadata (OpenGraph, Twitter card, `article:*`, canonical URL, title,
//! author, date, language) is scraped from the document independently of the
//! tier, and [`quality`] blends everything into a quality score and a paywall
//! flag.

pub mod article_parser;
pub mod fallback;
pub mod metadata;
pub mod quality;
pub mod readability;

use crate::models::{ArticleContent, ContentMetadata, ExtractionMethod};
use once_cell::sync::Lazy;
use quality::QualitySignals;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, instrument};

/// Readability results below this confidence fall through to the next tier.
pub const MIN_READABILITY_CONFIDENCE: f64 = 0.5;

/// Tags whose text never belongs to article prose.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "button", "select", "form",
    "nav", "aside", "footer",
];

const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "blockquote"];

static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| css("p, pre, blockquote"));

/// Text produced by one extraction tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    /// The tier's own signal strength, in `[0, 1]`.
    pub confidence: f64,
}

/// Extract article text, metadata, quality score and paywall flag from a page.
///
/// # Arguments
///
/// * `html` - The raw page markup; malformed or empty input is accepted
/// * `url` - The page URL, used to resolve a relative canonical link
///
/// # Returns
///
/// An [`ArticleContent`] whose `metadata.extraction_method` names the tier
/// that produced the text. `quality_score` and `extraction_confidence` are
/// always within `[0, 1]`, and the text is empty only when the page has no
/// visible text at all.
#[instrument(level = "debug", skip_all, fields(%url, bytes = html.len()))]
pub fn extract_article(html: &str, url: &str) -> ArticleContent {
    let document = Html::parse_document(html);
    let page = metadata::extract_metadata(&document, url);

    let (method, candidate) = choose_tier(&document, &page);
    let text = candidate.text;
    let confidence = candidate.confidence.clamp(0.0, 1.0);
    let words = word_count(&text);
    let paywall_detected = quality::detect_paywall(&text, html);

    let quality_score = quality::quality_score(&QualitySignals {
        word_count: words,
        has_title: page.title.is_some(),
        has_author: page.author.is_some(),
        has_date: page.publish_date.is_some(),
        extraction_confidence: confidence,
        paywall_detected,
    });

    debug!(
        method = method.as_str(),
        confidence,
        words,
        quality_score,
        paywall_detected,
        "Extracted article"
    );

    ArticleContent {
        text,
        title: page.title,
        author: page.author,
        publish_date: page.publish_date,
        language: page.language,
        word_count: words,
        raw_html: None,
        metadata: ContentMetadata {
            open_graph: non_empty(page.open_graph),
            twitter_card: non_empty(page.twitter_card),
            article: non_empty(page.article),
            canonical_url: page.canonical_url,
            extraction_method: method,
            extraction_confidence: confidence,
        },
        paywall_detected,
        quality_score,
    }
}

fn choose_tier(document: &Html, page: &metadata::PageMetadata) -> (ExtractionMethod, Candidate) {
    match readability::extract(document) {
        Some(candidate) if candidate.confidence >= MIN_READABILITY_CONFIDENCE => {
            return (ExtractionMethod::Readability, candidate);
        }
        Some(candidate) => debug!(confidence = candidate.confidence, "Readability confidence too low"),
        None => debug!("Readability found no candidate"),
    }

    if let Some(candidate) = article_parser::extract(document, &page.json_ld) {
        return (ExtractionMethod::ArticleParser, candidate);
    }

    (ExtractionMethod::Fallback, fallback::extract(document))
}

fn non_empty<K, V>(map: std::collections::BTreeMap<K, V>) -> Option<std::collections::BTreeMap<K, V>> {
    if map.is_empty() { None } else { Some(map) }
}

/// Parse a selector known at compile time.
pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static selector must parse")
}

/// Number of whitespace-delimited tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse every whitespace run to a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `element` sits inside a noise element such as `nav` or `script`.
pub(crate) fn is_noise(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .chain(std::iter::once(element))
        .any(|el| NOISE_TAGS.contains(&el.value().name()))
}

/// Text below `element`, skipping noise subtrees beneath it.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .filter_map(ElementRef::wrap)
                .any(|el| NOISE_TAGS.contains(&el.value().name()));
            if !hidden {
                out.push_str(text);
                out.push(' ');
            }
        }
    }
    normalize_whitespace(&out)
}

/// Paragraph texts below `element` with at least `min_chars` characters.
pub(crate) fn paragraph_texts(element: ElementRef<'_>, min_chars: usize) -> Vec<String> {
    element
        .select(&PARAGRAPHS)
        .filter(|p| !has_noise_between(*p, element))
        .filter(|p| !nested_in_paragraph(*p, element))
        .map(visible_text)
        .filter(|text| text.chars().count() >= min_chars)
        .collect()
}

/// Article text of a container: its paragraphs when it has any, else all of
/// its visible text.
pub(crate) fn container_text(element: ElementRef<'_>) -> String {
    let paragraphs = paragraph_texts(element, 1);
    if paragraphs.is_empty() {
        visible_text(element)
    } else {
        paragraphs.join("\n\n")
    }
}

/// A `p` inside a `blockquote` is already covered by the blockquote's text.
fn nested_in_paragraph(node: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    node.ancestors()
        .take_while(|ancestor| ancestor.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|el| PARAGRAPH_TAGS.contains(&el.value().name()))
}

fn has_noise_between(node: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    std::iter::once(node)
        .chain(
            node.ancestors()
                .take_while(|ancestor| ancestor.id() != root.id())
                .filter_map(ElementRef::wrap),
        )
        .any(|el| NOISE_TAGS.contains(&el.value().name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::article_html;

    #[test]
    fn test_article_page_uses_readability() {
        let html = article_html("Transit budget passes", 6);
        let content = extract_article(&html, "https://news.example.com/transit");

        assert_eq!(content.metadata.extraction_method, ExtractionMethod::Readability);
        assert!(content.text.contains("Paragraph 0 of the report"));
        assert!(content.text.contains("Paragraph 5 of the report"));
        assert!(!content.text.contains("Copyright"));
        assert!(!content.text.contains("World"));
        assert_eq!(content.title.as_deref(), Some("Transit budget passes"));
        assert_eq!(content.author.as_deref(), Some("Jane Reporter"));
        assert_eq!(content.publish_date.as_deref(), Some("2025-05-06T14:30:00+00:00"));
        assert_eq!(content.language.as_deref(), Some("en"));
        assert_eq!(content.word_count, word_count(&content.text));
        assert!(!content.paywall_detected);
        assert!(content.quality_score > 0.6);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = article_html("Same input", 4);
        let a = extract_article(&html, "https://news.example.com/same");
        let b = extract_article(&html, "https://news.example.com/same");
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_inputs_stay_in_range() {
        let inputs = [
            "",
            "   ",
            "<html>",
            "<<<>>> </div></p>",
            "<p>unclosed <b>bold <i>italics",
            "<script>var x = '<p>not text</p>';</script>",
            "\u{0}\u{1}binary\u{fffd}",
            "<html><body><div><div><div></div></div></div></body></html>",
        ];
        for html in inputs {
            let content = extract_article(html, "not even a url");
            assert!((0.0..=1.0).contains(&content.quality_score), "{html:?}");
            assert!((0.0..=1.0).contains(&content.metadata.extraction_confidence), "{html:?}");
            assert_eq!(content.word_count, word_count(&content.text));
        }
    }

    #[test]
    fn test_empty_markup_falls_back() {
        let content = extract_article("", "https://example.com/");
        assert_eq!(content.metadata.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(content.word_count, 0);
        assert!(content.text.is_empty());
        assert!(content.metadata.open_graph.is_none());
    }

    #[test]
    fn test_script_text_is_invisible() {
        let html = "<html><body><div>Visible words<script>hidden()</script></div></body></html>";
        let document = Html::parse_document(html);
        let body = document.select(&css("body")).next().unwrap();
        assert_eq!(visible_text(body), "Visible words");
    }

    #[test]
    fn test_word_count_and_whitespace() {
        assert_eq!(word_count("  one\ttwo\nthree  "), 3);
        assert_eq!(word_count(""), 0);
        assert_eq!(normalize_whitespace("  a \n\n b  "), "a b");
    }
}
