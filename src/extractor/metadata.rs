//! Page-level metadata scraping.
//!
//! Collects OpenGraph, Twitter card and `article:*` properties, JSON-LD
//! article objects and the canonical URL, then resolves title, author,
//! publish date and language through ordered fallback chains. Nothing here
//! depends on which extraction tier wins.

use super::{css, normalize_whitespace, visible_text};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

static META: Lazy<Selector> = Lazy::new(|| css("meta[content]"));
static JSON_LD: Lazy<Selector> = Lazy::new(|| css("script[type='application/ld+json']"));
static CANONICAL: Lazy<Selector> = Lazy::new(|| css("link[rel~='canonical'][href]"));
static H1: Lazy<Selector> = Lazy::new(|| css("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| css("title"));
static TIME: Lazy<Selector> = Lazy::new(|| css("time[datetime]"));
static BYLINE: Lazy<Selector> =
    Lazy::new(|| css("[rel='author'], [itemprop='author'], .byline, .author"));

static BY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*by[:\s]+").expect("static regex"));

/// `name`/`itemprop` values of meta tags that carry a publish date.
const DATE_META_NAMES: &[&str] = &[
    "datepublished",
    "date",
    "pubdate",
    "publishdate",
    "publish-date",
    "dc.date",
    "dc.date.issued",
    "sailthru.date",
    "parsely-pub-date",
];

/// Everything scraped from the document outside the article body.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PageMetadata {
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: BTreeMap<String, String>,
    pub article: BTreeMap<String, String>,
    pub canonical_url: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publish_date: Option<String>,
    pub language: Option<String>,
    /// Article-like JSON-LD objects, flattened out of arrays and `@graph`.
    pub json_ld: Vec<Value>,
}

pub(crate) fn extract_metadata(document: &Html, page_url: &str) -> PageMetadata {
    let mut page = PageMetadata::default();
    let mut named: BTreeMap<String, String> = BTreeMap::new();

    for meta in document.select(&META) {
        let el = meta.value();
        let Some(content) = el.attr("content").map(normalize_whitespace) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        let key = el
            .attr("property")
            .or_else(|| el.attr("name"))
            .or_else(|| el.attr("itemprop"))
            .map(|k| k.trim().to_ascii_lowercase());
        let Some(key) = key else {
            if let Some(equiv) = el.attr("http-equiv") {
                named
                    .entry(equiv.trim().to_ascii_lowercase())
                    .or_insert(content);
            }
            continue;
        };

        // First occurrence wins everywhere.
        if let Some(rest) = key.strip_prefix("og:") {
            page.open_graph.entry(rest.to_string()).or_insert(content);
        } else if let Some(rest) = key.strip_prefix("twitter:") {
            page.twitter_card.entry(rest.to_string()).or_insert(content);
        } else if let Some(rest) = key.strip_prefix("article:") {
            page.article.entry(rest.to_string()).or_insert(content);
        } else {
            named.entry(key).or_insert(content);
        }
    }

    page.json_ld = json_ld_objects(document);
    page.canonical_url = canonical_url(document, page_url, &page.open_graph);
    page.title = resolve_title(document, &page);
    page.author = resolve_author(document, &page, &named);
    page.publish_date = resolve_publish_date(document, &page, &named);
    page.language = resolve_language(document, &page, &named);
    page
}

fn json_ld_objects(document: &Html) -> Vec<Value> {
    let mut out = Vec::new();
    for script in document.select(&JSON_LD) {
        let raw: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            collect_articles(value, &mut out);
        }
    }
    out
}

fn collect_articles(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| collect_articles(item, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_articles(graph, out);
            }
            let value = Value::Object(map);
            if is_article_type(value.get("@type")) {
                out.push(value);
            }
        }
        _ => {}
    }
}

fn is_article_type(kind: Option<&Value>) -> bool {
    let matches = |t: &str| t.ends_with("Article") || t == "BlogPosting" || t == "Report";
    match kind {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn ld_string(objects: &[Value], key: &str) -> Option<String> {
    objects
        .iter()
        .filter_map(|obj| obj.get(key).and_then(Value::as_str))
        .map(normalize_whitespace)
        .find(|s| !s.is_empty())
}

fn canonical_url(
    document: &Html,
    page_url: &str,
    open_graph: &BTreeMap<String, String>,
) -> Option<String> {
    let base = Url::parse(page_url).ok();
    let resolve = |href: &str| -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let joined = match &base {
            Some(base) => base.join(href),
            None => Url::parse(href),
        };
        joined.ok().map(String::from)
    };

    document
        .select(&CANONICAL)
        .filter_map(|link| link.value().attr("href"))
        .find_map(&resolve)
        .or_else(|| open_graph.get("url").and_then(|u| resolve(u)))
}

fn resolve_title(document: &Html, page: &PageMetadata) -> Option<String> {
    page.open_graph
        .get("title")
        .or_else(|| page.twitter_card.get("title"))
        .cloned()
        .or_else(|| ld_string(&page.json_ld, "headline"))
        .or_else(|| first_text(document, &H1))
        .or_else(|| first_text(document, &TITLE))
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(visible_text)
        .find(|text| !text.is_empty())
}

fn resolve_author(
    document: &Html,
    page: &PageMetadata,
    named: &BTreeMap<String, String>,
) -> Option<String> {
    named
        .get("author")
        .cloned()
        .or_else(|| {
            // `article:author` is frequently a profile URL rather than a name.
            page.article
                .get("author")
                .filter(|a| !a.starts_with("http://") && !a.starts_with("https://"))
                .cloned()
        })
        .or_else(|| page.json_ld.iter().find_map(|obj| ld_author(obj.get("author")?)))
        .or_else(|| {
            document
                .select(&BYLINE)
                .map(visible_text)
                .find(|text| !text.is_empty())
        })
        .map(|author| BY_PREFIX.replace(&author, "").trim().to_string())
        .filter(|author| !author.is_empty())
}

fn ld_author(value: &Value) -> Option<String> {
    let names: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(ld_author_name).collect(),
        other => ld_author_name(other).into_iter().collect(),
    };
    if names.is_empty() {
        None
    } else {
        Some(names.into_iter().unique().join(", "))
    }
}

fn ld_author_name(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(name) => name.as_str(),
        Value::Object(obj) => obj.get("name")?.as_str()?,
        _ => return None,
    };
    let name = normalize_whitespace(name);
    if name.is_empty() { None } else { Some(name) }
}

fn resolve_publish_date(
    document: &Html,
    page: &PageMetadata,
    named: &BTreeMap<String, String>,
) -> Option<String> {
    page.article
        .get("published_time")
        .cloned()
        .or_else(|| ld_string(&page.json_ld, "datePublished"))
        .or_else(|| {
            DATE_META_NAMES
                .iter()
                .find_map(|name| named.get(*name).cloned())
        })
        .or_else(|| {
            document
                .select(&TIME)
                .filter_map(|t| t.value().attr("datetime"))
                .map(str::trim)
                .find(|d| !d.is_empty())
                .map(str::to_string)
        })
        .and_then(|raw| normalize_date(&raw))
}

/// Normalise a date string to RFC 3339 UTC; unparseable input is kept verbatim.
pub(crate) fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().to_rfc3339());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Some(midnight.and_utc().to_rfc3339());
        }
    }
    Some(raw.to_string())
}

fn resolve_language(
    document: &Html,
    page: &PageMetadata,
    named: &BTreeMap<String, String>,
) -> Option<String> {
    let html_lang = document.root_element().value().attr("lang");
    html_lang
        .and_then(primary_subtag)
        .or_else(|| named.get("content-language").and_then(|l| primary_subtag(l)))
        .or_else(|| page.open_graph.get("locale").and_then(|l| primary_subtag(l)))
}

/// Lower-cased primary language subtag, e.g. `en` for `en-US` or `pt_BR`.
fn primary_subtag(tag: &str) -> Option<String> {
    let primary = tag.trim().split(['-', '_', ',', ';']).next()?.trim();
    if (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(primary.to_ascii_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> PageMetadata {
        extract_metadata(&Html::parse_document(html), "https://news.example.com/2025/story")
    }

    #[test]
    fn test_property_maps_strip_prefixes() {
        let page = parse(
            r#"<html><head>
                <meta property="og:title" content="First">
                <meta property="og:title" content="Second">
                <meta property="og:image" content="https://img.example.com/a.jpg">
                <meta name="twitter:card" content="summary_large_image">
                <meta property="article:section" content="Politics">
            </head><body></body></html>"#,
        );

        assert_eq!(page.open_graph.get("title").map(String::as_str), Some("First"));
        assert_eq!(page.open_graph.len(), 2);
        assert_eq!(
            page.twitter_card.get("card").map(String::as_str),
            Some("summary_large_image")
        );
        assert_eq!(page.article.get("section").map(String::as_str), Some("Politics"));
        assert_eq!(page.title.as_deref(), Some("First"));
    }

    #[test]
    fn test_json_ld_graph_supplies_fields() {
        let page = parse(
            r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebSite", "name": "Example"},
                {"@type": "NewsArticle", "headline": "Flood warnings extended",
                 "datePublished": "2025-03-01",
                 "author": [{"@type": "Person", "name": "A. Writer"}, {"name": "B. Editor"}, "A. Writer"]}
            ]}
            </script></head><body></body></html>"#,
        );

        assert_eq!(page.json_ld.len(), 1);
        assert_eq!(page.title.as_deref(), Some("Flood warnings extended"));
        assert_eq!(page.author.as_deref(), Some("A. Writer, B. Editor"));
        assert_eq!(page.publish_date.as_deref(), Some("2025-03-01T00:00:00+00:00"));
    }

    #[test]
    fn test_invalid_json_ld_is_ignored() {
        let page = parse(
            r#"<html><head><script type="application/ld+json">{not json</script>
               <title>Fallback title</title></head><body></body></html>"#,
        );
        assert!(page.json_ld.is_empty());
        assert_eq!(page.title.as_deref(), Some("Fallback title"));
    }

    #[test]
    fn test_byline_fallback_strips_prefix() {
        let page = parse(
            r#"<html><body><p class="byline">By Sam Field</p><h1>Headline here</h1></body></html>"#,
        );
        assert_eq!(page.author.as_deref(), Some("Sam Field"));
        assert_eq!(page.title.as_deref(), Some("Headline here"));
    }

    #[test]
    fn test_article_author_url_is_skipped() {
        let page = parse(
            r#"<html><head>
                <meta property="article:author" content="https://example.com/staff/sam">
            </head><body><span itemprop="author">Sam Field</span></body></html>"#,
        );
        assert_eq!(page.author.as_deref(), Some("Sam Field"));
    }

    #[test]
    fn test_canonical_resolves_relative_href() {
        let page = parse(
            r#"<html><head><link rel="canonical" href="/2025/story?ref=canon"></head></html>"#,
        );
        assert_eq!(
            page.canonical_url.as_deref(),
            Some("https://news.example.com/2025/story?ref=canon")
        );
    }

    #[test]
    fn test_canonical_falls_back_to_og_url() {
        let page = parse(
            r#"<html><head><meta property="og:url" content="https://news.example.com/a"></head></html>"#,
        );
        assert_eq!(page.canonical_url.as_deref(), Some("https://news.example.com/a"));
    }

    #[test]
    fn test_language_chain() {
        assert_eq!(parse(r#"<html lang="pt-BR"></html>"#).language.as_deref(), Some("pt"));
        let page = parse(
            r#"<html><head><meta property="og:locale" content="fr_FR"></head></html>"#,
        );
        assert_eq!(page.language.as_deref(), Some("fr"));
        let page = parse(
            r#"<html><head><meta http-equiv="Content-Language" content="de"></head></html>"#,
        );
        assert_eq!(page.language.as_deref(), Some("de"));
        assert_eq!(parse("<html></html>").language, None);
    }

    #[test]
    fn test_time_element_date() {
        let page = parse(
            r#"<html><body><time datetime="2025-01-02T03:04:05+02:00">Jan 2</time></body></html>"#,
        );
        assert_eq!(page.publish_date.as_deref(), Some("2025-01-02T01:04:05+00:00"));
    }

    #[test]
    fn test_normalize_date_formats() {
        assert_eq!(
            normalize_date("2025-05-06T14:30:00Z").as_deref(),
            Some("2025-05-06T14:30:00+00:00")
        );
        assert_eq!(
            normalize_date("Tue, 6 May 2025 14:30:00 GMT").as_deref(),
            Some("2025-05-06T14:30:00+00:00")
        );
        assert_eq!(
            normalize_date("2025-05-06 14:30:00").as_deref(),
            Some("2025-05-06T14:30:00+00:00")
        );
        assert_eq!(normalize_date("last Tuesday").as_deref(), Some("last Tuesday"));
        assert_eq!(normalize_date("  "), None);
    }

    #[test]
    fn test_primary_subtag() {
        assert_eq!(primary_subtag("EN-gb").as_deref(), Some("en"));
        assert_eq!(primary_subtag("x"), None);
        assert_eq!(primary_subtag("english"), None);
    }
}
