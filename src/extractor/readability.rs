//! Readability-style paragraph scoring.
//!
//! Every substantial paragraph adds to the score of its parent (and half of
//! it to its grandparent). Candidates are then weighted by class/id hints and
//! penalised by link density. The winning container, plus any sibling that
//! scores close to it, supplies the article paragraphs.

use super::{Candidate, css, is_noise, paragraph_texts, visible_text, word_count};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Paragraphs shorter than this (in characters) neither score nor count.
const MIN_PARAGRAPH_CHARS: usize = 25;

static SCORED_BLOCKS: Lazy<Selector> = Lazy::new(|| css("p, pre, td"));
static LINKS: Lazy<Selector> = Lazy::new(|| css("a"));

static POSITIVE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|story|text|blog")
        .expect("static regex")
});

static NEGATIVE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)comment|footer|footnote|header|nav|sidebar|sponsor|promo|related|share|social|menu|masthead|widget|banner|popup|modal|cookie|newsletter|\bads?\b|advert",
    )
    .expect("static regex")
});

/// Score the document and return the best container's paragraphs.
pub fn extract(document: &Html) -> Option<Candidate> {
    let mut order: HashMap<_, usize> = HashMap::new();
    let mut candidates: Vec<(ElementRef<'_>, f64)> = Vec::new();

    for block in document.select(&SCORED_BLOCKS) {
        if is_noise(block) {
            continue;
        }
        let text = visible_text(block);
        let chars = text.chars().count();
        if chars < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = 1.0 + text.matches(',').count() as f64 + (chars as f64 / 100.0).min(3.0);

        let Some(parent) = block.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let grandparent = parent.parent().and_then(ElementRef::wrap);
        let targets = std::iter::once((parent, score)).chain(grandparent.map(|g| (g, score / 2.0)));
        for (element, share) in targets {
            match order.get(&element.id()) {
                Some(&index) => candidates[index].1 += share,
                None => {
                    order.insert(element.id(), candidates.len());
                    candidates.push((element, share));
                }
            }
        }
    }

    if candidates.is_empty() {
        return None;
    }

    let mut ranked: Vec<(ElementRef<'_>, f64)> = candidates
        .into_iter()
        .map(|(el, score)| (el, (score + tag_weight(el) + class_weight(el)) * (1.0 - link_density(el))))
        .collect();
    // Stable: ties keep document order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = ranked[0];
    if best_score <= 0.0 {
        return None;
    }

    let final_scores: HashMap<_, f64> = ranked.iter().map(|(el, s)| (el.id(), *s)).collect();
    let sibling_threshold = (best_score * 0.2).max(10.0);

    let mut paragraphs = Vec::new();
    let containers: Vec<ElementRef<'_>> = match best.parent().and_then(ElementRef::wrap) {
        Some(parent) => parent
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| {
                sibling.id() == best.id()
                    || final_scores
                        .get(&sibling.id())
                        .is_some_and(|s| *s >= sibling_threshold)
            })
            .collect(),
        None => vec![best],
    };
    for container in containers {
        paragraphs.extend(paragraph_texts(container, MIN_PARAGRAPH_CHARS));
    }
    if paragraphs.is_empty() {
        return None;
    }

    let text = paragraphs.join("\n\n");
    let words = word_count(&text);
    let length = (words as f64 / 300.0).min(1.0);
    let paragraph_signal = (paragraphs.len() as f64 / 5.0).min(1.0);
    let link_signal = 1.0 - link_density(best);
    let margin = match ranked.get(1) {
        Some((_, second)) => ((best_score - second.max(0.0)) / best_score).clamp(0.0, 1.0),
        None => 1.0,
    };
    let confidence =
        (0.4 * length + 0.25 * paragraph_signal + 0.2 * link_signal + 0.15 * margin).clamp(0.0, 1.0);

    Some(Candidate { text, confidence })
}

fn tag_weight(element: ElementRef<'_>) -> f64 {
    match element.value().name() {
        "article" => 10.0,
        "div" | "section" | "main" => 5.0,
        "td" | "blockquote" | "pre" => 3.0,
        "ol" | "ul" | "dl" | "form" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" => -5.0,
        _ => 0.0,
    }
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let hints = format!(
        "{} {}",
        element.value().attr("class").unwrap_or_default(),
        element.value().attr("id").unwrap_or_default()
    );
    if hints.trim().is_empty() {
        return 0.0;
    }
    let mut weight = 0.0;
    if POSITIVE_HINTS.is_match(&hints) {
        weight += 25.0;
    }
    if NEGATIVE_HINTS.is_match(&hints) {
        weight -= 25.0;
    }
    weight
}

/// Share of the element's visible characters that sit inside links, in `[0, 1]`.
pub fn link_density(element: ElementRef<'_>) -> f64 {
    let total = visible_text(element).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .select(&LINKS)
        .map(|a| visible_text(a).chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}
