//! Last-resort extraction: the largest block of visible text.

use super::{Candidate, css, is_noise, normalize_whitespace, visible_text, word_count};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static BLOCKS: Lazy<Selector> = Lazy::new(|| {
    css("p, div, section, article, main, td, pre, blockquote, li, body")
});

/// Inline tags whose text counts towards the enclosing block.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "br", "cite", "code", "em", "i", "kbd", "mark", "q", "s", "small",
    "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Always returns a candidate; its text may be empty.
pub fn extract(document: &Html) -> Candidate {
    let best = document
        .select(&BLOCKS)
        .filter(|block| !is_noise(*block))
        .map(own_text)
        .fold(String::new(), |best, text| {
            if text.chars().count() > best.chars().count() { text } else { best }
        });

    let text = if best.is_empty() {
        visible_text(document.root_element())
    } else {
        best
    };

    let words = word_count(&text);
    let confidence = if words == 0 {
        0.0
    } else {
        0.1 + 0.3 * (words as f64 / 300.0).min(1.0)
    };
    Candidate { text, confidence }
}

/// Text of the block's direct text nodes plus inline descendants, excluding
/// nested blocks.
fn own_text(block: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_inline(block, &mut out);
    normalize_whitespace(&out)
}

fn collect_inline(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if INLINE_TAGS.contains(&el.name()) => {
                if let Some(inline) = ElementRef::wrap(child) {
                    collect_inline(inline, out);
                }
            }
            _ => {}
        }
    }
}
