//! Paywall detection and quality scoring.

use once_cell::sync::Lazy;
use regex::Regex;

/// Text at or above this many words is never treated as paywalled.
const PAYWALL_MAX_WORDS: usize = 250;

/// Word count at which the length component of the score saturates.
const FULL_ARTICLE_WORDS: f64 = 300.0;

static PAYWALL_MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(class|id)\s*=\s*["'][^"']*(paywall|pay-wall|subscriber-only|premium-content|metered|regwall|piano|tp-modal|locked-content)"#,
    )
    .expect("static regex")
});

static PAYWALL_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)subscribe to continue|to continue reading|already a subscriber|subscribers only|sign in to continue|article limit",
    )
    .expect("static regex")
});

static NOT_FREE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"isAccessibleForFree"\s*:\s*"?false"#).expect("static regex")
});

/// Whether the page looks like it withheld the article behind a paywall.
///
/// Requires both a short extraction (relative to the document and in
/// absolute terms) and a paywall marker somewhere in the markup.
pub fn detect_paywall(text: &str, html: &str) -> bool {
    let words = text.split_whitespace().count();
    let short = words < PAYWALL_MAX_WORDS && (text.len() as f64) < html.len() as f64 * 0.05;
    if !short {
        return false;
    }
    PAYWALL_MARKUP.is_match(html) || PAYWALL_PHRASES.is_match(html) || NOT_FREE.is_match(html)
}

/// Inputs to [`quality_score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySignals {
    pub word_count: usize,
    pub has_title: bool,
    pub has_author: bool,
    pub has_date: bool,
    /// Confidence of the tier that produced the text, in `[0, 1]`.
    pub extraction_confidence: f64,
    pub paywall_detected: bool,
}

/// Blend the signals into a score in `[0, 1]`.
///
/// Non-decreasing in word count and in each metadata flag; a detected
/// paywall never raises it.
pub fn quality_score(signals: &QualitySignals) -> f64 {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let length = (signals.word_count as f64 / FULL_ARTICLE_WORDS).min(1.0);
    let confidence = if signals.extraction_confidence.is_nan() {
        0.0
    } else {
        signals.extraction_confidence.clamp(0.0, 1.0)
    };

    let score = 0.35 * length
        + 0.10 * flag(signals.has_title)
        + 0.10 * flag(signals.has_author)
        + 0.10 * flag(signals.has_date)
        + 0.25 * confidence
        + 0.10 * flag(!signals.paywall_detected);
    score.clamp(0.0, 1.0)
}
