//! Candidate extraction from catalog result pages.
//!
//! ### Anchor Patterns
//! - The catalog renders hits through several templates depending on the
//!   result type, so a fixed list of selectors is applied in priority order.
//! - Candidates from all patterns are pooled and deduplicated by
//!   case-insensitive title; the first occurrence wins.
//!
//! ### Media Filter
//! - A candidate is kept only when the page source within `CONTEXT_RADIUS`
//!   characters of its anchor names a physical-media format (DVD, Blu-ray,
//!   UHD). The window ignores element boundaries, so markers in sibling
//!   cells or divs count.
//! - When no candidate survives the filter the page yields nothing. There is
//!   no fallback to the unfiltered list.
//!
//! ### Triage Signals
//! - See [`signals`] for session-expiry, error-page and result-count checks.

pub mod signals;

pub use signals::{Triage, has_any_results, is_error_page, is_session_expired, result_count, triage};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters of page source kept on each side of an anchor.
const CONTEXT_RADIUS: usize = 600;

/// Structural patterns, highest priority first.
const ANCHOR_PATTERNS: &[(&str, &str)] = &[
    ("single-hit", r#"a[href*="singleHit.do"]"#),
    ("show-hit", r#"a[href*="methodToCall=showHit"]"#),
    ("title-cell", "span.title a[href], td.hitlist-title a[href], div.hitlist-title a[href]"),
];

/// Elements treated as the result row enclosing an anchor.
const ROW_TAGS: &[&str] = &["tr", "li", "article"];

/// Physical-media markers and the hint reported for each, checked in order.
const MEDIA_MARKERS: &[(&str, &str)] = &[
    ("blu-ray", "Blu-ray"),
    ("bluray", "Blu-ray"),
    ("blu ray", "Blu-ray"),
    ("4k uhd", "4K UHD"),
    ("uhd", "4K UHD"),
    ("dvd", "DVD"),
];

static ON_LOAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:ausgeliehen|entliehen|on loan)\b").expect("valid regex"));

static NOT_ON_SHELF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:nicht|not)\s+(?:verfügbar|ausleihbar|available)\b|\bunavailable\b").expect("valid regex")
});

static ON_SHELF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:verfügbar|ausleihbar|available)\b").expect("valid regex"));

/// Loan status read from the text around a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    OnShelf,
    OnLoan,
}

/// A catalog hit before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Cleaned title text of the hit
    pub text: String,
    /// Detail link as found in the page
    pub href: String,
    /// Media format found near the hit, e.g. "DVD"
    pub media_type_hint: Option<String>,
    /// Loan status found near the hit
    pub availability: Option<Availability>,
}

/// Applies the anchor patterns to result pages.
#[derive(Debug, Clone)]
pub struct ResultExtractor {
    patterns: Vec<(&'static str, Selector)>,
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultExtractor {
    pub fn new() -> Self {
        let patterns = ANCHOR_PATTERNS
            .iter()
            .map(|(name, css)| (*name, Selector::parse(css).expect("invalid selector")))
            .collect();
        Self { patterns }
    }

    /// Extract deduplicated, media-filtered candidates from a result page.
    pub fn extract(&self, html: &str) -> Vec<Candidate> {
        let pooled = self.extract_unfiltered(html);
        let total = pooled.len();

        let kept: Vec<Candidate> = pooled.into_iter().filter(|c| c.media_type_hint.is_some()).collect();

        if kept.is_empty() && total > 0 {
            tracing::debug!("media filter removed all {} candidates", total);
        }

        kept
    }

    /// Pool and deduplicate candidates from every pattern, without the media filter.
    pub fn extract_unfiltered(&self, html: &str) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let source = document.root_element().html();

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for (name, selector) in &self.patterns {
            for element in document.select(selector) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };

                let raw: String = element.text().collect::<Vec<_>>().join(" ");
                let text = clean_title(&raw);
                if text.is_empty() {
                    continue;
                }

                if !seen.insert(text.to_lowercase()) {
                    continue;
                }

                let anchor_html = element.html();
                let window = source_window(&source, &anchor_html).to_lowercase();
                let row = row_context(element, &anchor_html, &window).to_lowercase();
                tracing::trace!(pattern = name, title = %text, "candidate");

                candidates.push(Candidate {
                    text,
                    href: href.to_string(),
                    media_type_hint: media_hint(&window),
                    availability: availability_hint(&row),
                });
            }
        }

        candidates
    }
}

/// Collapse whitespace, then drop a trailing statement of responsibility
/// (`" / Director"`) and bracketed material designations (`"[DVD]"`).
pub fn clean_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_credits = match collapsed.find(" / ") {
        Some(idx) => &collapsed[..idx],
        None => collapsed.as_str(),
    };

    let mut cleaned = String::with_capacity(without_credits.len());
    let mut depth = 0usize;
    for ch in without_credits.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => cleaned.push(ch),
            _ => {}
        }
    }

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([' ', ':', ';', ',', '/'])
        .to_string()
}

/// Page source within `CONTEXT_RADIUS` characters on each side of the
/// anchor's first occurrence.
///
/// Deduplication keeps the first anchor of a given title, and identical
/// anchor markup always comes from the same selector in document order, so
/// the first occurrence is the anchor itself.
fn source_window<'a>(source: &'a str, anchor_html: &'a str) -> &'a str {
    match source.find(anchor_html) {
        Some(start) => {
            let from = floor_boundary(source, start.saturating_sub(CONTEXT_RADIUS));
            let to = floor_boundary(source, (start + anchor_html.len() + CONTEXT_RADIUS).min(source.len()));
            &source[from..to]
        }
        None => anchor_html,
    }
}

/// Loan status belongs to one hit, so it is read from the enclosing result
/// row when there is one, bounded like the media window.
fn row_context(anchor: ElementRef<'_>, anchor_html: &str, window: &str) -> String {
    let Some(row) = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| ROW_TAGS.iter().any(|tag| *tag == el.value().name()))
    else {
        return window.to_string();
    };

    let row_html = row.html();
    source_window(&row_html, anchor_html).to_string()
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn media_hint(context: &str) -> Option<String> {
    MEDIA_MARKERS
        .iter()
        .find(|(marker, _)| context.contains(marker))
        .map(|(_, hint)| (*hint).to_string())
}

/// Negated forms ("nicht verfügbar", "unavailable") give no status rather
/// than a false on-shelf reading.
fn availability_hint(context: &str) -> Option<Availability> {
    if ON_LOAN.is_match(context) {
        Some(Availability::OnLoan)
    } else if NOT_ON_SHELF.is_match(context) {
        None
    } else if ON_SHELF.is_match(context) {
        Some(Availability::OnShelf)
    } else {
        None
    }
}
