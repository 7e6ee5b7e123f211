//! Page-level signals read before candidate extraction.
//!
//! Session-expiry and error pages are short interstitials. Both checks only
//! look at bodies below [`SHORT_BODY_LIMIT`] characters so a result list that
//! happens to mention "session" or "error" in a title is never misread.

use regex::Regex;
use std::sync::LazyLock;

/// Bodies at or above this length are always treated as result pages.
pub const SHORT_BODY_LIMIT: usize = 5_000;

const EXPIRY_PHRASES: &[&str] = &[
    "sitzung ist abgelaufen",
    "session abgelaufen",
    "session has expired",
    "session expired",
];

const ERROR_PHRASES: &[&str] = &["ein fehler ist aufgetreten", "an error has occurred", "an error occurred"];

static COUNT_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,7})\s+(?:treffer|hits|results?)\b").expect("valid regex"));

static COUNT_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:treffer|hits|results?)\s*:\s*(\d{1,7})").expect("valid regex"));

/// Classification of a search response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage {
    /// The catalog dropped the session; a new handshake is needed.
    SessionExpired,
    /// The catalog rendered its generic error page.
    BackendError,
    /// Anything else, including an empty result list.
    Results,
}

/// Classify a search response. Expiry wins over the error check.
pub fn triage(html: &str) -> Triage {
    if is_session_expired(html) {
        Triage::SessionExpired
    } else if is_error_page(html) {
        Triage::BackendError
    } else {
        Triage::Results
    }
}

pub fn is_session_expired(html: &str) -> bool {
    short_body_contains(html, EXPIRY_PHRASES)
}

pub fn is_error_page(html: &str) -> bool {
    short_body_contains(html, ERROR_PHRASES)
}

fn short_body_contains(html: &str, phrases: &[&str]) -> bool {
    if html.chars().count() >= SHORT_BODY_LIMIT {
        return false;
    }
    let lower = html.to_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

/// Hit count announced by the page, e.g. `"12 Treffer"` or `"Results: 3"`.
pub fn result_count(html: &str) -> Option<usize> {
    COUNT_BEFORE
        .captures(html)
        .or_else(|| COUNT_AFTER.captures(html))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True when the page announces at least one hit.
pub fn has_any_results(html: &str) -> bool {
    result_count(html).is_some_and(|n| n > 0)
}
