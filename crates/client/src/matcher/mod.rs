//! Fuzzy title matching.
//!
//! ### Scoring
//! Scores run from 0 to 100 and are checked in priority order:
//! 1. Case-insensitive equality: 100
//! 2. Equality after punctuation stripping and whitespace collapsing: 95
//! 3. Token comparison over words longer than two characters, branching on
//!    the number of query tokens (see [`score`]).
//!
//! ### Selection
//! - [`select_best`] keeps the highest score at or above [`MATCH_THRESHOLD`].
//! - Ties keep the earliest candidate, which is the extractor's pattern
//!   priority order.

pub mod tokens;

use serde::Serialize;
use std::collections::HashSet;

use crate::extract::Candidate;
use tokens::{normalize, prefix_run, tokenize};

/// Minimum score for a candidate to count as the queried title.
pub const MATCH_THRESHOLD: u8 = 70;

/// Outcome of matching one query against a candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    /// Set only when `matched` is true
    pub candidate: Option<Candidate>,
    /// Best score seen, whether or not it cleared the threshold
    pub score: u8,
}

impl MatchResult {
    fn none(score: u8) -> Self {
        Self { matched: false, candidate: None, score }
    }
}

/// Score how well `candidate` matches `query`.
///
/// Token branches:
/// - one token: the candidate is exactly that token (90), or starts with it
///   followed by a parenthesis, bracket, digit or end and has at most two
///   tokens (80). A token found anywhere else scores 20, so "Lucky" does not
///   match "Get Lucky". Otherwise 10.
/// - two tokens: both lead the candidate in order (85, or 75 for candidates
///   with more than three tokens), both appear anywhere (75, or 50), else 15.
/// - three or more: coverage and overlap of the token sets plus a bonus of up
///   to 10 for a shared leading run.
///
/// A query without significant words is compared as one token.
pub fn score(query: &str, candidate: &str) -> u8 {
    let (q_trim, c_trim) = (query.trim(), candidate.trim());
    if q_trim.to_lowercase() == c_trim.to_lowercase() {
        return 100;
    }

    let q_norm = normalize(q_trim);
    if q_norm.is_empty() {
        return 0;
    }
    if q_norm == normalize(c_trim) {
        return 95;
    }

    let mut q_tokens = tokenize(q_trim);
    if q_tokens.is_empty() {
        q_tokens.push(q_norm);
    }
    let c_tokens = tokenize(c_trim);

    match q_tokens.as_slice() {
        [token] => score_single(token, c_trim, &c_tokens),
        [first, second] => score_pair(first, second, &c_tokens),
        _ => score_many(&q_tokens, &c_tokens),
    }
}

fn score_single(token: &str, candidate: &str, c_tokens: &[String]) -> u8 {
    if c_tokens.len() == 1 && c_tokens[0] == token {
        return 90;
    }

    if c_tokens.len() <= 2 && leads_with_boundary(&candidate.to_lowercase(), token) {
        return 80;
    }

    if c_tokens.iter().any(|t| t == token) { 20 } else { 10 }
}

/// True when `lower` starts with `token` and the token is followed by a
/// boundary: end of string, `(`, `[` or a digit, after optional whitespace.
fn leads_with_boundary(lower: &str, token: &str) -> bool {
    let Some(rest) = lower.strip_prefix(token) else {
        return false;
    };
    match rest.trim_start().chars().next() {
        None => true,
        Some(c) => c == '(' || c == '[' || c.is_ascii_digit(),
    }
}

fn score_pair(first: &str, second: &str, c_tokens: &[String]) -> u8 {
    let short = c_tokens.len() <= 3;

    if c_tokens.len() >= 2 && c_tokens[0] == first && c_tokens[1] == second {
        return if short { 85 } else { 75 };
    }

    let has = |t: &str| c_tokens.iter().any(|c| c == t);
    if has(first) && has(second) {
        return if short { 75 } else { 50 };
    }

    15
}

fn score_many(q_tokens: &[String], c_tokens: &[String]) -> u8 {
    let q_set: HashSet<&str> = q_tokens.iter().map(String::as_str).collect();
    let c_set: HashSet<&str> = c_tokens.iter().map(String::as_str).collect();

    let common = q_set.intersection(&c_set).count() as f64;
    let coverage = common / q_set.len() as f64;
    let overlap = common / q_set.len().max(c_set.len()) as f64;
    let bonus = (prefix_run(q_tokens, c_tokens) as f64 / q_tokens.len() as f64 * 10.0).round();

    let raw = if coverage >= 0.8 && overlap >= 0.5 {
        (85.0 + bonus).min(95.0)
    } else if coverage >= 0.6 && overlap >= 0.4 {
        (70.0 + bonus).min(85.0)
    } else if coverage >= 0.5 {
        50.0 + bonus / 2.0
    } else {
        overlap * 40.0
    };

    raw.round().clamp(0.0, 100.0) as u8
}

/// Pick the best-scoring candidate that clears [`MATCH_THRESHOLD`].
pub fn select_best(query: &str, candidates: &[Candidate]) -> MatchResult {
    let mut best: Option<(&Candidate, u8)> = None;

    for candidate in candidates {
        let s = score(query, &candidate.text);
        tracing::trace!(candidate = %candidate.text, score = s, "scored");
        if best.is_none_or(|(_, top)| s > top) {
            best = Some((candidate, s));
        }
    }

    match best {
        Some((candidate, s)) if s >= MATCH_THRESHOLD => {
            MatchResult { matched: true, candidate: Some(candidate.clone()), score: s }
        }
        Some((_, s)) => MatchResult::none(s),
        None => MatchResult::none(0),
    }
}
