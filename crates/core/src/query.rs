//! Lookup input and output types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Sentinel used in cache keys for queries without a year.
pub const NO_YEAR: &str = "no-year";

/// A film lookup: free-text title plus an optional release year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Query {
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    year: Option<String>,
}

impl Query {
    /// Build a query. Surrounding whitespace is trimmed and an empty year is dropped.
    pub fn new(title: impl Into<String>, year: Option<impl Into<String>>) -> Self {
        let title = title.into().trim().to_string();
        let year: Option<String> = year.map(Into::into);
        let year = year.map(|y| y.trim().to_string()).filter(|y| !y.is_empty());
        Self { title, year }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// Normalized cache key: lowercase title, `_`, then the year or `no-year`.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.title.trim().to_lowercase(), self.year.as_deref().unwrap_or(NO_YEAR))
    }

    /// The catalog search string, `"title year"` or the bare title.
    pub fn search_string(&self) -> String {
        match &self.year {
            Some(year) => format!("{} {}", self.title, year),
            None => self.title.clone(),
        }
    }

    /// Same query without the year.
    pub fn without_year(&self) -> Self {
        Self { title: self.title.clone(), year: None }
    }
}

/// Outcome of a lookup, returned to callers and stored in the result cache.
///
/// `available` implies `link` and `title` are set; use the constructors to
/// keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// A matched catalog title.
    pub fn found(title: impl Into<String>, link: impl Into<String>, score: u8) -> Self {
        Self {
            available: true,
            link: Some(link.into()),
            title: Some(title.into()),
            match_score: Some(score),
            note: None,
            error: None,
        }
    }

    /// A definitive miss, cacheable.
    pub fn not_found(note: impl Into<String>) -> Self {
        Self { available: false, link: None, title: None, match_score: None, note: Some(note.into()), error: None }
    }

    /// A failed lookup; never cached.
    pub fn from_error(err: &Error) -> Self {
        Self { available: false, link: None, title: None, match_score: None, note: None, error: Some(err.to_string()) }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether this result is a transient failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
