//! Client code for shelfcheck.
//!
//! This crate provides the catalog transport, session handling, request
//! throttling, result extraction, title matching and the lookup engine that
//! ties them together.

pub mod catalog;
pub mod extract;
pub mod fetch;
pub mod matcher;

pub use catalog::{CatalogEngine, EngineConfig, RequestThrottler, SessionManager};
pub use extract::{Availability, Candidate, ResultExtractor};
pub use fetch::{CatalogTransport, CatalogUrls, FetchClient, FetchConfig, FetchResponse, TransportError};
pub use matcher::{MATCH_THRESHOLD, MatchResult, score, select_best};
