//! Core types and shared functionality for shelfcheck.
//!
//! This crate provides:
//! - Lookup query and result types
//! - In-memory result cache with periodic sweep
//! - Unified error types
//! - Configuration structures
//! - Catalog base URL canonicalization

pub mod base_url;
pub mod cache;
pub mod config;
pub mod error;
pub mod query;

pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use query::{Query, QueryResult};
