//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and clearing the lookup result cache.

pub mod purge;
pub mod stats;

pub use purge::{CachePurgeParams, purge_impl};
pub use stats::cache_stats_impl;
