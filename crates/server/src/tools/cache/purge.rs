//! cache_purge tool implementation.
//!
//! Drops cached lookup results, either all of them or only the expired ones.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfcheck_core::{Error, ResultCache};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Only remove entries older than the retention window (default: false).
    #[serde(default)]
    pub expired_only: Option<bool>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &ResultCache, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let deleted = if params.expired_only.unwrap_or(false) { cache.sweep().await } else { cache.purge_all().await };
    tracing::info!(deleted, expired_only = params.expired_only.unwrap_or(false), "cache purged");

    let output = CachePurgeOutput { deleted: deleted as u64 };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
