//! cache_stats tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use shelfcheck_core::{Error, ResultCache};

/// Implementation of the cache_stats tool.
pub async fn cache_stats_impl(cache: &ResultCache) -> Result<CallToolResult, McpError> {
    let stats = cache.stats().await;
    let json = serde_json::to_string_pretty(&stats)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize stats: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
