//! find_availability tool implementation.
//!
//! Looks a film title up in the catalog and returns the lookup result as JSON.
//! Catalog-side failures are part of the result (`error` field), not tool errors.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfcheck_client::CatalogEngine;
use shelfcheck_core::{Error, Query};

/// Parameters for the find_availability tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindAvailabilityParams {
    /// Film title as written on the page, e.g. "Paris, Texas".
    pub title: String,

    /// Release year, narrows the catalog search (optional).
    #[serde(default)]
    pub year: Option<String>,
}

/// Implementation of the find_availability tool.
pub async fn find_availability_impl(
    engine: &CatalogEngine, params: FindAvailabilityParams,
) -> Result<CallToolResult, McpError> {
    if params.title.trim().is_empty() {
        return Err(Error::InvalidInput("title cannot be empty".into()).into());
    }

    let query = Query::new(params.title, params.year);
    let result = engine.find_availability(query).await;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize result: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
