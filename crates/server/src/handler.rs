//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{CachePurgeParams, FindAvailabilityParams, cache_stats_impl, find_availability_impl, purge_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shelfcheck_client::CatalogEngine;

/// The main MCP server handler for shelfcheck.
#[derive(Clone)]
pub struct ShelfcheckServer {
    engine: Arc<CatalogEngine>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShelfcheckServer {
    /// Create a new server handler around a shared engine.
    pub fn new(engine: Arc<CatalogEngine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    /// Look a film up in the library catalog.
    #[tool(
        description = "Check whether a film is held by the library catalog. Returns availability, the matched catalog title, a match score and a catalog link."
    )]
    async fn find_availability(&self, params: Parameters<FindAvailabilityParams>) -> Result<CallToolResult, McpError> {
        find_availability_impl(&self.engine, params.0).await
    }

    /// Drop cached lookup results.
    #[tool(description = "Purge cached lookup results. Set expired_only to drop only entries past the retention window.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.engine.cache(), params.0).await
    }

    /// Report cache occupancy.
    #[tool(description = "Report the number of cached lookup results and the age of the oldest one.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        cache_stats_impl(self.engine.cache()).await
    }
}

impl ServerHandler for ShelfcheckServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shelfcheck".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::stub_engine;

    #[test]
    fn test_lists_catalog_tools() {
        let (engine, _) = stub_engine(&[]);
        let server = ShelfcheckServer::new(Arc::new(engine));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, vec!["cache_purge", "cache_stats", "find_availability"]);
    }

    #[test]
    fn test_server_info() {
        let (engine, _) = stub_engine(&[]);
        let info = ShelfcheckServer::new(Arc::new(engine)).get_info();

        assert_eq!(info.server_info.name, "shelfcheck");
        assert!(info.capabilities.tools.is_some());
    }
}
