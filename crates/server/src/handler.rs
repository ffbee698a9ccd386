//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::offline_fetch::{OfflineFetchParams, fetch_impl};
use crate::tools::push_show::{PushShowParams, show_impl};
use crate::tools::worker::{WorkerControlParams, WorkerInstallParams, control_impl, install_impl, status_impl};

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
use storecache_client::{Notifier, Registration};
use storecache_core::AppConfig;

/// The MCP host for the storefront response cache.
#[derive(Clone)]
pub struct StoreCacheServer {
    registration: Arc<Registration>,
    config: Arc<AppConfig>,
    notifier: Arc<dyn Notifier>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl StoreCacheServer {
    pub fn new(registration: Arc<Registration>, config: Arc<AppConfig>, notifier: Arc<dyn Notifier>) -> Self {
        Self { registration, config, notifier, tool_router: Self::tool_router() }
    }

    /// Route a request through the active cache layer.
    #[tool(
        description = "Fetch a URL through the offline cache layer. Same-origin GETs are served Cache-First or Network-First by resource class; the result reports where the response came from."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "Post a control message to the cache layer. \"force-activate\" promotes the waiting version.")]
    async fn worker_control(&self, params: Parameters<WorkerControlParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.registration, params.0).await
    }

    /// Install a newer deployment; it precaches its manifest and then waits.
    #[tool(description = "Install a new deployment generation. Precaches the app shell, then waits for force-activate.")]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "Report the active and waiting versions and the cache regions on disk.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration).await
    }

    #[tool(description = "Display a push notification from a raw payload (JSON {title, body, icon, url} or plain text).")]
    async fn push_show(&self, params: Parameters<PushShowParams>) -> Result<CallToolResult, McpError> {
        show_impl(self.notifier.as_ref(), params.0)
    }
}

impl ServerHandler for StoreCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "storecache".into(),
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
    use storecache_client::{FetchClient, FetchConfig, TracingNotifier};
    use storecache_core::CacheDb;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let registration = Arc::new(Registration::new(db, network));
        let server = StoreCacheServer::new(registration, Arc::new(AppConfig::default()), Arc::new(TracingNotifier));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, ["offline_fetch", "push_show", "worker_control", "worker_install", "worker_status"]);
    }
}
