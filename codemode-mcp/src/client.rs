//! MCP client that connects over a configured transport and discovers
//! remote tools.
//!
//! Discovery keeps output schemas: the code generator lowers both sides
//! of every tool. The same client also makes tool calls on behalf of
//! [`McpToolBridge`](crate::bridge::McpToolBridge) for excluded tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use codemode_types::{ServerTransport, ToolCatalog, ToolDescriptor};
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::sse_client::SseClientTransport;
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};

use crate::error::{McpError, from_service_error};

/// An MCP client bound to one server.
pub struct McpClient {
    service: RunningService<RoleClient, ()>,
}

impl McpClient {
    /// Connect using whatever transport the descriptor configures.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Connection`] when the transport cannot be
    /// established or the MCP handshake fails.
    pub async fn connect(transport: &ServerTransport) -> Result<Self, McpError> {
        match transport {
            ServerTransport::Stdio { command, args, env } => {
                Self::connect_stdio(command, args, env).await
            }
            ServerTransport::Http { url, headers } => Self::connect_http(url, headers).await,
            ServerTransport::Sse { url, .. } => {
                // TODO: SSE headers are accepted in configuration but not
                // installed; the transport has no header surface yet.
                Self::connect_sse(url).await
            }
            other => Err(McpError::Connection(format!(
                "unsupported transport: {other:?}"
            ))),
        }
    }

    async fn connect_stdio(
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Self, McpError> {
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        let transport =
            TokioChildProcess::new(cmd).map_err(|e| McpError::Connection(e.to_string()))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(Self { service })
    }

    async fn connect_http(
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<Self, McpError> {
        let service = if headers.is_empty() {
            let transport = StreamableHttpClientTransport::from_uri(url);
            ()
                .serve(transport)
                .await
                .map_err(|e| McpError::Connection(e.to_string()))?
        } else {
            let mut header_map = reqwest::header::HeaderMap::new();
            for (name, value) in headers {
                let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| McpError::Connection(format!("invalid header name {name:?}: {e}")))?;
                let value = reqwest::header::HeaderValue::from_str(value)
                    .map_err(|e| McpError::Connection(format!("invalid header value: {e}")))?;
                header_map.insert(name, value);
            }
            let client = reqwest::Client::builder()
                .default_headers(header_map)
                .build()
                .map_err(|e| McpError::Connection(e.to_string()))?;
            let transport = StreamableHttpClientTransport::with_client(
                client,
                StreamableHttpClientTransportConfig::with_uri(url.to_string()),
            );
            ()
                .serve(transport)
                .await
                .map_err(|e| McpError::Connection(e.to_string()))?
        };
        Ok(Self { service })
    }

    async fn connect_sse(url: &str) -> Result<Self, McpError> {
        let transport = SseClientTransport::start(url.to_string())
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(Self { service })
    }

    /// List every tool the server advertises.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Protocol`] when the listing request fails.
    pub async fn discover_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(from_service_error)?;

        Ok(tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.to_string(),
                description: tool.description.as_deref().unwrap_or("").to_string(),
                input_schema: serde_json::to_value(&*tool.input_schema).ok(),
                output_schema: tool
                    .output_schema
                    .as_ref()
                    .and_then(|schema| serde_json::to_value(&**schema).ok()),
            })
            .collect())
    }

    /// Call one tool on this server.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Protocol`] when the call fails at the
    /// protocol level. A remote-side `isError` result is not an error
    /// here — the caller decides how to surface it.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult, McpError> {
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments,
            task: None,
        };
        self.service
            .peer()
            .call_tool(params)
            .await
            .map_err(from_service_error)
    }

    /// The underlying peer, for callers that manage calls themselves.
    pub fn peer(&self) -> Peer<RoleClient> {
        self.service.peer().clone()
    }

    /// Shut down the connection.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Connection`] when shutdown fails.
    pub async fn close(self) -> Result<(), McpError> {
        self.service
            .cancel()
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// Connect to every configured server and assemble the tool catalog.
///
/// Returns the catalog plus the live clients (keyed by server name) so
/// excluded tools can be bridged without reconnecting.
///
/// # Errors
///
/// Fails on the first server that cannot be reached or listed.
pub async fn discover_catalog(
    servers: &BTreeMap<String, ServerTransport>,
) -> Result<(ToolCatalog, BTreeMap<String, Arc<McpClient>>), McpError> {
    let mut catalog = ToolCatalog::new();
    let mut clients = BTreeMap::new();
    for (name, transport) in servers {
        let client = McpClient::connect(transport).await?;
        let tools = client.discover_tools().await?;
        tracing::debug!(server = %name, tools = tools.len(), "discovered tools");
        catalog.insert(name.clone(), tools);
        clients.insert(name.clone(), Arc::new(client));
    }
    Ok((catalog, clients))
}
