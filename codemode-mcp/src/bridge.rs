//! Bridge MCP tools to the [`ToolDyn`] trait.
//!
//! Excluded tools are surfaced to the model directly rather than through
//! generated code. Each bridge holds a shared [`McpClient`] and one
//! tool's descriptor, forwarding calls to the remote server and mapping
//! the response into [`ToolOutput`] content blocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use codemode_types::{ContentBlock, ToolDescriptor};
use codemode_tool::{ToolContext, ToolDyn, ToolError, ToolOutput};
use rmcp::model::RawContent;

use crate::client::McpClient;

/// Adapts one remote MCP tool to [`ToolDyn`].
pub struct McpToolBridge {
    client: Arc<McpClient>,
    descriptor: ToolDescriptor,
}

impl McpToolBridge {
    /// Create a bridge for a discovered tool.
    #[must_use]
    pub fn new(client: Arc<McpClient>, descriptor: ToolDescriptor) -> Self {
        Self { client, descriptor }
    }

    /// Bridge every tool in `descriptors` against one shared client.
    pub fn bridge_all(
        client: &Arc<McpClient>,
        descriptors: Vec<ToolDescriptor>,
    ) -> Vec<Arc<dyn ToolDyn>> {
        descriptors
            .into_iter()
            .map(|descriptor| {
                Arc::new(McpToolBridge::new(Arc::clone(client), descriptor)) as Arc<dyn ToolDyn>
            })
            .collect()
    }
}

impl ToolDyn for McpToolBridge {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn input_schema(&self) -> serde_json::Value {
        self.descriptor
            .input_schema
            .clone()
            .unwrap_or_else(|| serde_json::json!({"type": "object"}))
    }

    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let arguments = match input {
                serde_json::Value::Object(map) => Some(map),
                serde_json::Value::Null => None,
                other => {
                    return Ok(ToolOutput::error_text(format!(
                        "tool input must be an object, got {other}"
                    )));
                }
            };
            let result = self
                .client
                .call_tool(&self.descriptor.name, arguments)
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

            let is_error = result.is_error == Some(true);
            let mut content: Vec<ContentBlock> = Vec::with_capacity(result.content.len());
            for item in &result.content {
                match &item.raw {
                    RawContent::Text(t) => content.push(ContentBlock::text(t.text.clone())),
                    RawContent::Image(image) => match BASE64.decode(&image.data) {
                        Ok(data) => content.push(ContentBlock::Image {
                            data,
                            media_type: image.mime_type.clone(),
                        }),
                        Err(e) => {
                            return Err(ToolError::ExecutionFailed(format!(
                                "decoding image content from {}: {e}",
                                self.descriptor.name
                            )));
                        }
                    },
                    other => {
                        tracing::warn!(
                            tool = %self.descriptor.name,
                            "skipping unsupported content block: {other:?}"
                        );
                    }
                }
            }

            if content.is_empty() {
                if let Some(structured) = &result.structured_content {
                    content.push(ContentBlock::text(structured.to_string()));
                }
            }

            Ok(ToolOutput { content, is_error })
        })
    }
}
