//! The meta-tool: `execute_rust_code` exposed to the model.
//!
//! Bridges the execution engine to the [`ToolDyn`] interface. Parameter
//! problems come back as error tool outputs so the model can retry;
//! recoverable execution failures come back as plain text results;
//! fatal and infrastructure failures propagate as [`ToolError`] and
//! abort the turn.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use codemode_gen::{GenError, describe};
use codemode_types::{ContentBlock, ExecError, ExecutionRequest};
use codemode_tool::{ToolContext, ToolDyn, ToolError, ToolOutput};
use serde::Deserialize;

use crate::engine::Engine;

/// The version string reported by the local Rust toolchain, for the
/// meta-tool description. Falls back to a placeholder when `rustc` is
/// unavailable.
pub async fn toolchain_version() -> String {
    match tokio::process::Command::new("rustc")
        .arg("--version")
        .output()
        .await
    {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => "rust (version unknown)".to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct MetaToolParams {
    code: String,
    #[serde(rename = "executionTimeout")]
    execution_timeout: i64,
}

/// [`ToolDyn`] adapter for the sandbox engine.
pub struct ExecuteCodeTool {
    engine: Arc<Engine>,
    description: String,
}

impl ExecuteCodeTool {
    /// Build the adapter, generating the tool description from the
    /// engine's catalog and the local toolchain version.
    ///
    /// # Errors
    ///
    /// Propagates schema lowering failures from description generation.
    pub async fn new(engine: Arc<Engine>) -> Result<Self, GenError> {
        let version = toolchain_version().await;
        let description = describe::meta_tool_description(
            engine.servers(),
            &version,
            engine.config().max_timeout_secs,
        )?;
        Ok(Self {
            engine,
            description,
        })
    }
}

impl ToolDyn for ExecuteCodeTool {
    fn name(&self) -> &str {
        describe::meta_tool_name()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        describe::meta_tool_input_schema(self.engine.config().max_timeout_secs)
    }

    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let params: MetaToolParams = match serde_json::from_value(input) {
                Ok(params) => params,
                Err(e) => return Ok(ToolOutput::error_text(format!("invalid parameters: {e}"))),
            };
            let max = self.engine.config().max_timeout_secs;
            if params.execution_timeout < 1 || params.execution_timeout as u64 > max {
                return Ok(ToolOutput::error_text(format!(
                    "executionTimeout must be between 1 and {max} seconds, got {}",
                    params.execution_timeout
                )));
            }

            let request = ExecutionRequest::new(params.code, params.execution_timeout as u64);
            match self
                .engine
                .execute(&request, &ctx.cancellation_token)
                .await
            {
                Ok(result) => {
                    let mut content = Vec::with_capacity(result.content.len() + 1);
                    if !result.output.is_empty() {
                        content.push(ContentBlock::text(result.output));
                    }
                    content.extend(result.content);
                    if content.is_empty() {
                        // A result message must carry at least one block.
                        content.push(ContentBlock::text(""));
                    }
                    Ok(ToolOutput {
                        content,
                        is_error: false,
                    })
                }
                Err(ExecError::Recoverable { output, .. }) => Ok(ToolOutput::text(output)),
                Err(ExecError::Fatal { output }) => Err(ToolError::ExecutionFailed(format!(
                    "sandbox driver failed fatally (exit code 3): {output}"
                ))),
                Err(err) => Err(ToolError::ExecutionFailed(err.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    async fn adapter() -> ExecuteCodeTool {
        let engine = Arc::new(Engine::new(vec![], EngineConfig::default()));
        ExecuteCodeTool::new(engine).await.unwrap()
    }

    #[tokio::test]
    async fn name_and_schema() {
        let tool = adapter().await;
        assert_eq!(tool.name(), "execute_rust_code");
        let schema = tool.input_schema();
        assert_eq!(schema["required"], serde_json::json!(["code", "executionTimeout"]));
    }

    #[tokio::test]
    async fn malformed_parameters_return_an_error_output_not_an_error() {
        let tool = adapter().await;
        let ctx = ToolContext::default();
        let out = tool
            .call(serde_json::json!({"code": 42}), &ctx)
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.joined_text().contains("invalid parameters"));
    }

    #[tokio::test]
    async fn timeout_bounds_are_enforced() {
        let tool = adapter().await;
        let ctx = ToolContext::default();
        for bad in [0, -1, 301] {
            let out = tool
                .call(
                    serde_json::json!({"code": "pub async fn run() {}", "executionTimeout": bad}),
                    &ctx,
                )
                .await
                .unwrap();
            assert!(out.is_error, "timeout {bad} must be rejected");
            assert!(out.joined_text().contains("executionTimeout"));
        }
    }
}
