//! Event-emitting middleware around the inner generator.
//!
//! [`EmittingProvider`] wraps any [`Provider`] so that one completion
//! round-trip emits its events in chronological order:
//!
//! 1. Before the inner call — one `tool_result` per result newer than
//!    the last assistant message, matched to a tool name via the
//!    assistant's call ids. These are the previous iteration's tool
//!    executions, surfaced at the exact moment before the model is
//!    re-invoked.
//! 2. After the inner call — one event per response block, in block
//!    order: `thought_trace` for thinking, `tool_call` for tool use.
//!
//! Terminal tools are skipped on both sides. Any emission failure fails
//! the `complete` call; nothing is retried or buffered.

use codemode_events::{Event, EventClient, EventKind};
use codemode_turn::{ContentPart, Provider, ProviderError, ProviderRequest, ProviderResponse, Role};

/// Identity and naming configuration for one emitting subagent.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Subagent name, stamped on every event.
    pub subagent_name: String,
    /// Subagent run id, stamped on every event.
    pub run_id: String,
    /// The meta-tool name; its `code` and `executionTimeout` arguments
    /// get dedicated event fields.
    pub meta_tool_name: String,
    /// Tool names that terminate the turn; never emitted.
    pub terminal_tools: Vec<String>,
}

impl EmitterConfig {
    fn is_terminal(&self, name: &str) -> bool {
        self.terminal_tools.iter().any(|t| t == name)
    }
}

/// A [`Provider`] wrapper that emits subagent events at each
/// round-trip boundary.
pub struct EmittingProvider<P> {
    inner: P,
    client: EventClient,
    config: EmitterConfig,
}

impl<P> EmittingProvider<P> {
    /// Wrap `inner` so its round-trips emit events through `client`.
    pub fn new(inner: P, client: EventClient, config: EmitterConfig) -> Self {
        Self {
            inner,
            client,
            config,
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(
            self.config.subagent_name.clone(),
            self.config.run_id.clone(),
            kind,
        )
    }

    async fn emit(&self, event: Event) -> Result<(), ProviderError> {
        self.client
            .emit(&event)
            .await
            .map_err(|e| ProviderError::Emission(e.to_string()))
    }

    /// Emit `tool_result` events for results that arrived after the
    /// last assistant message.
    async fn emit_pending_tool_results(
        &self,
        request: &ProviderRequest,
    ) -> Result<(), ProviderError> {
        let Some(last_assistant) = request
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Ok(());
        };

        // Map call id -> tool name from the assistant's tool-use blocks.
        let assistant = &request.messages[last_assistant];
        let name_of = |call_id: &str| -> Option<&str> {
            assistant.content.iter().find_map(|part| match part {
                ContentPart::ToolUse { id, name, .. } if id == call_id => Some(name.as_str()),
                _ => None,
            })
        };

        for message in &request.messages[last_assistant + 1..] {
            for part in &message.content {
                let ContentPart::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } = part
                else {
                    continue;
                };
                let Some(tool_name) = name_of(tool_use_id) else {
                    continue;
                };
                if self.config.is_terminal(tool_name) {
                    continue;
                }
                let event = self
                    .event(EventKind::ToolResult)
                    .with_tool(tool_name, tool_use_id.clone())
                    .with_payload(content.clone());
                self.emit(event).await?;
            }
        }
        Ok(())
    }

    /// Emit `thought_trace` / `tool_call` events for one response, in
    /// block order.
    async fn emit_response_events(
        &self,
        response: &ProviderResponse,
    ) -> Result<(), ProviderError> {
        for part in &response.content {
            match part {
                ContentPart::Thinking {
                    text,
                    reasoning_type,
                } => {
                    let mut event = self.event(EventKind::ThoughtTrace).with_payload(text.clone());
                    event.reasoning_type = reasoning_type.clone();
                    self.emit(event).await?;
                }
                ContentPart::ToolUse { id, name, input } => {
                    if self.config.is_terminal(name) {
                        continue;
                    }
                    let mut event = self
                        .event(EventKind::ToolCall)
                        .with_tool(name.clone(), id.clone());
                    if *name == self.config.meta_tool_name {
                        event.payload = input
                            .get("code")
                            .and_then(serde_json::Value::as_str)
                            .map(str::to_string);
                        event.execution_timeout_seconds =
                            input.get("executionTimeout").and_then(serde_json::Value::as_i64);
                    } else {
                        event.payload = serde_json::to_string(input).ok();
                    }
                    self.emit(event).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl<P: Provider> Provider for EmittingProvider<P> {
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.emit_pending_tool_results(&request).await?;
        let response = self.inner.complete(request).await?;
        self.emit_response_events(&response).await?;
        Ok(response)
    }
}
