//! The tool loop: call the model, execute requested tools, feed back
//! results, repeat.
//!
//! Recoverable tool outcomes flow back to the model as ordinary result
//! parts; a [`ToolError`] from any tool aborts the loop. Terminal tools
//! end the run with their arguments as the answer.

use codemode_events::{Event, EventClient, EventKind, TokenUsageRecord};
use codemode_tool::{ToolContext, ToolError, ToolOutput, ToolRegistry};
use codemode_turn::{
    ContentPart, Provider, ProviderError, ProviderMessage, ProviderRequest, Role, StopReason,
    TokenUsage, ToolSchema,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Static configuration for a [`ToolLoop`].
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// System prompt for every request.
    pub system_prompt: String,
    /// Model identifier (None = provider default).
    pub model: Option<String>,
    /// Max output tokens per response.
    pub max_tokens: u32,
    /// Max model turns before the loop stops.
    pub max_turns: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            model: None,
            max_tokens: 4096,
            max_turns: 10,
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// The model finished without requesting a tool.
    Done,
    /// The model called a terminal tool.
    TerminalTool {
        /// Name of the terminal tool.
        name: String,
    },
    /// The turn budget ran out.
    MaxTurns,
}

/// The result of a completed loop.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// The last assistant content.
    pub content: Vec<ContentPart>,
    /// The terminal tool's arguments, when the loop ended through one.
    pub answer: Option<serde_json::Value>,
    /// Why the loop stopped.
    pub exit_reason: ExitReason,
    /// Accumulated token usage across all turns.
    pub usage: TokenUsage,
    /// Number of model turns used.
    pub turns_used: u32,
}

/// Errors that abort the loop.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LoopError {
    /// The provider failed (includes emission failures from the
    /// middleware — see [`ProviderError::Emission`]).
    #[error("model error: {0}")]
    Provider(#[from] ProviderError),

    /// A tool failed unrecoverably.
    #[error("tool error in {tool}: {message}")]
    Tool {
        /// Name of the failing tool.
        tool: String,
        /// Failure description.
        message: String,
    },

    /// A lifecycle event could not be emitted.
    #[error("event emission failed: {0}")]
    Emission(String),
}

/// Identity stamped on lifecycle events.
#[derive(Debug, Clone)]
pub struct SubagentIdentity {
    /// Subagent name.
    pub name: String,
    /// Subagent run id.
    pub run_id: String,
}

/// Drives a [`Provider`] and a [`ToolRegistry`] until the model is done.
pub struct ToolLoop<P: Provider> {
    provider: P,
    tools: ToolRegistry,
    config: LoopConfig,
    lifecycle: Option<(EventClient, SubagentIdentity)>,
}

impl<P: Provider> ToolLoop<P> {
    /// Create a loop over `provider` and `tools`.
    pub fn new(provider: P, tools: ToolRegistry, config: LoopConfig) -> Self {
        Self {
            provider,
            tools,
            config,
            lifecycle: None,
        }
    }

    /// Emit `subagent_start` / `subagent_end` lifecycle events around
    /// [`run`](Self::run). Emission failures abort the loop.
    #[must_use]
    pub fn with_lifecycle_events(mut self, client: EventClient, identity: SubagentIdentity) -> Self {
        self.lifecycle = Some((client, identity));
        self
    }

    /// Run the loop to completion over an initial dialog.
    ///
    /// # Errors
    ///
    /// [`LoopError::Provider`] on provider or emission failures,
    /// [`LoopError::Tool`] when a tool aborts the turn.
    pub async fn run(
        &self,
        mut messages: Vec<ProviderMessage>,
        cancel: CancellationToken,
    ) -> Result<LoopOutcome, LoopError> {
        self.emit_lifecycle(EventKind::SubagentStart, None).await?;
        let outcome = self.run_inner(&mut messages, cancel).await;
        let usage = outcome.as_ref().map(|o| o.usage.clone()).unwrap_or_default();
        self.emit_lifecycle(EventKind::SubagentEnd, Some(&usage))
            .await?;
        outcome
    }

    async fn run_inner(
        &self,
        messages: &mut Vec<ProviderMessage>,
        cancel: CancellationToken,
    ) -> Result<LoopOutcome, LoopError> {
        let tool_ctx = ToolContext {
            cancellation_token: cancel,
        };
        let schemas = self.tool_schemas();
        let mut usage = TokenUsage::default();
        let mut turns_used = 0u32;

        loop {
            let request = ProviderRequest {
                model: self.config.model.clone(),
                messages: messages.clone(),
                tools: schemas.clone(),
                max_tokens: Some(self.config.max_tokens),
                system: non_empty(&self.config.system_prompt),
                extra: serde_json::Value::Null,
            };

            let response = self.provider.complete(request).await?;
            turns_used += 1;
            usage.add(&response.usage);

            if response.stop_reason != StopReason::ToolUse {
                return Ok(LoopOutcome {
                    content: response.content,
                    answer: None,
                    exit_reason: ExitReason::Done,
                    usage,
                    turns_used,
                });
            }

            messages.push(ProviderMessage {
                role: Role::Assistant,
                content: response.content.clone(),
            });

            let tool_uses: Vec<(String, String, serde_json::Value)> = response
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            // A terminal tool ends the run; its arguments are the answer.
            if let Some((_, name, input)) = tool_uses
                .iter()
                .find(|(_, name, _)| self.tools.is_terminal(name))
            {
                return Ok(LoopOutcome {
                    content: response.content,
                    answer: Some(input.clone()),
                    exit_reason: ExitReason::TerminalTool { name: name.clone() },
                    usage,
                    turns_used,
                });
            }

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in tool_uses {
                let output = self.dispatch(&name, input, &tool_ctx).await?;
                let text = output.joined_text();
                let blocks: Vec<_> = output
                    .content
                    .into_iter()
                    .filter(|b| b.as_text().is_none())
                    .collect();
                results.push(ContentPart::ToolResult {
                    tool_use_id: id,
                    content: text,
                    blocks,
                    is_error: output.is_error,
                });
            }
            messages.push(ProviderMessage {
                role: Role::User,
                content: results,
            });

            if turns_used >= self.config.max_turns {
                return Ok(LoopOutcome {
                    content: response.content,
                    answer: None,
                    exit_reason: ExitReason::MaxTurns,
                    usage,
                    turns_used,
                });
            }
        }
    }

    async fn dispatch(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, LoopError> {
        let Some(tool) = self.tools.get(name) else {
            // An unknown tool is the model's mistake, not a fatal one.
            return Ok(ToolOutput::error_text(format!(
                "{}",
                ToolError::NotFound(name.to_string())
            )));
        };
        tracing::debug!(tool = name, "dispatching tool call");
        tool.call(input, ctx).await.map_err(|e| LoopError::Tool {
            tool: name.to_string(),
            message: e.to_string(),
        })
    }

    fn tool_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .iter()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect();
        schemas.extend(self.tools.terminal_tools().map(|t| ToolSchema {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.input_schema.clone(),
        }));
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    async fn emit_lifecycle(
        &self,
        kind: EventKind,
        usage: Option<&TokenUsage>,
    ) -> Result<(), LoopError> {
        let Some((client, identity)) = &self.lifecycle else {
            return Ok(());
        };
        let mut event = Event::new(identity.name.clone(), identity.run_id.clone(), kind);
        if let Some(usage) = usage {
            event.token_usage = Some(TokenUsageRecord {
                input_tokens: Some(usage.input_tokens),
                output_tokens: Some(usage.output_tokens),
                total_tokens: Some(usage.total()),
                cache_read_tokens: usage.cache_read_tokens,
                cache_write_tokens: usage.cache_creation_tokens,
            });
        }
        client
            .emit(&event)
            .await
            .map_err(|e| LoopError::Emission(e.to_string()))
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemode_tool::{TerminalTool, ToolDyn};
    use codemode_turn::ProviderResponse;
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    /// Pops one canned response per call; records every request.
    struct Scripted {
        responses: Mutex<Vec<ProviderResponse>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<ProviderResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl Provider for Scripted {
        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().expect("requests lock").push(request);
            self.responses
                .lock()
                .expect("responses lock")
                .pop()
                .ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into()))
        }
    }

    fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentPart::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                ..TokenUsage::default()
            },
            model: "test-model".into(),
        }
    }

    fn tool_use_response(id: &str, name: &str, input: serde_json::Value) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentPart::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
            model: "test-model".into(),
        }
    }

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call<'a>(
            &'a self,
            input: serde_json::Value,
            _ctx: &'a ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
            Box::pin(async move { Ok(ToolOutput::text(input.to_string())) })
        }
    }

    struct FailingTool;

    impl ToolDyn for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails fatally"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call<'a>(
            &'a self,
            _input: serde_json::Value,
            _ctx: &'a ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
            Box::pin(async move { Err(ToolError::ExecutionFailed("driver exit 3".into())) })
        }
    }

    fn loop_over(provider: Scripted, tools: ToolRegistry) -> ToolLoop<Scripted> {
        ToolLoop::new(provider, tools, LoopConfig::default())
    }

    #[tokio::test]
    async fn end_turn_finishes_immediately() {
        let looped = loop_over(Scripted::new(vec![text_response("done")]), ToolRegistry::new());
        let outcome = looped
            .run(
                vec![ProviderMessage::user_text("hi")],
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.exit_reason, ExitReason::Done);
        assert_eq!(outcome.turns_used, 1);
        assert_eq!(outcome.usage.total(), 15);
    }

    #[tokio::test]
    async fn tool_results_are_fed_back() {
        let provider = Scripted::new(vec![
            tool_use_response("call_1", "echo", json!({"x": 1})),
            text_response("finished"),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        let looped = ToolLoop::new(provider, tools, LoopConfig::default());

        let outcome = looped
            .run(
                vec![ProviderMessage::user_text("go")],
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.exit_reason, ExitReason::Done);
        assert_eq!(outcome.turns_used, 2);

        // The second request must contain assistant tool-use + user result.
        let requests = looped.provider.requests.lock().unwrap();
        let second = &requests[1];
        let result_part = second
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|p| match p {
                ContentPart::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                    ..
                } => Some((tool_use_id.clone(), content.clone(), *is_error)),
                _ => None,
            })
            .expect("tool result backfilled");
        assert_eq!(result_part.0, "call_1");
        assert!(result_part.1.contains("\"x\":1"));
        assert!(!result_part.2);
    }

    #[tokio::test]
    async fn terminal_tool_ends_the_run_with_its_arguments() {
        let provider = Scripted::new(vec![tool_use_response(
            "call_9",
            "final_answer",
            json!({"answer": "42"}),
        )]);
        let mut tools = ToolRegistry::new();
        tools.register_terminal(TerminalTool {
            name: "final_answer".into(),
            description: "Finish".into(),
            input_schema: json!({"type": "object"}),
        });
        let looped = ToolLoop::new(provider, tools, LoopConfig::default());

        let outcome = looped
            .run(
                vec![ProviderMessage::user_text("go")],
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.exit_reason,
            ExitReason::TerminalTool {
                name: "final_answer".into()
            }
        );
        assert_eq!(outcome.answer, Some(json!({"answer": "42"})));
    }

    #[tokio::test]
    async fn tool_error_aborts_the_loop() {
        let provider = Scripted::new(vec![tool_use_response("call_2", "broken", json!({}))]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(FailingTool));
        let looped = ToolLoop::new(provider, tools, LoopConfig::default());

        let err = looped
            .run(
                vec![ProviderMessage::user_text("go")],
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            LoopError::Tool { tool, message } => {
                assert_eq!(tool, "broken");
                assert!(message.contains("driver exit 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_recoverable() {
        let provider = Scripted::new(vec![
            tool_use_response("call_3", "no_such_tool", json!({})),
            text_response("adapted"),
        ]);
        let looped = loop_over(provider, ToolRegistry::new());

        let outcome = looped
            .run(
                vec![ProviderMessage::user_text("go")],
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.exit_reason, ExitReason::Done);

        let requests = looped.provider.requests.lock().unwrap();
        let result = requests[1]
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|p| match p {
                ContentPart::ToolResult {
                    content, is_error, ..
                } => Some((content.clone(), *is_error)),
                _ => None,
            })
            .unwrap();
        assert!(result.0.contains("tool not found: no_such_tool"));
        assert!(result.1);
    }

    #[tokio::test]
    async fn max_turns_bounds_the_loop() {
        let mut responses = Vec::new();
        for i in 0..5 {
            responses.push(tool_use_response(&format!("call_{i}"), "echo", json!({})));
        }
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        let looped = ToolLoop::new(
            Scripted::new(responses),
            tools,
            LoopConfig {
                max_turns: 3,
                ..LoopConfig::default()
            },
        );

        let outcome = looped
            .run(
                vec![ProviderMessage::user_text("go")],
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.exit_reason, ExitReason::MaxTurns);
        assert_eq!(outcome.turns_used, 3);
    }

    #[tokio::test]
    async fn terminal_tools_are_advertised_to_the_model() {
        let provider = Scripted::new(vec![text_response("ok")]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        tools.register_terminal(TerminalTool {
            name: "final_answer".into(),
            description: "Finish".into(),
            input_schema: json!({"type": "object"}),
        });
        let looped = ToolLoop::new(provider, tools, LoopConfig::default());
        looped
            .run(
                vec![ProviderMessage::user_text("go")],
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let requests = looped.provider.requests.lock().unwrap();
        let names: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["echo", "final_answer"]);
    }
}

