//! The subagent event wire type.
//!
//! One JSON object per event; absent or empty optional fields are
//! omitted on the wire. Ordering across subagents is best-effort by
//! timestamp — the authoritative ordering is per (subagent, run id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The model requested a tool invocation.
    ToolCall,
    /// A tool invocation produced a result.
    ToolResult,
    /// The model emitted a reasoning trace.
    ThoughtTrace,
    /// A subagent run began.
    SubagentStart,
    /// A subagent run finished.
    SubagentEnd,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::ThoughtTrace => "thought_trace",
            EventKind::SubagentStart => "subagent_start",
            EventKind::SubagentEnd => "subagent_end",
        };
        f.write_str(name)
    }
}

/// Token accounting attached to lifecycle events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageRecord {
    /// Input tokens consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    /// Output tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    /// Input + output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    /// Tokens read from cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
    /// Tokens written to cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write_tokens: Option<u64>,
}

/// One subagent event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Event {
    /// Name of the subagent that produced the event.
    pub subagent_name: String,
    /// Identifier of the subagent run.
    pub subagent_run_id: String,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// The event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Tool name, for tool events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Call id pairing a tool call with its result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Event payload: thinking text, tool parameters, or tool result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Execution timeout, only for meta-tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout_seconds: Option<i64>,
    /// Provider-reported reasoning category, for thought traces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_type: Option<String>,
    /// Token accounting, for lifecycle events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsageRecord>,
}

impl Event {
    /// A bare event of `kind`, stamped now.
    pub fn new(
        subagent_name: impl Into<String>,
        subagent_run_id: impl Into<String>,
        kind: EventKind,
    ) -> Self {
        Self {
            subagent_name: subagent_name.into(),
            subagent_run_id: subagent_run_id.into(),
            timestamp: Utc::now(),
            kind,
            tool_name: None,
            tool_call_id: None,
            payload: None,
            execution_timeout_seconds: None,
            reasoning_type: None,
            token_usage: None,
        }
    }

    /// Set the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Set the tool name and call id.
    #[must_use]
    pub fn with_tool(mut self, name: impl Into<String>, call_id: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self.tool_call_id = Some(call_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_camel_case() {
        let event = Event::new("researcher", "run-1", EventKind::ToolCall)
            .with_tool("execute_rust_code", "call_123")
            .with_payload("pub async fn run() {}");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["subagentName"], "researcher");
        assert_eq!(json["subagentRunId"], "run-1");
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["toolName"], "execute_rust_code");
        assert_eq!(json["toolCallId"], "call_123");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn absent_fields_are_omitted() {
        let event = Event::new("a", "r", EventKind::SubagentStart);
        let json = serde_json::to_value(&event).unwrap();
        for absent in [
            "toolName",
            "toolCallId",
            "payload",
            "executionTimeoutSeconds",
            "reasoningType",
            "tokenUsage",
        ] {
            assert!(json.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[test]
    fn token_usage_wire_shape() {
        let mut event = Event::new("a", "r", EventKind::SubagentEnd);
        event.token_usage = Some(TokenUsageRecord {
            input_tokens: Some(100),
            output_tokens: Some(50),
            total_tokens: Some(150),
            cache_read_tokens: None,
            cache_write_tokens: None,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tokenUsage"]["inputTokens"], 100);
        assert_eq!(json["tokenUsage"]["totalTokens"], 150);
        assert!(json["tokenUsage"].get("cacheReadTokens").is_none());
    }

    #[test]
    fn roundtrip() {
        let event = Event::new("a", "r", EventKind::ThoughtTrace).with_payload("Let me think…");
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn kind_display_matches_wire_names() {
        assert_eq!(EventKind::ToolCall.to_string(), "tool_call");
        assert_eq!(EventKind::ThoughtTrace.to_string(), "thought_trace");
        assert_eq!(EventKind::SubagentEnd.to_string(), "subagent_end");
    }
}
