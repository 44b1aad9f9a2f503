//! Tool and server descriptors, and the catalog that groups them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Description of a single remote tool as reported by its MCP server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    /// The tool name (identifier-like, unique per server).
    pub name: String,
    /// Human-readable description, possibly multi-line.
    pub description: String,
    /// JSON Schema for the tool's input. `None` means no declared input.
    pub input_schema: Option<serde_json::Value>,
    /// JSON Schema for the tool's output. `None` means untyped text output.
    pub output_schema: Option<serde_json::Value>,
}

/// How to reach an MCP server.
///
/// Maps are `BTreeMap` so that iteration order — and therefore any
/// generated source derived from it — is deterministic.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerTransport {
    /// Spawn a subprocess and speak MCP over its standard streams.
    Stdio {
        /// Executable to launch.
        command: String,
        /// Arguments passed to the executable.
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables, prepended to the parent's.
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Streamable HTTP endpoint.
    Http {
        /// Endpoint URL.
        url: String,
        /// Request headers injected on every call.
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Server-sent-events endpoint.
    Sse {
        /// Endpoint URL.
        url: String,
        /// Accepted for configuration parity; currently not installed
        /// on the SSE transport.
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

/// An ordered mapping from server name to that server's tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCatalog {
    servers: BTreeMap<String, Vec<ToolDescriptor>>,
}

impl ToolCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server's tool list. Replaces any previous entry for the server.
    pub fn insert(&mut self, server: impl Into<String>, tools: Vec<ToolDescriptor>) {
        self.servers.insert(server.into(), tools);
    }

    /// The tools of one server, if present.
    pub fn get(&self, server: &str) -> Option<&[ToolDescriptor]> {
        self.servers.get(server).map(Vec::as_slice)
    }

    /// Iterate servers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ToolDescriptor])> {
        self.servers.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate every tool across all servers, in server-name order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.servers.values().flatten()
    }

    /// Number of servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the catalog has no servers.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// One server's slice of the code-mode side of a partitioned catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeModeServer {
    /// Server name (key from the catalog).
    pub name: String,
    /// How the generated driver reaches this server.
    pub transport: ServerTransport,
    /// The tools exposed through generated code.
    pub tools: Vec<ToolDescriptor>,
}
