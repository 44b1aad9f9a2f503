//! Auto-generated description for the meta-tool.
//!
//! The description is the model's only documentation for the generated
//! surface: it shows the typed wrappers available to user code, the
//! shape of the user file, and the multimedia content contract.

use std::fmt::Write as _;

use codemode_types::CodeModeServer;

use crate::driver::{self, USER_FILE_NAME};
use crate::{GenError, META_TOOL_NAME};

/// Build the description text for the meta-tool exposed to the model.
///
/// # Errors
///
/// Propagates [`GenError::Schema`] when a tool surface cannot be lowered.
pub fn meta_tool_description(
    servers: &[CodeModeServer],
    toolchain_version: &str,
    max_timeout_secs: u64,
) -> Result<String, GenError> {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Execute a Rust program you write, inside an ephemeral sandbox with typed access to the connected MCP tools. Toolchain: {toolchain_version}."
    );
    out.push('\n');
    out.push_str(
        "Provide the complete contents of a module file that defines:\n\n\
```rust\nuse crate::*;\n\n\
pub async fn run(ctx: &CancellationToken) -> Result<Vec<Content>, DynError> {\n    // your code\n    Ok(Vec::new())\n}\n```\n\n\
The file must be complete — include every `use` declaration you need so \
compiler line numbers match your source. The surrounding driver connects \
to each MCP server, installs the wrappers below, cancels `ctx` on \
SIGINT/SIGTERM, and serializes the content you return.\n\n",
    );

    if servers.is_empty() {
        out.push_str("No MCP tools are available to generated code in this session.\n\n");
    } else {
        out.push_str("Available tool wrappers, by server:\n\n");
        let mut sorted: Vec<&CodeModeServer> = servers.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        for server in sorted {
            let _ = writeln!(out, "## server `{}`\n", server.name);
            let mut tools: Vec<_> = server.tools.iter().collect();
            tools.sort_by_key(|t| crate::naming::upper_camel(&t.name));
            for tool in tools {
                let surface = driver::lower_tool(tool)?;
                out.push_str("```rust\n");
                for line in tool.description.lines() {
                    let _ = writeln!(out, "/// {line}");
                }
                let _ = writeln!(out, "{};", surface.signature());
                let decls = surface.decls();
                if !decls.trim().is_empty() {
                    out.push('\n');
                    out.push_str(decls.trim_end());
                    out.push('\n');
                }
                out.push_str("```\n\n");
            }
        }
    }

    out.push_str(
        "Your module is compiled together with a generated driver that you \
never write: it connects to each server, installs the wrappers above \
against live sessions, installs a panic hook, and invokes `run`. A \
wrapper used before its server is connected fails with a deterministic \
error; a wrapper whose call is cancelled returns the cancellation as an \
ordinary error you can propagate.\n\n",
    );

    let _ = writeln!(
        out,
        "Returned content may be `Content::Text(String)`, \
`Content::Image {{ data, mime_type }}`, or `Content::Audio {{ data, mime_type }}` — \
binary payloads are raw bytes; the driver base64-encodes them. \
Optional struct fields are `Option<T>`; construct them with `Some(value)` \
or leave them `None`.\n\n\
`executionTimeout` is the wall-clock budget in seconds (1..={max_timeout_secs}). \
A well-behaved program watches `ctx` and returns promptly once it is cancelled."
    );

    Ok(out)
}

/// Input schema for the meta-tool, in the model's function-call format.
pub fn meta_tool_input_schema(max_timeout_secs: u64) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "code": {
                "type": "string",
                "description": format!("Complete contents of the sandbox `{USER_FILE_NAME}` module, defining `pub async fn run`.")
            },
            "executionTimeout": {
                "type": "integer",
                "minimum": 1,
                "maximum": max_timeout_secs,
                "description": "Wall-clock budget for the compiled program, in seconds."
            }
        },
        "required": ["code", "executionTimeout"]
    })
}

/// The reserved meta-tool name, re-exported beside its schema builder.
pub fn meta_tool_name() -> &'static str {
    META_TOOL_NAME
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemode_types::{ServerTransport, ToolDescriptor};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn description_includes_surface_and_version() {
        let servers = vec![CodeModeServer {
            name: "editor".into(),
            transport: ServerTransport::Stdio {
                command: "editor-mcp".into(),
                args: vec![],
                env: BTreeMap::new(),
            },
            tools: vec![ToolDescriptor {
                name: "read_file".into(),
                description: "Read a file from disk".into(),
                input_schema: Some(json!({
                    "type": "object",
                    "properties": {"path": {"type": "string"}}
                })),
                output_schema: None,
            }],
        }];
        let desc = meta_tool_description(&servers, "rustc 1.85.0", 300).unwrap();
        assert!(desc.contains("rustc 1.85.0"));
        assert!(desc.contains("## server `editor`"));
        assert!(desc.contains("pub async fn read_file(ctx: &CancellationToken, input: ReadFileInput) -> Result<ReadFileOutput, DynError>;"));
        assert!(desc.contains("pub struct ReadFileInput {"));
        assert!(desc.contains("pub async fn run(ctx: &CancellationToken)"));
        assert!(desc.contains("1..=300"));
    }

    #[test]
    fn empty_surface_is_stated() {
        let desc = meta_tool_description(&[], "rust (version unknown)", 300).unwrap();
        assert!(desc.contains("No MCP tools are available"));
    }

    #[test]
    fn input_schema_bounds_timeout() {
        let schema = meta_tool_input_schema(120);
        assert_eq!(schema["properties"]["executionTimeout"]["maximum"], 120);
        assert_eq!(schema["required"], json!(["code", "executionTimeout"]));
    }
}
