//! Driver synthesis: one complete `main.rs` for the sandbox package.
//!
//! The driver declares the content model, connects to every code-mode
//! server over its configured transport, installs one typed wrapper
//! function per remote tool, seeds a signal-cancelled context, invokes
//! the user module's `run`, and serializes returned content to the
//! content-output path baked in at synthesis time.
//!
//! Output is byte-identical for equal inputs: servers arrive sorted
//! from partitioning and tools are sorted by their UpperCamel
//! identifier before emission.

use std::fmt::Write as _;

use codemode_types::{CodeModeServer, ServerTransport, ToolDescriptor};

use crate::GenError;
use crate::naming::{snake_case, upper_camel};
use crate::schema::{self, LoweredType, RootKind};

/// File name the user's module is written under in the sandbox.
pub const USER_FILE_NAME: &str = "run.rs";

/// File name the driver is written under in the sandbox.
pub const DRIVER_FILE_NAME: &str = "main.rs";

/// Synthesize the complete driver source for `servers`, writing any
/// returned content to `content_path` on success.
///
/// # Errors
///
/// Propagates [`GenError::Schema`] when a tool schema cannot be lowered.
pub fn synthesize(servers: &[CodeModeServer], content_path: &str) -> Result<String, GenError> {
    let mut servers: Vec<&CodeModeServer> = servers.iter().collect();
    servers.sort_by(|a, b| a.name.cmp(&b.name));

    let mut surfaces: Vec<Vec<(&ToolDescriptor, ToolSurface)>> = Vec::with_capacity(servers.len());
    for server in &servers {
        let mut lowered = Vec::with_capacity(server.tools.len());
        for tool in sorted_tools(server) {
            lowered.push((tool, lower_tool(tool)?));
        }
        surfaces.push(lowered);
    }

    let mut features = Features::scan(&servers);
    features.any_structs = surfaces.iter().flatten().any(|(_, s)| {
        s.input.is_some() || s.output.kind == RootKind::Struct
    });

    let mut out = String::new();
    out.push_str("//! Generated sandbox driver. Do not edit.\n\n");
    out.push_str("mod run;\n\n");
    emit_imports(&mut out, &features);
    emit_content_model(&mut out, content_path);
    emit_fatal_exit(&mut out);
    if features.any_http_headers {
        emit_header_map_helper(&mut out);
    }
    if features.any_tools {
        emit_call_helpers(&mut out);
    }

    for lowered in &surfaces {
        for (_, surface) in lowered {
            out.push_str(&surface.decls());
        }
    }

    for (server, lowered) in servers.iter().zip(&surfaces) {
        emit_peer_static(&mut out, server);
        for (tool, surface) in lowered {
            emit_wrapper(&mut out, server, tool, surface);
        }
    }

    emit_main(&mut out, &servers);
    Ok(out)
}

/// The typed surface of one tool: wrapper signature plus the type
/// declarations backing it. Shared with the meta-tool description.
pub(crate) struct ToolSurface {
    pub(crate) input: Option<LoweredType>,
    pub(crate) output: LoweredType,
    pub(crate) fn_name: String,
}

impl ToolSurface {
    pub(crate) fn decls(&self) -> String {
        let mut s = String::new();
        if let Some(input) = &self.input {
            s.push_str(&input.decls);
            s.push('\n');
        }
        s.push_str(&self.output.decls);
        s.push('\n');
        s
    }

    /// The wrapper signature, without a body.
    pub(crate) fn signature(&self) -> String {
        let input = match &self.input {
            Some(t) => format!(", input: {}", t.root),
            None => String::new(),
        };
        format!(
            "pub async fn {}(ctx: &CancellationToken{input}) -> Result<{}, DynError>",
            self.fn_name, self.output.root
        )
    }
}

pub(crate) fn lower_tool(tool: &ToolDescriptor) -> Result<ToolSurface, GenError> {
    let camel = upper_camel(&tool.name);
    let input = schema::lower_input(
        tool.input_schema.as_ref(),
        &format!("{camel}Input"),
        &format!("tool {} input", tool.name),
    )?;
    let output = schema::lower_output(
        tool.output_schema.as_ref(),
        &format!("{camel}Output"),
        &format!("tool {} output", tool.name),
    )?;
    Ok(ToolSurface {
        input,
        output,
        fn_name: snake_case(&tool.name),
    })
}

fn sorted_tools(server: &CodeModeServer) -> Vec<&ToolDescriptor> {
    let mut tools: Vec<&ToolDescriptor> = server.tools.iter().collect();
    tools.sort_by_key(|t| upper_camel(&t.name));
    tools
}

struct Features {
    any_tools: bool,
    any_structs: bool,
    any_stdio: bool,
    any_http: bool,
    any_http_headers: bool,
    any_sse: bool,
}

impl Features {
    fn scan(servers: &[&CodeModeServer]) -> Self {
        let mut f = Features {
            any_tools: servers.iter().any(|s| !s.tools.is_empty()),
            any_structs: false,
            any_stdio: false,
            any_http: false,
            any_http_headers: false,
            any_sse: false,
        };
        for server in servers {
            match &server.transport {
                ServerTransport::Stdio { .. } => f.any_stdio = true,
                ServerTransport::Http { headers, .. } => {
                    f.any_http = true;
                    if !headers.is_empty() {
                        f.any_http_headers = true;
                    }
                }
                ServerTransport::Sse { .. } => f.any_sse = true,
                _ => {}
            }
        }
        f
    }
}

/// A Rust string literal for `s` (quotes and escapes included).
fn lit(s: &str) -> String {
    format!("{s:?}")
}

/// snake_case without keyword escaping, for composing longer
/// identifiers like `{server}_service`.
fn ident_base(name: &str) -> String {
    let snake = snake_case(name);
    snake.strip_prefix("r#").map(str::to_string).unwrap_or(snake)
}

fn peer_static_name(server: &CodeModeServer) -> String {
    format!("{}_PEER", ident_base(&server.name).to_uppercase())
}

fn emit_imports(out: &mut String, f: &Features) {
    out.push_str("use std::process::exit;\n");
    if f.any_tools {
        out.push_str("use std::sync::OnceLock;\n");
    }
    out.push('\n');
    out.push_str("use base64::Engine as _;\n");
    out.push_str("use base64::engine::general_purpose::STANDARD as BASE64;\n");
    if f.any_tools {
        out.push_str("use rmcp::ServiceExt;\n");
        out.push_str("use rmcp::model::{CallToolRequestParams, RawContent};\n");
        out.push_str("use rmcp::service::{Peer, RoleClient, RunningService};\n");
    }
    if f.any_stdio {
        out.push_str("use rmcp::transport::child_process::TokioChildProcess;\n");
    }
    if f.any_http {
        out.push_str(
            "use rmcp::transport::streamable_http_client::StreamableHttpClientTransport;\n",
        );
    }
    if f.any_http_headers {
        out.push_str(
            "use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;\n",
        );
        out.push_str("use reqwest::header::{HeaderMap, HeaderName, HeaderValue};\n");
    }
    if f.any_sse {
        out.push_str("use rmcp::transport::sse_client::SseClientTransport;\n");
    }
    if f.any_structs {
        out.push_str("use serde::{Deserialize, Serialize};\n");
        out.push_str("use serde::de::DeserializeOwned;\n");
    } else if f.any_tools {
        out.push_str("use serde::Serialize;\n");
        out.push_str("use serde::de::DeserializeOwned;\n");
    }
    if f.any_stdio {
        out.push_str("use tokio::process::Command;\n");
    }
    // Re-exported so the user module reaches it through `use crate::*;`.
    out.push_str("pub use tokio_util::sync::CancellationToken;\n");
    out.push('\n');
}

fn emit_content_model(out: &mut String, content_path: &str) {
    let _ = write!(
        out,
        r#"/// Content a `run` function can hand back to the caller.
#[derive(Debug, Clone)]
pub enum Content {{
    /// Plain text.
    Text(String),
    /// Image bytes; the driver base64-encodes them on output.
    Image {{ data: Vec<u8>, mime_type: String }},
    /// Audio bytes; the driver base64-encodes them on output.
    Audio {{ data: Vec<u8>, mime_type: String }},
}}

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

const CONTENT_OUTPUT_PATH: &str = {path};

fn write_content(content: &[Content]) -> Result<(), DynError> {{
    let items: Vec<serde_json::Value> = content
        .iter()
        .map(|c| match c {{
            Content::Text(text) => serde_json::json!({{"type": "text", "text": text}}),
            Content::Image {{ data, mime_type }} => serde_json::json!({{
                "type": "image", "data": BASE64.encode(data), "mimeType": mime_type
            }}),
            Content::Audio {{ data, mime_type }} => serde_json::json!({{
                "type": "audio", "data": BASE64.encode(data), "mimeType": mime_type
            }}),
        }})
        .collect();
    std::fs::write(CONTENT_OUTPUT_PATH, serde_json::to_vec(&items)?)?;
    Ok(())
}}

"#,
        path = lit(content_path)
    );
}

fn emit_fatal_exit(out: &mut String) {
    out.push_str(
        r#"/// Print a fatal setup failure and terminate with exit code 3.
fn fatal_exit(msg: &str) -> ! {
    println!("fatal: {msg}");
    exit(3);
}

"#,
    );
}

fn emit_header_map_helper(out: &mut String) {
    out.push_str(
        r#"/// Build a header map that the HTTP client injects on every request.
fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(n) => n,
            Err(e) => fatal_exit(&format!("invalid header name {name:?}: {e}")),
        };
        let value = match HeaderValue::from_str(value) {
            Ok(v) => v,
            Err(e) => fatal_exit(&format!("invalid value for header {name:?}: {e}")),
        };
        map.insert(name, value);
    }
    map
}

"#,
    );
}

fn emit_call_helpers(out: &mut String) {
    out.push_str(
        r#"struct RawToolResult {
    text: String,
    structured: Option<serde_json::Value>,
}

async fn call_mcp_tool_raw(
    ctx: &CancellationToken,
    peer: &Peer<RoleClient>,
    tool_name: &str,
    args: serde_json::Value,
) -> Result<RawToolResult, DynError> {
    if ctx.is_cancelled() {
        return Err(format!("calling {tool_name}: context canceled").into());
    }
    let arguments = match args {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Null => None,
        other => return Err(format!("tool {tool_name}: input must be an object, got {other}").into()),
    };
    let params = CallToolRequestParams {
        meta: None,
        name: tool_name.to_string().into(),
        arguments,
        task: None,
    };
    let result = tokio::select! {
        _ = ctx.cancelled() => return Err(format!("calling {tool_name}: context canceled").into()),
        res = peer.call_tool(params) => match res {
            Ok(result) => result,
            Err(e) => fatal_exit(&format!("calling tool {tool_name}: {e}")),
        },
    };
    if result.content.len() != 1 {
        fatal_exit(&format!(
            "tool {tool_name}: expected exactly one content block, got {}",
            result.content.len()
        ));
    }
    let text = match &result.content[0].raw {
        RawContent::Text(t) => t.text.clone(),
        _ => fatal_exit(&format!("tool {tool_name}: unexpected non-text content")),
    };
    if result.is_error == Some(true) {
        return Err(text.into());
    }
    Ok(RawToolResult {
        text,
        structured: result.structured_content,
    })
}

/// Call one MCP tool and decode its structured result.
async fn call_mcp_tool<I, O>(
    ctx: &CancellationToken,
    peer: &Peer<RoleClient>,
    tool_name: &str,
    input: I,
) -> Result<O, DynError>
where
    I: Serialize,
    O: DeserializeOwned,
{
    let raw = call_mcp_tool_raw(ctx, peer, tool_name, serde_json::to_value(input)?).await?;
    match raw.structured {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(serde_json::from_str(&raw.text)?),
    }
}

/// Call one MCP tool and return its text result unchanged.
async fn call_mcp_tool_text<I>(
    ctx: &CancellationToken,
    peer: &Peer<RoleClient>,
    tool_name: &str,
    input: I,
) -> Result<String, DynError>
where
    I: Serialize,
{
    let raw = call_mcp_tool_raw(ctx, peer, tool_name, serde_json::to_value(input)?).await?;
    Ok(raw.text)
}

"#,
    );
}

fn emit_peer_static(out: &mut String, server: &CodeModeServer) {
    let _ = writeln!(
        out,
        "static {}: OnceLock<Peer<RoleClient>> = OnceLock::new();\n",
        peer_static_name(server)
    );
}

fn emit_wrapper(out: &mut String, server: &CodeModeServer, tool: &ToolDescriptor, surface: &ToolSurface) {
    for line in tool.description.lines() {
        if line.is_empty() {
            out.push_str("///\n");
        } else {
            let _ = writeln!(out, "/// {line}");
        }
    }
    let _ = writeln!(out, "{} {{", surface.signature());
    let _ = writeln!(
        out,
        "    let peer = {}.get().ok_or({})?;",
        peer_static_name(server),
        lit(&format!(
            "tool {} called before connection setup",
            tool.name
        ))
    );
    let helper = match surface.output.kind {
        RootKind::StringAlias => "call_mcp_tool_text",
        _ => "call_mcp_tool",
    };
    let input_expr = if surface.input.is_some() {
        "input".to_string()
    } else {
        "serde_json::Value::Null".to_string()
    };
    let _ = writeln!(
        out,
        "    {helper}(ctx, peer, {}, {input_expr}).await",
        lit(&tool.name)
    );
    out.push_str("}\n\n");
}

fn emit_main(out: &mut String, servers: &[&CodeModeServer]) {
    out.push_str(
        r#"#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|info| {
        println!("panic: {info}");
        exit(2);
    }));

    let ctx = CancellationToken::new();
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let mut term = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(sig) => sig,
                Err(e) => fatal_exit(&format!("installing SIGTERM handler: {e}")),
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
            ctx.cancel();
        });
    }
"#,
    );

    for server in servers {
        emit_connect(out, server);
    }

    if !servers.is_empty() {
        out.push('\n');
        for server in servers {
            let base = ident_base(&server.name);
            let _ = writeln!(
                out,
                "    let _ = {}.set({base}_service.peer().clone());",
                peer_static_name(server)
            );
        }
    }

    out.push_str(
        r#"
    let content = match run::run(&ctx).await {
        Ok(content) => content,
        Err(e) => {
            println!("\nexecution error: {e}");
            exit(1);
        }
    };
    if !content.is_empty() {
        if let Err(e) = write_content(&content) {
            println!("\nexecution error: writing content output: {e}");
            exit(1);
        }
    }
"#,
    );

    for server in servers {
        let base = ident_base(&server.name);
        let _ = writeln!(out, "    let _ = {base}_service.cancel().await;");
    }
    out.push_str("}\n");
}

fn emit_connect(out: &mut String, server: &CodeModeServer) {
    let base = ident_base(&server.name);
    let name_lit = lit(&server.name);
    let _ = writeln!(out, "\n    // server: {}", server.name);
    match &server.transport {
        ServerTransport::Stdio { command, args, env } => {
            let _ = writeln!(out, "    let mut {base}_cmd = Command::new({});", lit(command));
            if !args.is_empty() {
                let rendered: Vec<String> = args.iter().map(|a| lit(a)).collect();
                let _ = writeln!(out, "    {base}_cmd.args([{}]);", rendered.join(", "));
            }
            for (key, value) in env {
                let _ = writeln!(out, "    {base}_cmd.env({}, {});", lit(key), lit(value));
            }
            let _ = write!(
                out,
                r#"    let {base}_transport = match TokioChildProcess::new({base}_cmd) {{
        Ok(t) => t,
        Err(e) => fatal_exit(&format!("spawning server {{:?}}: {{e}}", {name_lit})),
    }};
"#,
            );
        }
        ServerTransport::Http { url, headers } => {
            if headers.is_empty() {
                let _ = writeln!(
                    out,
                    "    let {base}_transport = StreamableHttpClientTransport::from_uri({});",
                    lit(url)
                );
            } else {
                let pairs: Vec<String> = headers
                    .iter()
                    .map(|(k, v)| format!("({}, {})", lit(k), lit(v)))
                    .collect();
                let _ = write!(
                    out,
                    r#"    let {base}_client = match reqwest::Client::builder()
        .default_headers(header_map(&[{pairs}]))
        .build()
    {{
        Ok(c) => c,
        Err(e) => fatal_exit(&format!("building http client for server {{:?}}: {{e}}", {name_lit})),
    }};
    let {base}_transport = StreamableHttpClientTransport::with_client(
        {base}_client,
        StreamableHttpClientTransportConfig::with_uri({url}),
    );
"#,
                    pairs = pairs.join(", "),
                    url = lit(url),
                );
            }
        }
        ServerTransport::Sse { url, .. } => {
            // TODO: headers configured for SSE servers are not installed on
            // the SSE transport; the client library has no header surface yet.
            let _ = write!(
                out,
                r#"    let {base}_transport = match SseClientTransport::start({}).await {{
        Ok(t) => t,
        Err(e) => fatal_exit(&format!("connecting to server {{:?}}: {{e}}", {name_lit})),
    }};
"#,
                lit(url),
            );
        }
        _ => {}
    }
    let _ = write!(
        out,
        r#"    let {base}_service: RunningService<RoleClient, ()> = match ().serve({base}_transport).await {{
        Ok(s) => s,
        Err(e) => fatal_exit(&format!("connecting to server {{:?}}: {{e}}", {name_lit})),
    }};
"#,
    );
}
