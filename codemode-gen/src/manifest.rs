//! Sandbox package manifest synthesis.
//!
//! The generated `Cargo.toml` pins the MCP client library and enables
//! only the transport features the partitioned catalog needs. Local
//! crate dependencies supplied by the operator are appended as path
//! dependencies.

use std::fmt::Write as _;
use std::path::Path;

use codemode_types::{CodeModeServer, ServerTransport};

/// The rmcp version the sandbox package is pinned to. Kept in lockstep
/// with the version this workspace links against.
pub const MCP_CLIENT_VERSION: &str = "0.16";

/// Name of the generated sandbox package (and thus of its binary).
pub const SANDBOX_PACKAGE_NAME: &str = "codemode-sandbox";

/// A validated local crate the sandbox package may depend on.
#[derive(Debug, Clone)]
pub struct LocalDep {
    /// The crate name declared in the local manifest.
    pub name: String,
    /// Absolute path to the crate directory.
    pub path: std::path::PathBuf,
}

/// Render the sandbox `Cargo.toml` for `servers` plus `local_deps`.
pub fn sandbox_manifest(servers: &[CodeModeServer], local_deps: &[LocalDep]) -> String {
    let mut stdio = false;
    let mut http = false;
    let mut http_headers = false;
    let mut sse = false;
    for server in servers {
        match &server.transport {
            ServerTransport::Stdio { .. } => stdio = true,
            ServerTransport::Http { headers, .. } => {
                http = true;
                http_headers |= !headers.is_empty();
            }
            ServerTransport::Sse { .. } => sse = true,
            _ => {}
        }
    }

    let mut rmcp_features = vec!["client"];
    if stdio {
        rmcp_features.push("transport-child-process");
    }
    if http {
        rmcp_features.push("transport-streamable-http-client");
        rmcp_features.push("transport-streamable-http-client-reqwest");
    }
    if sse {
        rmcp_features.push("transport-sse-client");
        rmcp_features.push("transport-sse-client-reqwest");
    }
    let rmcp_features = rmcp_features
        .iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut tokio_features = vec!["macros", "rt-multi-thread", "signal"];
    if stdio {
        tokio_features.push("process");
    }
    let tokio_features = tokio_features
        .iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!(
        r#"[package]
name = "{SANDBOX_PACKAGE_NAME}"
version = "0.0.0"
edition = "2024"
publish = false

[dependencies]
base64 = "0.22"
rmcp = {{ version = "{MCP_CLIENT_VERSION}", features = [{rmcp_features}] }}
serde = {{ version = "1", features = ["derive"] }}
serde_json = "1"
tokio = {{ version = "1", features = [{tokio_features}] }}
tokio-util = "0.7"
"#
    );
    if http_headers {
        out.push_str(
            "reqwest = { version = \"0.12\", default-features = false, features = [\"rustls-tls\"] }\n",
        );
    }
    for dep in local_deps {
        let _ = writeln!(
            out,
            "{} = {{ path = {} }}",
            dep.name,
            toml_str(&dep.path)
        );
    }
    out
}

fn toml_str(path: &Path) -> String {
    format!("{:?}", path.display().to_string())
}
