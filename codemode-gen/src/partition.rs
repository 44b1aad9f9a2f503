//! Splitting a tool catalog into code-mode servers and excluded tools.
//!
//! A tool is excluded iff its name appears in the exclusion list (exact
//! match); exclusion entries with no matching tool are ignored. Servers
//! whose tool list would be empty after exclusion are dropped from the
//! code-mode side. Name collisions among the remaining code-mode tools
//! are rejected here, before any source is generated.

use std::collections::BTreeMap;

use codemode_types::{CodeModeServer, ServerTransport, ToolCatalog, ToolDescriptor};

use crate::GenError;
use crate::naming::check_collisions;

/// The two halves of a partitioned catalog.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Servers whose tools are exposed through generated code,
    /// ordered by server name.
    pub code_mode_servers: Vec<CodeModeServer>,
    /// Tools surfaced directly to the model, in catalog order.
    pub excluded_tools: Vec<ToolDescriptor>,
}

/// Partition `catalog` by `exclusions`.
///
/// `servers` maps each catalog server name to its transport descriptor.
///
/// # Errors
///
/// [`GenError::MissingServer`] when a catalog server has no descriptor,
/// and any error from [`check_collisions`] over the code-mode tools.
pub fn partition(
    catalog: &ToolCatalog,
    servers: &BTreeMap<String, ServerTransport>,
    exclusions: &[String],
) -> Result<Partition, GenError> {
    let mut result = Partition::default();

    for (server_name, tools) in catalog.iter() {
        let mut kept = Vec::new();
        for tool in tools {
            if exclusions.iter().any(|e| e == &tool.name) {
                result.excluded_tools.push(tool.clone());
            } else {
                kept.push(tool.clone());
            }
        }
        if kept.is_empty() {
            continue;
        }
        let transport = servers
            .get(server_name)
            .ok_or_else(|| GenError::MissingServer(server_name.to_string()))?;
        result.code_mode_servers.push(CodeModeServer {
            name: server_name.to_string(),
            transport: transport.clone(),
            tools: kept,
        });
    }

    check_collisions(
        result
            .code_mode_servers
            .iter()
            .flat_map(|s| s.tools.iter()),
    )?;

    tracing::debug!(
        code_mode_servers = result.code_mode_servers.len(),
        excluded = result.excluded_tools.len(),
        "partitioned tool catalog"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: format!("{name} tool"),
            input_schema: None,
            output_schema: None,
        }
    }

    fn stdio(command: &str) -> ServerTransport {
        ServerTransport::Stdio {
            command: command.into(),
            args: vec![],
            env: BTreeMap::new(),
        }
    }

    #[test]
    fn excludes_by_exact_name() {
        let mut catalog = ToolCatalog::new();
        catalog.insert("editor", vec![tool("read_file"), tool("write_file")]);
        let servers = BTreeMap::from([("editor".to_string(), stdio("editor-mcp"))]);

        let p = partition(&catalog, &servers, &["write_file".to_string()]).unwrap();
        assert_eq!(p.code_mode_servers.len(), 1);
        assert_eq!(p.code_mode_servers[0].tools.len(), 1);
        assert_eq!(p.code_mode_servers[0].tools[0].name, "read_file");
        assert_eq!(p.excluded_tools.len(), 1);
        assert_eq!(p.excluded_tools[0].name, "write_file");
    }

    #[test]
    fn drops_servers_left_empty() {
        let mut catalog = ToolCatalog::new();
        catalog.insert("editor", vec![tool("read_file")]);
        catalog.insert("shell", vec![tool("run_command")]);
        let servers = BTreeMap::from([
            ("editor".to_string(), stdio("editor-mcp")),
            ("shell".to_string(), stdio("shell-mcp")),
        ]);

        let p = partition(&catalog, &servers, &["run_command".to_string()]).unwrap();
        let names: Vec<&str> = p
            .code_mode_servers
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, ["editor"]);
        assert_eq!(p.excluded_tools.len(), 1);
    }

    #[test]
    fn unmatched_exclusions_are_ignored() {
        let mut catalog = ToolCatalog::new();
        catalog.insert("editor", vec![tool("read_file")]);
        let servers = BTreeMap::from([("editor".to_string(), stdio("editor-mcp"))]);

        let p = partition(&catalog, &servers, &["no_such_tool".to_string()]).unwrap();
        assert_eq!(p.code_mode_servers.len(), 1);
        assert!(p.excluded_tools.is_empty());
    }

    #[test]
    fn collisions_rejected_at_partition_time() {
        let mut catalog = ToolCatalog::new();
        catalog.insert("a", vec![tool("read_file")]);
        catalog.insert("b", vec![tool("readFile")]);
        let servers = BTreeMap::from([
            ("a".to_string(), stdio("a-mcp")),
            ("b".to_string(), stdio("b-mcp")),
        ]);

        let err = partition(&catalog, &servers, &[]).unwrap_err();
        assert!(matches!(err, GenError::NameCollision { .. }));
    }

    #[test]
    fn excluding_a_colliding_tool_unblocks_partition() {
        let mut catalog = ToolCatalog::new();
        catalog.insert("a", vec![tool("read_file")]);
        catalog.insert("b", vec![tool("readFile")]);
        let servers = BTreeMap::from([
            ("a".to_string(), stdio("a-mcp")),
            ("b".to_string(), stdio("b-mcp")),
        ]);

        let p = partition(&catalog, &servers, &["readFile".to_string()]).unwrap();
        assert_eq!(p.code_mode_servers.len(), 1);
        assert_eq!(p.excluded_tools.len(), 1);
    }

    #[test]
    fn missing_server_descriptor_is_an_error() {
        let mut catalog = ToolCatalog::new();
        catalog.insert("editor", vec![tool("read_file")]);
        let servers = BTreeMap::new();

        let err = partition(&catalog, &servers, &[]).unwrap_err();
        assert!(matches!(err, GenError::MissingServer(name) if name == "editor"));
    }
}
