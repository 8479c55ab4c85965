//! Bridge tools that expose a server's prompt and resource catalogs.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::client::ServerConnection;
use super::schema::ServerCapabilities;
use crate::error::{BridgeError, Result};
use crate::tools::{JsonObject, ToolParameters, WrappedTool};

pub const LIST_PROMPTS: &str = "list_prompts";
pub const GET_PROMPT: &str = "get_prompt";
pub const LIST_RESOURCES: &str = "list_resources";
pub const READ_RESOURCE: &str = "read_resource";

/// Synthesize bridge tools for whatever the server advertised.
///
/// Creation depends on the capability flags only; an empty catalog still
/// gets its tools.
pub fn bridge_tools(
    server_name: &str,
    capabilities: ServerCapabilities,
    connection: &Arc<dyn ServerConnection>,
    timeout: Duration,
) -> Vec<WrappedTool> {
    let mut tools = Vec::new();

    if capabilities.prompts {
        let conn = Arc::clone(connection);
        tools.push(WrappedTool::new(
            server_name,
            LIST_PROMPTS,
            format!("List the prompts available from the {server_name} MCP server."),
            ToolParameters::empty(),
            timeout,
            move |_args: JsonObject| {
                let conn = Arc::clone(&conn);
                async move { to_pretty(&conn.list_prompts().await?) }
            },
        ));

        let conn = Arc::clone(connection);
        tools.push(WrappedTool::new(
            server_name,
            GET_PROMPT,
            format!("Get a prompt from the {server_name} MCP server, filled in with arguments."),
            ToolParameters::object()
                .string("name", "Name of the prompt", true)
                .object("arguments", "Prompt arguments keyed by argument name", false)
                .build(),
            timeout,
            move |args: JsonObject| {
                let conn = Arc::clone(&conn);
                async move {
                    let name = string_arg(&args, "name")?;
                    let arguments = args
                        .get("arguments")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default();
                    to_pretty(&conn.get_prompt(&name, arguments).await?)
                }
            },
        ));
    }

    if capabilities.resources {
        let conn = Arc::clone(connection);
        tools.push(WrappedTool::new(
            server_name,
            LIST_RESOURCES,
            format!("List the resources available from the {server_name} MCP server."),
            ToolParameters::empty(),
            timeout,
            move |_args: JsonObject| {
                let conn = Arc::clone(&conn);
                async move { to_pretty(&conn.list_resources().await?) }
            },
        ));

        let conn = Arc::clone(connection);
        tools.push(WrappedTool::new(
            server_name,
            READ_RESOURCE,
            format!("Read a resource from the {server_name} MCP server by URI."),
            ToolParameters::object()
                .string("uri", "URI of the resource to read", true)
                .build(),
            timeout,
            move |args: JsonObject| {
                let conn = Arc::clone(&conn);
                async move {
                    let uri = string_arg(&args, "uri")?;
                    to_pretty(&conn.read_resource(&uri).await?)
                }
            },
        ));
    }

    tools
}

fn string_arg(args: &JsonObject, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BridgeError::InvalidArgument(format!("'{key}' must be a string")))
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
