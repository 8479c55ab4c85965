//! Parser for `mcpServers`-style server files (JSON or TOML).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{ServerConfig, ToolPolicy};
use crate::error::{BridgeError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServersFile {
    #[serde(default)]
    mcp_servers: BTreeMap<String, Value>,
    #[serde(default)]
    disabled_internal_tools: Vec<String>,
}

/// Server definitions and disable policy read from one file.
///
/// Each entry key becomes the server `name`. Entries without a `type` are
/// inferred: a `url` means a stream server, anything else is stdio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServersFile {
    pub servers: Vec<ServerConfig>,
    pub policy: ToolPolicy,
}

impl ServersFile {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawServersFile = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawServersFile = toml::from_str(text)
            .map_err(|e| BridgeError::Configuration(format!("Invalid TOML servers file: {e}")))?;
        Self::from_raw(raw)
    }

    /// Read a servers file, choosing the format from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    fn from_raw(raw: RawServersFile) -> Result<Self> {
        let mut servers = Vec::with_capacity(raw.mcp_servers.len());
        for (name, entry) in raw.mcp_servers {
            let Value::Object(mut entry) = entry else {
                return Err(BridgeError::Configuration(format!(
                    "MCP server '{name}' must be a table/object"
                )));
            };
            entry.insert("name".into(), Value::String(name.clone()));
            if !entry.contains_key("type") {
                let inferred = if entry.contains_key("url") { "stream" } else { "stdio" };
                entry.insert("type".into(), Value::String(inferred.into()));
            }

            let config: ServerConfig = serde_json::from_value(Value::Object(entry))
                .map_err(|e| BridgeError::Configuration(format!("MCP server '{name}': {e}")))?;
            config.validate()?;
            servers.push(config);
        }

        Ok(Self {
            servers,
            policy: ToolPolicy {
                disabled_internal_tools: raw.disabled_internal_tools,
            },
        })
    }
}
