//! Configuration: server definitions, tool disable policy, bridge settings.
//!
//! Loading and merging configuration files is the caller's job; this module
//! only defines the shapes the bridge consumes, plus a parser for the common
//! `mcpServers` file layout (see [`ServersFile`]).

mod file;

pub use file::ServersFile;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{BridgeError, Result};

/// Default bound on a single tool execution.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Client name announced during the handshake.
pub const DEFAULT_CLIENT_NAME: &str = "toolbridge";

const DEFAULT_SHELL: &str = "/bin/sh";

/// `$SHELL` when set and non-empty, otherwise `/bin/sh`.
pub fn default_shell() -> String {
    shell_from(|key| std::env::var(key).ok())
}

fn shell_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("SHELL")
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

/// Transport family of a configured server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    Stream,
}

/// A tool server definition, identified by its unique `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerConfig {
    /// Local server spawned as a subprocess speaking over stdio.
    Stdio(StdioServerConfig),
    /// Remote server reached over a streamable HTTP channel.
    #[serde(alias = "sse", alias = "http", alias = "streamable-http")]
    Stream(StreamServerConfig),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdioServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Overrides layered on top of the inherited process environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Tool execution timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Handshake timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_approve: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Tool execution timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_approve: Vec<String>,
}

impl ServerConfig {
    /// Minimal stdio server definition.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::Stdio(StdioServerConfig {
            name: name.into(),
            command: command.into(),
            ..Default::default()
        })
    }

    /// Minimal stream server definition.
    pub fn stream(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Stream(StreamServerConfig {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Stdio(config) => &config.name,
            Self::Stream(config) => &config.name,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::Stdio,
            Self::Stream(_) => TransportKind::Stream,
        }
    }

    /// Bare tool names this server must never expose.
    pub fn disabled_tools(&self) -> &[String] {
        match self {
            Self::Stdio(config) => &config.disabled_tools,
            Self::Stream(config) => &config.disabled_tools,
        }
    }

    /// Bare tool names the agent may run without asking.
    pub fn auto_approve(&self) -> &[String] {
        match self {
            Self::Stdio(config) => &config.auto_approve,
            Self::Stream(config) => &config.auto_approve,
        }
    }

    /// Per-server override of the global tool execution timeout.
    pub fn tool_timeout(&self) -> Option<Duration> {
        let millis = match self {
            Self::Stdio(config) => config.timeout,
            Self::Stream(config) => config.timeout,
        };
        millis.map(Duration::from_millis)
    }

    /// Bound on the handshake, when configured.
    pub fn init_timeout(&self) -> Option<Duration> {
        match self {
            Self::Stdio(config) => config.init_timeout.map(Duration::from_millis),
            Self::Stream(_) => None,
        }
    }

    /// Check the fields a transport needs before anything is spawned or dialed.
    pub fn validate(&self) -> Result<()> {
        if self.name().trim().is_empty() {
            return Err(BridgeError::Configuration(
                "MCP server name must not be empty".into(),
            ));
        }

        match self {
            Self::Stdio(config) => {
                if config.command.trim().is_empty() {
                    return Err(BridgeError::Configuration(format!(
                        "MCP server '{}' has an empty command",
                        config.name
                    )));
                }
            }
            Self::Stream(config) => {
                let url = reqwest::Url::parse(&config.url).map_err(|e| {
                    BridgeError::Configuration(format!(
                        "MCP server '{}' has an invalid url '{}': {e}",
                        config.name, config.url
                    ))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(BridgeError::Configuration(format!(
                        "MCP server '{}' url must use http or https, got '{}'",
                        config.name,
                        url.scheme()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Global tool disable policy supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPolicy {
    /// Namespaced keys, bare tool names, or key suffixes to hide.
    #[serde(default)]
    pub disabled_internal_tools: Vec<String>,
}

impl ToolPolicy {
    pub fn disabling<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disabled_internal_tools: entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// Process-wide bridge settings.
///
/// Resolution order: explicit builder values, then environment variables
/// (see [`BridgeSettings::from_env`]), then defaults.
#[derive(Debug, Clone, Builder)]
pub struct BridgeSettings {
    /// Bound on every tool execution unless a server overrides it.
    #[builder(default = DEFAULT_TOOL_TIMEOUT)]
    pub tool_timeout: Duration,
    #[builder(into, default = DEFAULT_CLIENT_NAME.to_string())]
    pub client_name: String,
    #[builder(into, default = env!("CARGO_PKG_VERSION").to_string())]
    pub client_version: String,
    /// Shell used to resolve bare command names.
    #[builder(into, default = default_shell())]
    pub shell: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BridgeSettings {
    /// Load from environment variables (`TOOLBRIDGE_TOOL_TIMEOUT_MS`,
    /// `TOOLBRIDGE_CLIENT_NAME`, `SHELL`), reading `.env` when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup("TOOLBRIDGE_TOOL_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => settings.tool_timeout = Duration::from_millis(millis),
                _ => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid TOOLBRIDGE_TOOL_TIMEOUT_MS"
                ),
            }
        }

        if let Some(name) = lookup("TOOLBRIDGE_CLIENT_NAME").filter(|v| !v.trim().is_empty()) {
            settings.client_name = name;
        }

        settings.shell = shell_from(&lookup);

        settings
    }

    /// Effective tool timeout for a server.
    pub fn tool_timeout_for(&self, config: &ServerConfig) -> Duration {
        config.tool_timeout().unwrap_or(self.tool_timeout)
    }
}
