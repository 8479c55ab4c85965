//! Transport construction for stdio and streamable-HTTP servers.

use std::process::Stdio;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{ClientCapabilities, ClientInfo, Implementation};
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceExt};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::config::{BridgeSettings, ServerConfig, StdioServerConfig, StreamServerConfig};
use crate::error::{BridgeError, Result};
use crate::resolver::CommandResolver;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Capabilities requested from every server, whatever it ends up supporting.
pub const REQUESTED_CAPABILITIES: [&str; 3] = ["tools", "prompts", "resources"];

const SERVER_STDERR_TARGET: &str = "toolbridge::server_stderr";

/// A subprocess spawned for a stdio server.
///
/// The bridge never terminates these itself; the handle is surfaced so an
/// outside lifecycle manager can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedProcess {
    pub server_name: String,
    pub command: String,
    pub pid: Option<u32>,
}

/// A transport ready for the handshake.
pub enum ServerTransport {
    Stdio {
        transport: TokioChildProcess,
        process: OwnedProcess,
    },
    Stream {
        transport: StreamableHttpClientTransport<reqwest::Client>,
    },
}

impl ServerTransport {
    /// Build the transport matching the config variant.
    pub async fn build(config: &ServerConfig, resolver: &dyn CommandResolver) -> Result<Self> {
        match config {
            ServerConfig::Stdio(stdio) => Self::stdio(stdio, resolver).await,
            ServerConfig::Stream(stream) => Self::stream(stream),
        }
    }

    /// Spawn the server subprocess with piped stderr.
    pub async fn stdio(config: &StdioServerConfig, resolver: &dyn CommandResolver) -> Result<Self> {
        let resolved = resolver.resolve(&config.command).await;

        let mut command = Command::new(&resolved);
        command.args(&config.args).envs(&config.env).kill_on_drop(true);
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let (transport, stderr) = TokioChildProcess::builder(command)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BridgeError::Connection {
                server: config.name.clone(),
                message: format!("failed to spawn '{resolved}': {e}"),
            })?;

        let pid = transport.id();
        tracing::debug!(server = %config.name, command = %resolved, pid = ?pid, "Spawned MCP server");

        if let Some(stderr) = stderr {
            let server: Arc<str> = Arc::from(config.name.as_str());
            tokio::spawn(async move {
                let result = drain_lines(stderr, |line| {
                    tracing::info!(target: SERVER_STDERR_TARGET, server = %server, "{line}");
                })
                .await;
                if let Err(e) = result {
                    tracing::debug!(server = %server, error = %e, "Stopped reading server stderr");
                }
            });
        }

        Ok(Self::Stdio {
            transport,
            process: OwnedProcess {
                server_name: config.name.clone(),
                command: resolved,
                pid,
            },
        })
    }

    /// Open a streamable-HTTP channel to the configured URL.
    pub fn stream(config: &StreamServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(header_map(&config.headers)?)
            .build()
            .map_err(|e| BridgeError::Transport(format!("failed to build HTTP client: {e}")))?;

        let transport = StreamableHttpClientTransport::with_client(
            client,
            StreamableHttpClientTransportConfig::with_uri(config.url.clone()),
        );
        Ok(Self::Stream { transport })
    }

    pub fn process(&self) -> Option<&OwnedProcess> {
        match self {
            Self::Stdio { process, .. } => Some(process),
            Self::Stream { .. } => None,
        }
    }

    /// Run the initialize handshake, consuming the transport.
    pub async fn handshake(
        self,
        client_info: ClientInfo,
    ) -> std::result::Result<(MCPRunningService, Option<OwnedProcess>), ClientInitializeError> {
        match self {
            Self::Stdio { transport, process } => {
                let service = client_info.into_dyn().serve(transport).await?;
                Ok((service, Some(process)))
            }
            Self::Stream { transport } => {
                let service = client_info.into_dyn().serve(transport).await?;
                Ok((service, None))
            }
        }
    }
}

fn header_map(headers: &std::collections::BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| BridgeError::Configuration(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            BridgeError::Configuration(format!("invalid value for header '{name}': {e}"))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Client capabilities announced in the handshake.
pub fn requested_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        experimental: Some(
            REQUESTED_CAPABILITIES
                .iter()
                .map(|name| (name.to_string(), serde_json::Map::new()))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Handshake payload identifying this client.
pub fn client_info(settings: &BridgeSettings) -> ClientInfo {
    let mut implementation = Implementation::from_build_env();
    implementation.name = settings.client_name.clone();
    implementation.version = settings.client_version.clone();

    ClientInfo {
        capabilities: requested_capabilities(),
        client_info: implementation,
        ..Default::default()
    }
}

/// Split a byte stream into lines and hand each one to `on_line`.
///
/// A trailing line without a newline is still delivered at EOF. Invalid
/// UTF-8 is replaced rather than treated as an error.
pub async fn drain_lines<R, F>(reader: R, mut on_line: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\n', '\r']));
    }
}
