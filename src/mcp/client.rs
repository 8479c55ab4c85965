//! Live connections to MCP servers.
//!
//! [`ServerConnection`] is the seam the rest of the bridge talks to; the
//! production implementation proxies to an rmcp peer, tests plug in
//! in-memory doubles.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, ClientInfo, ProtocolVersion};
use rmcp::service::{ClientInitializeError, Peer, RoleClient, ServiceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::schema::{
    PromptDeclaration, PromptResult, ResourceContent, ResourceDeclaration, ServerCapabilities,
    ServerIdentity, ToolCallOutcome, ToolDeclaration,
};
use super::transport::{client_info, MCPRunningService, OwnedProcess, ServerTransport};
use crate::config::{BridgeSettings, ServerConfig};
use crate::error::{BridgeError, Result};
use crate::resolver::{CommandResolver, ShellCommandResolver};
use crate::tools::JsonObject;
use crate::util::timeout::{duration_millis, with_optional_timeout};

/// Operations available on an initialized server.
#[async_trait]
pub trait ServerConnection: Send + Sync {
    fn server_name(&self) -> &str;

    /// Capabilities advertised in the handshake response.
    fn capabilities(&self) -> ServerCapabilities;

    fn server_info(&self) -> ServerIdentity;

    async fn list_tools(&self) -> Result<Vec<ToolDeclaration>>;

    async fn list_prompts(&self) -> Result<Vec<PromptDeclaration>>;

    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<PromptResult>;

    async fn list_resources(&self) -> Result<Vec<ResourceDeclaration>>;

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent>;

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolCallOutcome>;

    /// Shut the session down. Calling it more than once is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Result of a successful connect.
pub struct Connected {
    pub connection: Arc<dyn ServerConnection>,
    pub process: Option<OwnedProcess>,
}

/// Builds a transport and runs the handshake for one server config.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ServerConfig) -> Result<Connected>;
}

/// Production connector backed by rmcp.
pub struct RmcpConnector {
    settings: BridgeSettings,
    resolver: Arc<dyn CommandResolver>,
}

impl RmcpConnector {
    pub fn new(settings: BridgeSettings) -> Self {
        let resolver = Arc::new(ShellCommandResolver::new(settings.shell.clone()));
        Self { settings, resolver }
    }

    pub fn with_resolver(settings: BridgeSettings, resolver: Arc<dyn CommandResolver>) -> Self {
        Self { settings, resolver }
    }
}

impl RmcpConnector {
    /// Handshake with the latest protocol version, retrying once on a fresh
    /// transport with 2024-11-05 when the server rejects the version.
    async fn handshake_with_fallback(
        &self,
        config: &ServerConfig,
        transport: ServerTransport,
    ) -> Result<(MCPRunningService, Option<OwnedProcess>)> {
        let server_name = config.name();
        let info = client_info(&self.settings);

        match transport.handshake(info.clone()).await {
            Ok(session) => return Ok(session),
            Err(error) if should_retry_with_legacy_protocol(&error) => {
                tracing::debug!(
                    server = server_name,
                    "Server rejected protocol version; retrying initialize with 2024-11-05"
                );
            }
            Err(error) => return Err(map_client_initialize_error(server_name, error)),
        }

        let transport = ServerTransport::build(config, self.resolver.as_ref()).await?;
        let legacy = ClientInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            ..info
        };
        transport
            .handshake(legacy)
            .await
            .map_err(|e| map_client_initialize_error(server_name, e))
    }
}

fn should_retry_with_legacy_protocol(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(error) => {
            let message = error.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Connected> {
        let server_name = config.name();
        let transport = ServerTransport::build(config, self.resolver.as_ref()).await?;

        let handshake = self.handshake_with_fallback(config, transport);
        let (service, process) = with_optional_timeout(config.init_timeout(), handshake).await?;

        let connection = RmcpConnection::from_service(server_name, service)?;
        Ok(Connected {
            connection: Arc::new(connection),
            process,
        })
    }
}

/// A server session held open through rmcp.
pub struct RmcpConnection {
    server_name: String,
    capabilities: ServerCapabilities,
    server_info: ServerIdentity,
    peer: Peer<RoleClient>,
    service: Mutex<Option<MCPRunningService>>,
}

impl RmcpConnection {
    /// Wrap a running service, reading capabilities and identity from the
    /// handshake result only.
    pub fn from_service(server_name: &str, service: MCPRunningService) -> Result<Self> {
        let info = service.peer_info().ok_or_else(|| {
            BridgeError::protocol("initialize", format!("'{server_name}' returned no server info"))
        })?;

        let advertised = serde_json::to_value(&info.capabilities)?;
        let capabilities = ServerCapabilities::from_advertised(&advertised);
        let server_info = ServerIdentity {
            name: info.server_info.name.clone(),
            version: info.server_info.version.clone(),
            instructions: info.instructions.clone(),
        };
        let peer = service.peer().clone();

        Ok(Self {
            server_name: server_name.to_string(),
            capabilities,
            server_info,
            peer,
            service: Mutex::new(Some(service)),
        })
    }
}

#[async_trait]
impl ServerConnection for RmcpConnection {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }

    fn server_info(&self) -> ServerIdentity {
        self.server_info.clone()
    }

    async fn list_tools(&self) -> Result<Vec<ToolDeclaration>> {
        let tools = match self.peer.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                self.peer
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("tools/list", e))?
                    .tools
            }
            Err(e) => return Err(map_service_error("tools/list", e)),
        };
        convert("tools/list", &tools)
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDeclaration>> {
        let prompts = self
            .peer
            .list_all_prompts()
            .await
            .map_err(|e| map_service_error("prompts/list", e))?;
        convert("prompts/list", &prompts)
    }

    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<PromptResult> {
        let params = serde_json::from_value(json!({ "name": name, "arguments": arguments }))?;
        let result = self
            .peer
            .get_prompt(params)
            .await
            .map_err(|e| map_service_error("prompts/get", e))?;
        convert("prompts/get", &result)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDeclaration>> {
        let resources = self
            .peer
            .list_all_resources()
            .await
            .map_err(|e| map_service_error("resources/list", e))?;
        convert("resources/list", &resources)
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        let params = serde_json::from_value(json!({ "uri": uri }))?;
        let result = self
            .peer
            .read_resource(params)
            .await
            .map_err(|e| map_service_error("resources/read", e))?;
        convert("resources/read", &result)
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolCallOutcome> {
        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| map_service_error("tools/call", e))?;
        convert("tools/call", &result)
    }

    async fn close(&self) -> Result<()> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        service
            .cancel()
            .await
            .map_err(|e| BridgeError::Transport(format!("failed to close '{}': {e}", self.server_name)))?;
        tracing::debug!(server = %self.server_name, "Closed MCP session");
        Ok(())
    }
}

/// Re-shape an rmcp payload into the crate's own type.
fn convert<T: Serialize, U: DeserializeOwned>(context: &str, value: &T) -> Result<U> {
    let raw = serde_json::to_value(value)?;
    serde_json::from_value(raw).map_err(|e| BridgeError::protocol(context, e.to_string()))
}

pub(crate) fn map_client_initialize_error(server: &str, error: ClientInitializeError) -> BridgeError {
    let message = match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("connection closed during initialize: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("transport error during initialize ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => {
            return BridgeError::protocol(
                "initialize",
                format!("'{server}' JSON-RPC error {}: {}", error.code.0, error.message),
            );
        }
        ClientInitializeError::Cancelled => "initialize cancelled".to_string(),
        other => format!("initialize failed: {other}"),
    };
    BridgeError::Connection {
        server: server.to_string(),
        message,
    }
}

pub(crate) fn map_service_error(context: &str, error: ServiceError) -> BridgeError {
    match error {
        ServiceError::McpError(error) => BridgeError::protocol(
            context,
            format!("MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::TransportSend(error) => {
            BridgeError::Transport(format!("{context}: send failed: {error}"))
        }
        ServiceError::TransportClosed => BridgeError::Transport(format!("{context}: transport closed")),
        ServiceError::UnexpectedResponse => BridgeError::protocol(context, "unexpected response"),
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            BridgeError::Transport(format!("{context}: request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => BridgeError::Timeout(duration_millis(timeout)),
        other => BridgeError::protocol(context, other.to_string()),
    }
}
