//! Per-server handle exposed to the agent.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::client::ServerConnection;
use super::initializer::InitializedServer;
use super::schema::{
    PromptDeclaration, PromptResult, ResourceContent, ResourceDeclaration, ServerCapabilities,
    ServerIdentity,
};
use super::transport::OwnedProcess;
use crate::error::{BridgeError, Result};
use crate::tools::{JsonObject, ToolMap};

/// One configured server: its connection, published tools, and catalogs.
///
/// The catalog accessors (`list_prompts`, `read_resource`, ...) always ask
/// the live connection; the cached `prompts()`/`resources()` maps reflect
/// what was seen at load time. A disconnected wrapper has no tools and its
/// accessors fail with [`BridgeError::NotConnected`].
pub struct ClientWrapper {
    server_name: String,
    connection: Option<Arc<dyn ServerConnection>>,
    capabilities: ServerCapabilities,
    server_info: Option<ServerIdentity>,
    process: Option<OwnedProcess>,
    tools: ToolMap,
    prompts: BTreeMap<String, PromptDeclaration>,
    resources: BTreeMap<String, ResourceDeclaration>,
    auto_approve: Vec<String>,
}

impl ClientWrapper {
    pub(crate) fn connected(
        server_name: impl Into<String>,
        server: InitializedServer,
        tools: ToolMap,
        prompts: Vec<PromptDeclaration>,
        resources: Vec<ResourceDeclaration>,
        auto_approve: Vec<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            connection: Some(server.connection),
            capabilities: server.capabilities,
            server_info: Some(server.server_info),
            process: server.process,
            tools,
            prompts: prompts
                .into_iter()
                .map(|prompt| (prompt.name.clone(), prompt))
                .collect(),
            resources: resources
                .into_iter()
                .map(|resource| (resource.uri.clone(), resource))
                .collect(),
            auto_approve,
        }
    }

    /// Wrapper for a server that failed to connect.
    pub fn disconnected(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            connection: None,
            capabilities: ServerCapabilities::default(),
            server_info: None,
            process: None,
            tools: ToolMap::new(),
            prompts: BTreeMap::new(),
            resources: BTreeMap::new(),
            auto_approve: Vec::new(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn tools(&self) -> &ToolMap {
        &self.tools
    }

    pub fn prompts(&self) -> &BTreeMap<String, PromptDeclaration> {
        &self.prompts
    }

    /// Resources seen at load time, keyed by URI.
    pub fn resources(&self) -> &BTreeMap<String, ResourceDeclaration> {
        &self.resources
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }

    pub fn server_info(&self) -> Option<&ServerIdentity> {
        self.server_info.as_ref()
    }

    /// Usage instructions the server sent during the handshake.
    pub fn instructions(&self) -> Option<&str> {
        self.server_info
            .as_ref()
            .and_then(|info| info.instructions.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    pub fn process(&self) -> Option<&OwnedProcess> {
        self.process.as_ref()
    }

    /// Tools the user pre-approved for this server (bare names).
    pub fn auto_approve(&self) -> &[String] {
        &self.auto_approve
    }

    pub fn is_auto_approved(&self, tool_name: &str) -> bool {
        self.auto_approve.iter().any(|name| name == tool_name)
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDeclaration>> {
        self.connection()?.list_prompts().await
    }

    pub async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<PromptResult> {
        self.connection()?.get_prompt(name, arguments).await
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDeclaration>> {
        self.connection()?.list_resources().await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        self.connection()?.read_resource(uri).await
    }

    /// Close the underlying session. No-op when disconnected.
    pub async fn close(&self) -> Result<()> {
        match &self.connection {
            Some(connection) => connection.close().await,
            None => Ok(()),
        }
    }

    fn connection(&self) -> Result<&Arc<dyn ServerConnection>> {
        self.connection
            .as_ref()
            .ok_or_else(|| BridgeError::NotConnected(self.server_name.clone()))
    }
}

impl std::fmt::Debug for ClientWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientWrapper")
            .field("server_name", &self.server_name)
            .field("connected", &self.is_connected())
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("prompts", &self.prompts.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}
