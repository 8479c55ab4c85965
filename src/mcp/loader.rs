//! Parallel bring-up of every configured server.

use std::sync::Arc;

use futures::future::join_all;

use super::bridge::wrap_tool;
use super::catalog::bridge_tools;
use super::client::{Connector, RmcpConnector, ServerConnection};
use super::filter::is_disabled;
use super::initializer::{InitializedServer, ServerInitializer};
use super::schema::{PromptDeclaration, ResourceDeclaration, ToolDeclaration};
use super::transport::OwnedProcess;
use super::wrapper::ClientWrapper;
use crate::config::{BridgeSettings, ServerConfig, ToolPolicy};
use crate::error::{BridgeError, Result};
use crate::tools::ToolMap;

/// A server that could not be connected.
#[derive(Debug)]
pub struct LoadError {
    pub server_name: String,
    pub error: BridgeError,
}

/// Merged tools plus the servers that failed.
#[derive(Debug, Default)]
pub struct LoadResult {
    pub tools: ToolMap,
    pub errors: Vec<LoadError>,
}

/// Everything handed to the agent session.
#[derive(Debug, Default)]
pub struct McpLoadResult {
    pub tools: ToolMap,
    pub clients: Vec<ClientWrapper>,
    pub errors: Vec<LoadError>,
}

impl McpLoadResult {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn client(&self, server_name: &str) -> Option<&ClientWrapper> {
        self.clients
            .iter()
            .find(|client| client.server_name() == server_name)
    }

    /// Subprocesses owned by connected servers.
    pub fn processes(&self) -> Vec<&OwnedProcess> {
        self.clients
            .iter()
            .filter_map(ClientWrapper::process)
            .collect()
    }

    /// `(server, instructions)` for every server that sent some, sorted by
    /// server name.
    pub fn instructions(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<_> = self
            .clients
            .iter()
            .filter_map(|client| Some((client.server_name(), client.instructions()?)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Close every connection concurrently.
    ///
    /// Meant for the session owner at teardown; loading never calls it.
    /// Returns the servers whose close failed.
    pub async fn shutdown(&self) -> Vec<LoadError> {
        let results = join_all(self.clients.iter().map(|client| async move {
            (client.server_name().to_string(), client.close().await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(server_name, result)| {
                result.err().map(|error| {
                    tracing::warn!(server = %server_name, error = %error, "Failed to close MCP server");
                    LoadError { server_name, error }
                })
            })
            .collect()
    }
}

/// Catalogs fetched from one connected server.
#[derive(Debug, Default)]
struct Catalogs {
    tools: Vec<ToolDeclaration>,
    prompts: Vec<PromptDeclaration>,
    resources: Vec<ResourceDeclaration>,
}

enum ServerLoad {
    Ready(ClientWrapper),
    Failed(ClientWrapper, BridgeError),
}

/// Connects to every configured server in parallel and publishes their tools.
pub struct McpLoader {
    initializer: ServerInitializer,
    settings: BridgeSettings,
    policy: ToolPolicy,
}

impl McpLoader {
    /// Loader using rmcp transports and shell command resolution.
    pub fn new(settings: BridgeSettings, policy: ToolPolicy) -> Self {
        let connector = Arc::new(RmcpConnector::new(settings.clone()));
        Self::with_connector(connector, settings, policy)
    }

    pub fn with_connector(
        connector: Arc<dyn Connector>,
        settings: BridgeSettings,
        policy: ToolPolicy,
    ) -> Self {
        Self {
            initializer: ServerInitializer::new(connector),
            settings,
            policy,
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Initialize all servers concurrently and merge the results in
    /// configuration order.
    ///
    /// A server that fails to connect yields one [`LoadError`] and a
    /// disconnected wrapper; it never stops the others. When two configs share
    /// a name the later one wins.
    pub async fn load(&self, configs: &[ServerConfig]) -> McpLoadResult {
        let loads = join_all(configs.iter().map(|config| self.load_server(config))).await;

        let mut result = McpLoadResult::default();
        for load in loads {
            match load {
                ServerLoad::Ready(wrapper) => merge(&mut result, wrapper),
                ServerLoad::Failed(wrapper, error) => {
                    let server_name = wrapper.server_name().to_string();
                    merge(&mut result, wrapper);
                    result.errors.push(LoadError { server_name, error });
                }
            }
        }

        tracing::info!(
            servers = configs.len(),
            connected = result.clients.iter().filter(|c| c.is_connected()).count(),
            failed = result.errors.len(),
            tools = result.tools.len(),
            "Loaded MCP servers"
        );
        result
    }

    /// Same pipeline as [`McpLoader::load`], keeping only tools and errors.
    pub async fn load_tools(&self, configs: &[ServerConfig]) -> LoadResult {
        let McpLoadResult { tools, errors, .. } = self.load(configs).await;
        LoadResult { tools, errors }
    }

    async fn load_server(&self, config: &ServerConfig) -> ServerLoad {
        let server = match self.initializer.initialize(config).await {
            Ok(server) => server,
            Err(error) => return ServerLoad::Failed(ClientWrapper::disconnected(config.name()), error),
        };

        let catalogs = fetch_catalogs(config.name(), &server).await;
        let tools = self.build_tools(config, &server, &catalogs.tools);

        ServerLoad::Ready(ClientWrapper::connected(
            config.name(),
            server,
            tools,
            catalogs.prompts,
            catalogs.resources,
            config.auto_approve().to_vec(),
        ))
    }

    fn build_tools(
        &self,
        config: &ServerConfig,
        server: &InitializedServer,
        declarations: &[ToolDeclaration],
    ) -> ToolMap {
        let server_name = config.name();
        let timeout = self.settings.tool_timeout_for(config);
        let mut tools = ToolMap::new();

        let wrapped = declarations
            .iter()
            .map(|declaration| wrap_tool(server_name, declaration, Arc::clone(&server.connection), timeout))
            .chain(bridge_tools(server_name, server.capabilities, &server.connection, timeout));

        for tool in wrapped {
            let key = tool.name().to_string();
            if tools.insert(key.clone(), Arc::new(tool)).is_some() {
                tracing::warn!(server = %server_name, tool = %key, "Duplicate tool name; keeping the last declaration");
            }
        }

        tools.retain(|key, tool| !is_disabled(key, tool, Some(config), &self.policy));
        tools
    }
}

/// Fetch the tool catalog, plus prompts and resources when advertised. Each
/// fetch is independent; a failure is logged and leaves that catalog empty.
async fn fetch_catalogs(server_name: &str, server: &InitializedServer) -> Catalogs {
    let connection = &server.connection;
    let capabilities = server.capabilities;

    let (tools, prompts, resources) = tokio::join!(
        fetch(server_name, "tools", true, connection.list_tools()),
        fetch(server_name, "prompts", capabilities.prompts, connection.list_prompts()),
        fetch(server_name, "resources", capabilities.resources, connection.list_resources()),
    );

    Catalogs {
        tools,
        prompts,
        resources,
    }
}

async fn fetch<T>(
    server_name: &str,
    catalog: &str,
    advertised: bool,
    request: impl std::future::Future<Output = Result<Vec<T>>>,
) -> Vec<T> {
    if !advertised {
        return Vec::new();
    }
    match request.await {
        Ok(items) => {
            tracing::debug!(server = %server_name, catalog, count = items.len(), "Fetched MCP catalog");
            items
        }
        Err(e) => {
            tracing::warn!(server = %server_name, catalog, error = %e, "Failed to fetch MCP catalog; treating as empty");
            Vec::new()
        }
    }
}

fn merge(result: &mut McpLoadResult, wrapper: ClientWrapper) {
    let server_name = wrapper.server_name().to_string();

    if let Some(index) = result
        .clients
        .iter()
        .position(|client| client.server_name() == server_name)
    {
        tracing::warn!(server = %server_name, "Duplicate MCP server name; the later config replaces the earlier one");
        result.tools.retain(|_, tool| tool.server_name() != server_name);
        result.errors.retain(|error| error.server_name != server_name);
        result.clients.remove(index);
    }

    for (key, tool) in wrapper.tools() {
        if let Some(previous) = result.tools.insert(key.clone(), Arc::clone(tool)) {
            tracing::warn!(
                tool = %key,
                previous_server = %previous.server_name(),
                server = %server_name,
                "Tool key collision across servers; keeping the later one"
            );
        }
    }
    result.clients.push(wrapper);
}
