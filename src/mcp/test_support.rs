use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::client::{Connected, Connector, ServerConnection};
use super::schema::{
    PromptDeclaration, PromptMessage, PromptResult, ResourceContent, ResourceContentItem,
    ResourceDeclaration, ServerCapabilities, ServerIdentity, ToolCallOutcome, ToolDeclaration,
};
use super::transport::OwnedProcess;
use crate::config::ServerConfig;
use crate::error::{BridgeError, Result};
use crate::tools::JsonObject;

/// Scriptable in-memory server.
#[derive(Default)]
pub(crate) struct FakeServer {
    name: String,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    tools: Vec<ToolDeclaration>,
    prompts: Mutex<Vec<PromptDeclaration>>,
    resources: Vec<ResourceDeclaration>,
    failing: HashSet<&'static str>,
    responses: HashMap<String, ToolCallOutcome>,
    hanging: HashSet<String>,
    calls: Mutex<Vec<(String, JsonObject)>>,
    closes: AtomicUsize,
}

impl FakeServer {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: ServerCapabilities {
                tools: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.push(tool);
        self
    }

    pub(crate) fn with_prompts(mut self, prompts: Vec<PromptDeclaration>) -> Self {
        self.capabilities.prompts = true;
        self.prompts = Mutex::new(prompts);
        self
    }

    pub(crate) fn with_resources(mut self, resources: Vec<ResourceDeclaration>) -> Self {
        self.capabilities.resources = true;
        self.resources = resources;
        self
    }

    pub(crate) fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    /// Make a catalog method (`"tools"`, `"prompts"`, `"resources"`) fail.
    pub(crate) fn failing(mut self, catalog: &'static str) -> Self {
        self.failing.insert(catalog);
        self
    }

    pub(crate) fn responding(mut self, tool: &str, outcome: ToolCallOutcome) -> Self {
        self.responses.insert(tool.to_string(), outcome);
        self
    }

    pub(crate) fn hanging(mut self, tool: &str) -> Self {
        self.hanging.insert(tool.to_string());
        self
    }

    pub(crate) fn add_prompt(&self, prompt: PromptDeclaration) {
        self.prompts.lock().unwrap().push(prompt);
    }

    pub(crate) fn calls(&self) -> Vec<(String, JsonObject)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn check(&self, catalog: &'static str) -> Result<()> {
        if self.failing.contains(catalog) {
            return Err(BridgeError::protocol(
                format!("{catalog}/list"),
                "MCP error -32601: Method not found",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ServerConnection for FakeServer {
    fn server_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }

    fn server_info(&self) -> ServerIdentity {
        ServerIdentity {
            name: format!("{}-server", self.name),
            version: "1.0.0".into(),
            instructions: self.instructions.clone(),
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolDeclaration>> {
        self.check("tools")?;
        Ok(self.tools.clone())
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDeclaration>> {
        self.check("prompts")?;
        Ok(self.prompts.lock().unwrap().clone())
    }

    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<PromptResult> {
        let prompts = self.prompts.lock().unwrap().clone();
        let prompt = prompts
            .iter()
            .find(|prompt| prompt.name == name)
            .ok_or_else(|| BridgeError::protocol("prompts/get", format!("unknown prompt '{name}'")))?;
        Ok(PromptResult {
            description: prompt.description.clone(),
            messages: vec![PromptMessage {
                role: "user".into(),
                content: json!({
                    "type": "text",
                    "text": format!("{name}: {}", serde_json::Value::Object(arguments)),
                }),
            }],
        })
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDeclaration>> {
        self.check("resources")?;
        Ok(self.resources.clone())
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        if !self.resources.iter().any(|resource| resource.uri == uri) {
            return Err(BridgeError::protocol(
                "resources/read",
                format!("unknown resource '{uri}'"),
            ));
        }
        Ok(ResourceContent {
            contents: vec![ResourceContentItem {
                uri: uri.to_string(),
                mime_type: Some("text/plain".into()),
                text: Some(format!("contents of {uri}")),
                blob: None,
            }],
        })
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolCallOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if self.hanging.contains(name) {
            std::future::pending::<()>().await;
        }
        Ok(self
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolCallOutcome::text(format!("{}:{name}", self.name))))
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out [`FakeServer`]s by config name. Unknown names fail
/// with a refused connection.
#[derive(Default)]
pub(crate) struct FakeConnector {
    servers: HashMap<String, Arc<FakeServer>>,
    delays: HashMap<String, Duration>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_server(mut self, server: FakeServer) -> Self {
        self.servers.insert(server.name.clone(), Arc::new(server));
        self
    }

    pub(crate) fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub(crate) fn server(&self, name: &str) -> Arc<FakeServer> {
        Arc::clone(&self.servers[name])
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Connected> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(config.name()) {
            tokio::time::sleep(*delay).await;
        }

        let server = self
            .servers
            .get(config.name())
            .cloned()
            .ok_or_else(|| BridgeError::Connection {
                server: config.name().to_string(),
                message: "connect ECONNREFUSED 127.0.0.1:9".into(),
            })?;

        let process = match config {
            ServerConfig::Stdio(stdio) => Some(OwnedProcess {
                server_name: stdio.name.clone(),
                command: stdio.command.clone(),
                pid: Some(4242),
            }),
            ServerConfig::Stream(_) => None,
        };

        Ok(Connected {
            connection: server,
            process,
        })
    }
}
