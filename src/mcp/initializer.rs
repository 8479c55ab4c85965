//! Connect to one server and read what it supports.

use std::sync::Arc;
use std::time::Instant;

use super::client::{Connector, ServerConnection};
use super::schema::{ServerCapabilities, ServerIdentity};
use super::transport::OwnedProcess;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::util::timeout::duration_millis;

/// A server that completed its handshake.
pub struct InitializedServer {
    pub connection: Arc<dyn ServerConnection>,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerIdentity,
    pub process: Option<OwnedProcess>,
}

pub struct ServerInitializer {
    connector: Arc<dyn Connector>,
}

impl ServerInitializer {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Validate the config, build the transport and perform the handshake.
    ///
    /// Failures are logged (timeouts and refused connections at `warn`,
    /// everything else at `error`) and returned unchanged.
    pub async fn initialize(&self, config: &ServerConfig) -> Result<InitializedServer> {
        let server = config.name();
        let started = Instant::now();

        let outcome = match config.validate() {
            Ok(()) => self.connector.connect(config).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(connected) => {
                let capabilities = connected.connection.capabilities();
                let server_info = connected.connection.server_info();
                tracing::debug!(
                    server = %server,
                    transport = %config.kind(),
                    elapsed_ms = duration_millis(started.elapsed()),
                    remote = %server_info.name,
                    tools = capabilities.tools,
                    prompts = capabilities.prompts,
                    resources = capabilities.resources,
                    "Initialized MCP server"
                );
                Ok(InitializedServer {
                    connection: connected.connection,
                    capabilities,
                    server_info,
                    process: connected.process,
                })
            }
            Err(e) => {
                let elapsed_ms = duration_millis(started.elapsed());
                if e.is_operational() {
                    tracing::warn!(server = %server, elapsed_ms, error = %e, "MCP server unavailable");
                } else {
                    tracing::error!(server = %server, elapsed_ms, error = %e, "Failed to initialize MCP server");
                }
                Err(e)
            }
        }
    }
}
