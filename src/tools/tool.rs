//! Wrapped, namespaced, time-bounded tools.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::arguments::{coerce_arguments, JsonObject};
use super::types::{ToolOutput, ToolParameters};
use super::validation::SchemaNode;
use crate::error::BridgeError;
use crate::util::timeout::duration_millis;

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(JsonObject) -> Pin<Box<dyn Future<Output = Result<String, BridgeError>> + Send>>
    + Send
    + Sync;

/// Tools keyed by namespaced name.
pub type ToolMap = BTreeMap<String, Arc<WrappedTool>>;

/// Key a tool is published under: `{server}_{tool}`.
pub fn namespaced_name(server_name: &str, tool_name: &str) -> String {
    format!("{server_name}_{tool_name}")
}

/// A callable tool owned by the merged tool map.
///
/// Immutable once built. [`WrappedTool::execute`] never panics and never
/// returns an error: argument problems, remote failures and timeouts all come
/// back as [`ToolOutput::Failure`].
pub struct WrappedTool {
    name: String,
    tool_name: String,
    server_name: String,
    description: String,
    parameters: ToolParameters,
    schema: SchemaNode,
    timeout: Duration,
    handler: Arc<ToolHandler>,
}

impl WrappedTool {
    /// Create a tool from a closure.
    ///
    /// The validator is derived from `parameters` once, here.
    pub fn new<F, Fut>(
        server_name: impl Into<String>,
        tool_name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        timeout: Duration,
        handler: F,
    ) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BridgeError>> + Send + 'static,
    {
        let server_name = server_name.into();
        let tool_name = tool_name.into();
        let schema = SchemaNode::tool_input(Some(&parameters.schema));
        Self {
            name: namespaced_name(&server_name, &tool_name),
            tool_name,
            server_name,
            description: description.into(),
            parameters,
            schema,
            timeout,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Namespaced name (the key in the merged map).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as declared by the owning server.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate the arguments and run the handler within the timeout.
    pub async fn execute(&self, args: Value) -> ToolOutput {
        let args = match coerce_arguments(args) {
            Ok(args) => args,
            Err(e) => return ToolOutput::failure(failure_message(&e)),
        };

        if let Err(message) = self.schema.validate(&Value::Object(args.clone())) {
            tracing::debug!(tool = %self.name, error = %message, "Rejected tool arguments");
            return ToolOutput::failure(format!("Invalid arguments: {message}"));
        }

        match tokio::time::timeout(self.timeout, (self.handler)(args)).await {
            Ok(Ok(text)) => ToolOutput::Success(text),
            Ok(Err(e)) => {
                tracing::debug!(tool = %self.name, error = %e, "Tool execution failed");
                ToolOutput::failure(failure_message(&e))
            }
            Err(_) => {
                tracing::warn!(
                    tool = %self.name,
                    timeout_ms = duration_millis(self.timeout),
                    "Tool execution timed out"
                );
                ToolOutput::timeout()
            }
        }
    }

    /// Model-facing entry point: always a string.
    pub async fn call(&self, args: Value) -> String {
        self.execute(args).await.into_text()
    }
}

fn failure_message(error: &BridgeError) -> String {
    match error {
        BridgeError::ToolExecution { message, .. } | BridgeError::InvalidArgument(message) => {
            message.clone()
        }
        other => other.to_string(),
    }
}

impl std::fmt::Debug for WrappedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappedTool")
            .field("name", &self.name)
            .field("server_name", &self.server_name)
            .field("description", &self.description)
            .field("timeout", &self.timeout)
            .finish()
    }
}
