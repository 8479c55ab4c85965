//! Turn remote tool declarations into local [`WrappedTool`]s.

use std::sync::Arc;
use std::time::Duration;

use super::client::ServerConnection;
use super::schema::{ContentPart, ToolCallOutcome, ToolDeclaration};
use crate::error::BridgeError;
use crate::tools::{JsonObject, ToolParameters, WrappedTool};

/// Wrap one declared tool so calls are proxied to `connection`.
pub fn wrap_tool(
    server_name: &str,
    declaration: &ToolDeclaration,
    connection: Arc<dyn ServerConnection>,
    timeout: Duration,
) -> WrappedTool {
    let parameters = declaration
        .input_schema
        .clone()
        .map(ToolParameters::from_schema)
        .unwrap_or_else(ToolParameters::empty);
    let remote_name: Arc<str> = Arc::from(declaration.name.as_str());

    WrappedTool::new(
        server_name,
        declaration.name.clone(),
        declaration.description.clone().unwrap_or_default(),
        parameters,
        timeout,
        move |args: JsonObject| {
            let connection = Arc::clone(&connection);
            let remote_name = Arc::clone(&remote_name);
            async move {
                let outcome = connection.call_tool(&remote_name, args).await?;
                outcome_text(&remote_name, outcome)
            }
        },
    )
}

fn outcome_text(tool_name: &str, outcome: ToolCallOutcome) -> Result<String, BridgeError> {
    let text = flatten_content(&outcome.content);
    if !outcome.is_error {
        return Ok(text);
    }

    let message = if !text.is_empty() {
        text
    } else if let Some(structured) = outcome.structured_content {
        structured.to_string()
    } else {
        "tool returned an error result".to_string()
    };
    Err(BridgeError::ToolExecution {
        tool_name: tool_name.to_string(),
        message,
    })
}

/// Render heterogeneous content parts as a single string.
pub fn flatten_content(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => text.clone(),
            ContentPart::Image { data, .. } => format!("[Image: {data}]"),
            ContentPart::Resource { resource } => format!("[Resource: {}]", resource.uri),
            ContentPart::Unknown => "[Unknown content type]".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
