//! Shared test helpers: a mock streamable-HTTP MCP server.

#![allow(dead_code)]

use std::collections::HashSet;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// What the mock server declares and how it answers.
#[derive(Debug, Clone, Default)]
pub struct MockMcp {
    pub name: &'static str,
    pub tools: Vec<(&'static str, &'static str)>,
    pub prompts: bool,
    pub resources: bool,
    pub instructions: Option<&'static str>,
    pub failing_tool: Option<&'static str>,
    pub legacy_protocol_only: bool,
}

impl MockMcp {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn tool(mut self, name: &'static str, description: &'static str) -> Self {
        self.tools.push((name, description));
        self
    }

    pub fn with_prompts(mut self) -> Self {
        self.prompts = true;
        self
    }

    pub fn with_resources(mut self) -> Self {
        self.resources = true;
        self
    }

    pub fn with_instructions(mut self, instructions: &'static str) -> Self {
        self.instructions = Some(instructions);
        self
    }

    pub fn failing(mut self, tool: &'static str) -> Self {
        self.failing_tool = Some(tool);
        self
    }

    /// Reject every initialize that does not ask for 2024-11-05.
    pub fn legacy_protocol_only(mut self) -> Self {
        self.legacy_protocol_only = true;
        self
    }

    /// Start a wiremock server answering MCP requests on `/mcp`.
    pub async fn start(self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(mock_mcp_handler(self))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        server
    }
}

pub const LEGACY_PROTOCOL_VERSION: &str = "2024-11-05";

pub fn mcp_url(server: &MockServer) -> String {
    format!("{}/mcp", server.uri())
}

fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string" }
        },
        "required": ["query"]
    })
}

fn rpc_result(id: Value, result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    }))
}

pub fn mock_mcp_handler(mock: MockMcp) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        let body: Value = request.body_json().unwrap_or_else(|_| json!({}));
        if body.get("id").is_none() {
            // notifications and responses carry no id
            return ResponseTemplate::new(202);
        }
        let method = body.get("method").and_then(Value::as_str).unwrap_or_default();
        let id = body["id"].clone();
        let params = body.get("params").cloned().unwrap_or_else(|| json!({}));

        match method {
            "initialize" => {
                let requested = params["protocolVersion"].as_str().unwrap_or_default();
                if mock.legacy_protocol_only && requested != LEGACY_PROTOCOL_VERSION {
                    return ResponseTemplate::new(200).set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32602, "message": "Unsupported protocol version" }
                    }));
                }
                let protocol_version = if mock.legacy_protocol_only {
                    LEGACY_PROTOCOL_VERSION
                } else {
                    "2025-03-26"
                };
                let mut capabilities = json!({ "tools": { "listChanged": false } });
                if mock.prompts {
                    capabilities["prompts"] = json!({});
                }
                if mock.resources {
                    capabilities["resources"] = json!({});
                }
                let mut result = json!({
                    "protocolVersion": protocol_version,
                    "capabilities": capabilities,
                    "serverInfo": { "name": mock.name, "version": "0.1.0" }
                });
                if let Some(instructions) = mock.instructions {
                    result["instructions"] = json!(instructions);
                }
                rpc_result(id, result)
            }
            "tools/list" => {
                let tools: Vec<_> = mock
                    .tools
                    .iter()
                    .map(|(name, description)| {
                        json!({
                            "name": name,
                            "description": description,
                            "inputSchema": search_schema()
                        })
                    })
                    .collect();
                rpc_result(id, json!({ "tools": tools }))
            }
            "tools/call" => {
                let tool = params["name"].as_str().unwrap_or_default();
                if mock.failing_tool == Some(tool) {
                    return rpc_result(
                        id,
                        json!({
                            "content": [{ "type": "text", "text": format!("{tool} exploded") }],
                            "isError": true
                        }),
                    );
                }
                let query = params["arguments"]["query"].as_str().unwrap_or_default();
                rpc_result(
                    id,
                    json!({
                        "content": [
                            { "type": "text", "text": format!("{}:{tool}:{query}", mock.name) },
                            { "type": "image", "data": "aGk=", "mimeType": "image/png" }
                        ],
                        "isError": false
                    }),
                )
            }
            "prompts/list" => rpc_result(
                id,
                json!({
                    "prompts": [{
                        "name": "summarize",
                        "description": "Summarize text",
                        "arguments": [{ "name": "text", "required": true }]
                    }]
                }),
            ),
            "prompts/get" => {
                let text = params["arguments"]["text"].as_str().unwrap_or_default();
                rpc_result(
                    id,
                    json!({
                        "description": "Summarize text",
                        "messages": [{
                            "role": "user",
                            "content": { "type": "text", "text": format!("Summarize: {text}") }
                        }]
                    }),
                )
            }
            "resources/list" => rpc_result(
                id,
                json!({
                    "resources": [{
                        "uri": "file:///notes.md",
                        "name": "notes",
                        "mimeType": "text/markdown"
                    }]
                }),
            ),
            "resources/read" => {
                let uri = params["uri"].as_str().unwrap_or_default();
                rpc_result(
                    id,
                    json!({
                        "contents": [{ "uri": uri, "mimeType": "text/markdown", "text": "# Notes" }]
                    }),
                )
            }
            _ => ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            })),
        }
    }
}

pub fn initialize_protocol_versions(requests: &[Request]) -> Vec<String> {
    requests
        .iter()
        .filter_map(|request| request.body_json::<Value>().ok())
        .filter(|body| body.get("method").and_then(Value::as_str) == Some("initialize"))
        .filter_map(|body| body["params"]["protocolVersion"].as_str().map(str::to_string))
        .collect()
}

pub fn request_methods(requests: &[Request]) -> HashSet<String> {
    requests
        .iter()
        .filter_map(|request| {
            request
                .body_json::<Value>()
                .ok()
                .and_then(|body| body.get("method").and_then(Value::as_str).map(str::to_string))
        })
        .collect()
}

pub fn request_headers_match(requests: &[Request], header: &str, expected: &str) -> bool {
    requests.iter().all(|request| {
        request
            .headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            == Some(expected)
    })
}
