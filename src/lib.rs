//! Toolbridge: MCP tool servers as one tool map
//!
//! Connects to local (stdio) and remote (streamable HTTP) Model Context
//! Protocol servers in parallel, wraps every declared tool as a namespaced,
//! schema-validated, time-bounded callable, and exposes prompt and resource
//! catalogs through synthesized bridge tools. A server that fails to connect
//! is reported and skipped; it never blocks the others.
//!
//! # Quick Start
//!
//! ```no_run
//! use toolbridge::prelude::*;
//!
//! # async fn example() -> toolbridge::error::Result<()> {
//! let file = ServersFile::load("mcp.json")?;
//! let loader = McpLoader::new(BridgeSettings::from_env(), file.policy);
//! let loaded = loader.load(&file.servers).await;
//!
//! for error in &loaded.errors {
//!     eprintln!("{}: {}", error.server_name, error.error);
//! }
//! if let Some(tool) = loaded.tools.get("fs_read") {
//!     println!("{}", tool.call(serde_json::json!({ "path": "README.md" })).await);
//! }
//! loaded.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mcp;
pub mod prelude;
pub mod resolver;
pub mod tools;
pub mod util;
