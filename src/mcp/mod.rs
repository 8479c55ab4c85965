//! Model Context Protocol servers bridged into one tool map.

pub mod bridge;
pub mod catalog;
pub mod client;
pub mod filter;
pub mod initializer;
pub mod loader;
pub mod schema;
pub mod transport;
pub mod wrapper;

#[cfg(test)]
mod test_support;

pub use bridge::{flatten_content, wrap_tool};
pub use catalog::bridge_tools;
pub use client::{Connected, Connector, RmcpConnection, RmcpConnector, ServerConnection};
pub use filter::{is_disabled, ToolFilter};
pub use initializer::{InitializedServer, ServerInitializer};
pub use loader::{LoadError, LoadResult, McpLoadResult, McpLoader};
pub use schema::{
    ContentPart, PromptArgument, PromptDeclaration, PromptMessage, PromptResult, ResourceContent,
    ResourceContentItem, ResourceDeclaration, ServerCapabilities, ServerIdentity, ToolCallOutcome,
    ToolDeclaration,
};
pub use transport::{OwnedProcess, ServerTransport};
pub use wrapper::ClientWrapper;
