//! Convenience re-exports for common use.

pub use crate::config::{BridgeSettings, ServerConfig, ServersFile, ToolPolicy};
pub use crate::error::{BridgeError, Result};
pub use crate::mcp::{ClientWrapper, LoadError, LoadResult, McpLoadResult, McpLoader};
pub use crate::resolver::{CommandResolver, ShellCommandResolver};
pub use crate::tools::{ToolMap, ToolOutput, WrappedTool};
