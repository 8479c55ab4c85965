//! Server-level and global tool disable policies.

use crate::config::{ServerConfig, ToolPolicy};
use crate::tools::{ToolMap, WrappedTool};

/// Decide whether a published tool is disabled.
///
/// The server's own `disabledTools` list is checked first against the bare
/// tool name. Otherwise the global list matches the namespaced key, the bare
/// name, or any suffix of the key. Blank global entries never match.
pub fn is_disabled(
    key: &str,
    tool: &WrappedTool,
    server_config: Option<&ServerConfig>,
    policy: &ToolPolicy,
) -> bool {
    if let Some(config) = server_config {
        if config
            .disabled_tools()
            .iter()
            .any(|name| name == tool.tool_name())
        {
            return true;
        }
    }

    policy
        .disabled_internal_tools
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .any(|entry| entry == key || entry == tool.tool_name() || key.ends_with(entry))
}

/// Applies [`is_disabled`] to a whole tool map.
pub struct ToolFilter;

impl ToolFilter {
    /// Remove every disabled tool from `tools`, returning how many were dropped.
    pub fn apply(tools: &mut ToolMap, configs: &[ServerConfig], policy: &ToolPolicy) -> usize {
        let before = tools.len();
        tools.retain(|key, tool| {
            let config = configs
                .iter()
                .rev()
                .find(|config| config.name() == tool.server_name());
            let disabled = is_disabled(key, tool, config, policy);
            if disabled {
                tracing::debug!(tool = %key, server = %tool.server_name(), "Tool disabled by policy");
            }
            !disabled
        });
        before - tools.len()
    }
}
