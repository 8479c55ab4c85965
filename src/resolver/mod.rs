//! Command resolution for stdio servers.
//!
//! Server configs usually name a bare executable (`npx`, `uvx`, `node`).
//! Spawning needs a concrete path, and the user's shell knows about PATH
//! tweaks, version managers and aliases that the agent process may not.
//! [`ShellCommandResolver`] asks that shell; [`StaticCommandResolver`] is the
//! in-memory double used by tests.
//!
//! Resolution never fails: when nothing is found the input is returned as-is
//! so the spawn attempt reports a clearer transport-level error.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::default_shell;

/// Maps a logical executable name to a path to spawn.
#[async_trait]
pub trait CommandResolver: Send + Sync {
    async fn resolve(&self, command: &str) -> String;
}

/// Resolver backed by the user's interactive shell.
///
/// This is the only place in the crate that spawns a shell.
#[derive(Debug, Clone)]
pub struct ShellCommandResolver {
    shell: String,
}

impl ShellCommandResolver {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Use `$SHELL`, falling back to `/bin/sh`.
    pub fn from_env() -> Self {
        Self::new(default_shell())
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    async fn lookup_with_shell(&self, command: &str) -> Option<String> {
        let script = format!("command -v {}", shell_quote(command));
        let mut lookup = Command::new(&self.shell);
        lookup.arg("-i").arg("-c").arg(script);
        run_lookup(lookup).await
    }

    async fn lookup_with_which(&self, command: &str) -> Option<String> {
        let mut lookup = Command::new("which");
        lookup.arg(command);
        run_lookup(lookup).await
    }
}

impl Default for ShellCommandResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl CommandResolver for ShellCommandResolver {
    async fn resolve(&self, command: &str) -> String {
        if Path::new(command).is_absolute() {
            return command.to_string();
        }

        if let Some(path) = self.lookup_with_shell(command).await {
            tracing::debug!(command, path = %path, shell = %self.shell, "Resolved command via shell");
            return path;
        }

        if let Some(path) = self.lookup_with_which(command).await {
            tracing::debug!(command, path = %path, "Resolved command via which");
            return path;
        }

        tracing::warn!(
            command,
            shell = %self.shell,
            "Could not resolve command; spawning it unresolved"
        );
        command.to_string()
    }
}

async fn run_lookup(mut lookup: Command) -> Option<String> {
    let output = lookup
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_lookup_output(&String::from_utf8_lossy(&output.stdout))
}

/// Pick the resolved path out of lookup output.
///
/// Interactive shells may print banners before the answer, and `command -v`
/// prints alias definitions for aliases, so only an absolute path on the
/// last non-empty line counts.
fn parse_lookup_output(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last()?;
    Path::new(line).is_absolute().then(|| line.to_string())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// In-memory resolver: known names map to fixed paths, everything else
/// resolves to itself.
#[derive(Debug, Clone, Default)]
pub struct StaticCommandResolver {
    paths: HashMap<String, String>,
}

impl StaticCommandResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, command: impl Into<String>, path: impl Into<String>) -> Self {
        self.paths.insert(command.into(), path.into());
        self
    }
}

#[async_trait]
impl CommandResolver for StaticCommandResolver {
    async fn resolve(&self, command: &str) -> String {
        if Path::new(command).is_absolute() {
            return command.to_string();
        }
        self.paths
            .get(command)
            .cloned()
            .unwrap_or_else(|| command.to_string())
    }
}
