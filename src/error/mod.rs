//! Error types for toolbridge.

use thiserror::Error;

/// Broad error category used to route logging and recovery decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    ConnectionRefused,
    Configuration,
    Protocol,
    ToolExecution,
    Unknown,
}

/// Primary error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection to '{server}' failed: {message}")]
    Connection { server: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {context}: {message}")]
    Protocol { context: String, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Server '{0}' is not connected")]
    NotConnected(String),
}

impl BridgeError {
    /// Create a protocol error for the given request context.
    pub fn protocol(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    ///
    /// Timeouts and refused connections are recognised from the message as
    /// well as the variant, since transports report them as plain text.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout(_) => return ErrorCategory::Timeout,
            Self::Configuration(_) | Self::InvalidArgument(_) => {
                return ErrorCategory::Configuration
            }
            Self::ToolExecution { .. } => return ErrorCategory::ToolExecution,
            _ => {}
        }

        let message = self.to_string().to_ascii_lowercase();
        if message.contains("timeout") || message.contains("timed out") {
            ErrorCategory::Timeout
        } else if message.contains("econnrefused") || message.contains("connection refused") {
            ErrorCategory::ConnectionRefused
        } else if matches!(self, Self::Protocol { .. }) {
            ErrorCategory::Protocol
        } else {
            ErrorCategory::Unknown
        }
    }

    /// Whether this error is an expected runtime condition rather than a
    /// likely misconfiguration.
    pub fn is_operational(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Timeout | ErrorCategory::ConnectionRefused
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
