//! Error types for the runner.
//!
//! Only [`RunnerError::TransportLost`] can end a running loop. Everything
//! else is a startup failure.

use trawler_core::config::ConfigError;

/// Errors that can occur while starting or running the agent.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to open the WebSocket connection to the client.
    #[error("connect error: {0}")]
    Connect(String),

    /// The client connection dropped; there is no state to act on.
    #[error("transport lost: {0}")]
    TransportLost(String),

    /// A runner environment variable is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The agent configuration file or site selection is invalid.
    #[error("site config error: {0}")]
    Site(#[from] ConfigError),
}
