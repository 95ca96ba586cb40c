//! Core error types for dcx

use dcx_protocol::ProtocolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the dcx ecosystem
#[derive(Error, Debug)]
pub enum DcxError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Broker or store error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Display context error
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DcxError {
    /// Whether the failure means nobody is running, as opposed to somebody failing
    pub fn is_no_workers(&self) -> bool {
        matches!(self, DcxError::Context(ContextError::NoWorkers))
    }

    /// Whether the failure came from the broker or store rather than a worker
    pub fn is_transport(&self) -> bool {
        matches!(self, DcxError::Transport(_))
    }
}

/// Broker and shared store failures. Always propagated, never swallowed.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Broker could not be reached
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// Shared store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// No consumer is attached to the addressed channel
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// No reply within the RPC timeout
    #[error("No reply from {channel} within {after:?}")]
    Timeout { channel: String, after: Duration },
}

/// Display context failures
#[derive(Error, Debug)]
pub enum ContextError {
    /// Discovery found no live worker
    #[error("No display workers available")]
    NoWorkers,

    /// A worker answered with `status: "error"`
    #[error("Worker {display} failed {command}: {message}")]
    WorkerReported {
        display: String,
        command: String,
        message: String,
    },

    /// Window name is neither cached nor declared by any layout
    #[error("Window not found: {0}")]
    WindowNotFound(String),

    /// Pane id is not cached
    #[error("View object not found: {0}")]
    PaneNotFound(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
