//! Error types for stampede-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (fatal, raised before any worker starts)
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// No client factory registered under the requested name
    #[error("unknown client {0:?}: register it before running")]
    UnknownClient(String),

    /// Error raised by a client capability outside the request loop
    /// (global initialization, before the scheduler starts)
    #[error("client error: {0}")]
    Client(#[from] crate::traits::ClientError),

    /// Orchestration error
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// The run was interrupted by the operator
    #[error("run interrupted by operator")]
    Interrupted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
