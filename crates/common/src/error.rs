//! Common error types for the L4 failover crates.

use std::fmt;

/// A specialized Result type for failover operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for failover operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audit error: {0}")]
    Audit(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new audit error.
    pub fn audit(msg: impl fmt::Display) -> Self {
        Error::Audit(msg.to_string())
    }
}
