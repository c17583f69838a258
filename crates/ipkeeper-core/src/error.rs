//! Error types for ipkeeper
//!
//! This module defines all error types used throughout the workspace.
//! Collaborator crates (resolvers, record clients, alerters) map their
//! failures into [`Error`] so the update executor can classify them.

use thiserror::Error;

/// Result type alias for ipkeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ipkeeper
#[derive(Error, Debug)]
pub enum Error {
    /// The resolver answered but did not produce a usable IPv4 address
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Transport-level failure (socket, timeout, HTTP status, unreadable body)
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Alert delivery errors
    #[error("Alert error: {0}")]
    Alert(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Work scheduled on a delayed task failed
    #[error("Task error: {0}")]
    Task(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an alert delivery error
    pub fn alert(msg: impl Into<String>) -> Self {
        Self::Alert(msg.into())
    }

    /// Create a task error
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }

    /// Whether this error belongs to the connectivity class
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Network(err.to_string())
    }
}
