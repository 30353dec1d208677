//! Error types for the testinspect library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using testinspect's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while profiling a test session.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported language for the given file.
    #[error("Unsupported language for file: {path}")]
    UnsupportedLanguage { path: PathBuf },

    /// Parse error from tree-sitter.
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Git operation error.
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Coverage store error.
    #[error("Coverage store error: {0}")]
    Coverage(#[from] rusqlite::Error),

    /// Collection reported failures and the session does not tolerate them.
    #[error("{failed} error(s) during collection")]
    CollectionAborted { failed: usize },

    /// The worker exited before completing its per-test protocol.
    #[error("worker for test {node_id} exited before completing its protocol")]
    WorkerDied { node_id: String },

    /// Malformed or out-of-order message on the worker channel.
    #[error("Worker protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Create a new git error.
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git(message.into())
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
