//! Error types for mnemo-ingest

use thiserror::Error;

/// Errors that can occur during repository ingestion
#[derive(Error, Debug)]
pub enum IngestError {
    /// Missing external tooling or authentication; the message tells
    /// the operator how to fix it
    #[error("{0}")]
    Precondition(String),

    /// Caller supplied an invalid repository URL or category
    #[error("Validation error: {0}")]
    Validation(String),

    /// A git or gh subprocess failed
    #[error("{command} failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    /// Store error while indexing
    #[error("Store error: {0}")]
    Store(#[from] mnemo_store::StoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn subprocess(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Subprocess {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}

/// Result type for mnemo-ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;
