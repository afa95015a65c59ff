//! Error types for mnemo-store

use thiserror::Error;

/// Errors that can occur in store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Qdrant client error
    #[error("Qdrant error: {0}")]
    Qdrant(String),

    /// Graph (FalkorDB) error
    #[error("Graph error: {0}")]
    Graph(String),

    /// Cache (Redis) error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Embedding provider unavailable
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Caller must confirm a destructive operation
    #[error("Refusing {0} without confirmation")]
    ConfirmationRequired(&'static str),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<qdrant_client::QdrantError> for StoreError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        StoreError::Qdrant(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Cache(err.to_string())
        }
    }
}

/// Result type for mnemo-store operations
pub type Result<T> = std::result::Result<T, StoreError>;
