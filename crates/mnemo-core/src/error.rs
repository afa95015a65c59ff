//! Error types for mnemo-core

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while processing documents
#[derive(Error, Debug)]
pub enum CoreError {
    /// File not found or unreadable
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported document format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// PDF text extraction failed
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// Spreadsheet extraction failed
    #[error("Spreadsheet extraction failed: {0}")]
    Spreadsheet(String),

    /// URL fetch failed
    #[error("Failed to fetch URL {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Fetch {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            reason: err.to_string(),
        }
    }
}

/// Result type for mnemo-core operations
pub type Result<T> = std::result::Result<T, CoreError>;
