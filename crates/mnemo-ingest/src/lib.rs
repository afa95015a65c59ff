//! mnemo-ingest: GitHub repository ingestion
//!
//! Clones a repository shallowly, walks it with the built-in exclude
//! and extension filters, and indexes each file through the store
//! coordinator. Indexing is incremental on the per-file last-commit
//! SHA; legacy VB6 formats are filtered of embedded binary before they
//! reach the stores.

pub mod categories;
pub mod error;
pub mod github;
pub mod indexer;
pub mod vb6;

pub use categories::CategoryManager;
pub use error::{IngestError, Result};
pub use github::{get_language, list_files, parse_repo_url, FileHistory, GhClient, RepoInfo};
pub use indexer::{FileError, IndexOptions, IndexReport, RepoIndexer};
pub use vb6::{extract_form_metadata, filter_binary_content, FormMetadata};
