//! mnemo-core: data model and document processing
//!
//! The shared vocabulary of the memory engine: documents and their
//! typed metadata, the pure metadata enricher, the entity regex
//! families, and format-specific text extraction with chunking.
//! Everything here is backend-free; stores live in `mnemo-store`.

pub mod document;
pub mod enricher;
pub mod entities;
pub mod error;
pub mod metadata;
pub mod processor;

pub use document::{content_hash, full_hash, is_binary_content, Document};
pub use enricher::{detect_language, extract_keywords, infer_source_type, MetadataEnricher};
pub use entities::{extract_graph_entities, EntityKind, GraphEntity};
pub use error::{CoreError, Result};
pub use metadata::{
    Category, ContentType, DocMetadata, EntityMentions, Language, RepoFields, SourceType,
};
pub use processor::{DocumentProcessor, Extracted, ExtractedFormat};
