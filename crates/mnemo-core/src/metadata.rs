//! Document metadata model
//!
//! Metadata travels with every document across the vector store, the graph
//! and the cache. Hot fields are statically typed; anything the caller
//! supplies beyond the recognised set lands in the `extra` overflow map
//! and round-trips untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Text,
    Url,
    Github,
    Wiki,
    Document,
    TextFile,
    Code,
    Config,
    File,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::Text => "text",
            SourceType::Url => "url",
            SourceType::Github => "github",
            SourceType::Wiki => "wiki",
            SourceType::Document => "document",
            SourceType::TextFile => "text_file",
            SourceType::Code => "code",
            SourceType::Config => "config",
            SourceType::File => "file",
        };
        write!(f, "{}", s)
    }
}

/// Broad content classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Image,
    Video,
    Document,
    Text,
    Webpage,
    Spreadsheet,
    Word,
    Url,
    Code,
}

/// Detected natural language. Absence means the margin between the
/// Spanish and English marker counts was too small to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Es,
    En,
}

/// Repository category, a fixed organisational label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Lefarma,
    E6labs,
    Personal,
    Opensource,
    Hobby,
    Trabajo,
    Dependencias,
}

impl Default for Category {
    fn default() -> Self {
        Category::Personal
    }
}

impl Category {
    /// All valid category names
    pub const ALL: [Category; 7] = [
        Category::Lefarma,
        Category::E6labs,
        Category::Personal,
        Category::Opensource,
        Category::Hobby,
        Category::Trabajo,
        Category::Dependencias,
    ];

    /// Parse a category from its lowercase name
    pub fn parse(s: &str) -> Option<Category> {
        match s.to_lowercase().as_str() {
            "lefarma" => Some(Category::Lefarma),
            "e6labs" => Some(Category::E6labs),
            "personal" => Some(Category::Personal),
            "opensource" => Some(Category::Opensource),
            "hobby" => Some(Category::Hobby),
            "trabajo" => Some(Category::Trabajo),
            "dependencias" => Some(Category::Dependencias),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Lefarma => "lefarma",
            Category::E6labs => "e6labs",
            Category::Personal => "personal",
            Category::Opensource => "opensource",
            Category::Hobby => "hobby",
            Category::Trabajo => "trabajo",
            Category::Dependencias => "dependencias",
        };
        write!(f, "{}", s)
    }
}

/// Named entities extracted from content, capped at three per class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMentions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
}

impl EntityMentions {
    /// True when no entity of any class was found
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.organizations.is_empty() && self.locations.is_empty()
    }

    /// All mentions across classes, in people/org/location order
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.people
            .iter()
            .chain(self.organizations.iter())
            .chain(self.locations.iter())
    }
}

/// Repository provenance for code documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_language: Option<String>,
    /// HEAD commit at index time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_date: Option<String>,
    /// SHA of the last commit touching this file; the incremental
    /// indexing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

impl RepoFields {
    /// True when no repository field is set
    pub fn is_empty(&self) -> bool {
        self.repo_owner.is_none() && self.repo_name.is_none() && self.file_path.is_none()
    }
}

/// Full document metadata: recognised fields plus an overflow map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    /// ISO-8601 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// ISO-8601 last-update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Caller-supplied source (URL, path, or free text label)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Top keywords by frequency, stopword-filtered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "EntityMentions::is_empty")]
    pub entities: EntityMentions,
    /// Labels like `Person:Ada Lovelace` derived from entity mentions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_labels: Vec<String>,
    /// First 16 hex chars of the SHA-256 of content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_count: Option<usize>,
    /// Position within the chunked source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(flatten)]
    pub repo: RepoFields,
    /// Graph node labels; defaults to `["Document"]` when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Unrecognised caller-supplied fields, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DocMetadata {
    /// Graph labels for this document, falling back to `Document`
    pub fn graph_labels(&self) -> Vec<String> {
        if self.labels.is_empty() {
            vec!["Document".to_string()]
        } else {
            self.labels.clone()
        }
    }

    /// Free-form `type` field (e.g. "fact", "insight"), read from the
    /// overflow map
    pub fn doc_type(&self) -> Option<&str> {
        self.extra.get("type").and_then(|v| v.as_str())
    }

    /// Set the free-form `type` field
    pub fn set_doc_type(&mut self, t: impl Into<String>) {
        self.extra
            .insert("type".to_string(), serde_json::Value::String(t.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("opensource"), Some(Category::Opensource));
        assert_eq!(Category::parse("OPENSOURCE"), Some(Category::Opensource));
        assert_eq!(Category::parse("unknown"), None);
    }

    #[test]
    fn test_metadata_roundtrip_preserves_extra() {
        let json = serde_json::json!({
            "source": "notes.txt",
            "keywords": ["alpha", "beta"],
            "custom_field": {"nested": true},
            "tags": ["a", "b"]
        });
        let meta: DocMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(meta.source.as_deref(), Some("notes.txt"));
        assert_eq!(meta.keywords, vec!["alpha", "beta"]);
        assert!(meta.extra.contains_key("custom_field"));
        assert!(meta.extra.contains_key("tags"));

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["custom_field"]["nested"], true);
    }

    #[test]
    fn test_graph_labels_default() {
        let meta = DocMetadata::default();
        assert_eq!(meta.graph_labels(), vec!["Document".to_string()]);
    }

    #[test]
    fn test_doc_type_accessor() {
        let mut meta = DocMetadata::default();
        assert!(meta.doc_type().is_none());
        meta.set_doc_type("insight");
        assert_eq!(meta.doc_type(), Some("insight"));
    }
}
