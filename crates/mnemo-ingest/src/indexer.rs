//! Repository indexer
//!
//! Walks a shallow clone, filters files, and feeds them through the
//! store coordinator. Indexing is incremental: a file whose last
//! commit SHA matches the stored document is skipped; a changed file
//! replaces its old document.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use mnemo_core::{Category, ContentType, DocMetadata, SourceType};
use mnemo_store::MemoryStore;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::github::{get_language, list_files, parse_repo_url, GhClient};
use crate::vb6;

/// Documents scanned when building the incremental lookup table
const SCROLL_LIMIT: usize = 10_000;

/// Options for one indexing run
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Category; defaults to `personal`
    pub category: Option<Category>,
    /// Re-index every file, ignoring stored commit SHAs
    pub force: bool,
    /// Extra exclude patterns on top of the built-in set
    pub exclude_patterns: Vec<String>,
    /// Cap on files processed
    pub limit: Option<usize>,
}

/// A per-file failure
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
}

/// Outcome of one indexing run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexReport {
    pub repo: String,
    pub category: Category,
    /// Files added for the first time
    pub files_indexed: usize,
    /// Files re-indexed because their commit changed
    pub files_updated: usize,
    /// Files skipped as unchanged
    pub files_skipped: usize,
    pub total_files: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileError>,
}

enum FileAction {
    Created,
    Updated,
    Skipped,
}

/// The incremental decision for one file
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    /// Stored commit matches the current one
    Skip,
    /// Stored document is stale; replace it
    Replace(String),
    Create,
}

/// Decide what to do with a file given what memory already holds
fn incremental_decision(
    existing: Option<&(String, Option<String>)>,
    current_sha: Option<&str>,
    force: bool,
) -> Decision {
    if force {
        return Decision::Create;
    }
    match existing {
        Some((id, stored_sha)) => {
            if stored_sha.as_deref() == current_sha {
                Decision::Skip
            } else {
                Decision::Replace(id.clone())
            }
        }
        None => Decision::Create,
    }
}

/// Indexes GitHub repositories into memory
pub struct RepoIndexer {
    store: Arc<MemoryStore>,
    github: GhClient,
}

impl RepoIndexer {
    /// Verify the `gh` preconditions and build an indexer
    pub async fn new(store: Arc<MemoryStore>) -> Result<Self> {
        let github = GhClient::new().await?;
        Ok(Self { store, github })
    }

    /// Index a repository
    pub async fn index(&self, repo_url: &str, options: IndexOptions) -> Result<IndexReport> {
        let (owner, repo) = parse_repo_url(repo_url)?;
        let repo_full_name = format!("{}/{}", owner, repo);
        let category = options.category.unwrap_or_default();

        // The TempDir guard removes the clone on every exit path
        let (_clone_guard, repo_dir) = self.github.clone_repo(repo_url).await?;

        let repo_info = self.github.repo_info(repo_url).await?;
        let repo_html_url = if repo_info.html_url.is_empty() {
            format!("https://github.com/{}", repo_full_name)
        } else {
            repo_info.html_url.clone()
        };
        let (current_commit, current_date) = self.github.current_commit(&repo_dir).await?;

        let mut files = list_files(&repo_dir, &options.exclude_patterns);
        if let Some(limit) = options.limit {
            files.truncate(limit);
        }

        let existing = self.existing_documents(&owner, &repo).await;

        let mut report = IndexReport {
            repo: repo_full_name.clone(),
            category,
            total_files: files.len(),
            ..Default::default()
        };

        info!(
            "Indexing {} ({} files, force={})",
            repo_full_name,
            files.len(),
            options.force
        );

        for file_path in &files {
            let rel_path = file_path
                .strip_prefix(&repo_dir)
                .unwrap_or(file_path)
                .to_path_buf();

            let result = self
                .index_single_file(
                    file_path,
                    &rel_path,
                    &repo_dir,
                    &owner,
                    &repo,
                    &repo_html_url,
                    category,
                    options.force,
                    &current_commit,
                    &current_date,
                    &existing,
                )
                .await;

            match result {
                Ok(FileAction::Created) => report.files_indexed += 1,
                Ok(FileAction::Updated) => report.files_updated += 1,
                Ok(FileAction::Skipped) => report.files_skipped += 1,
                Err(e) => report.errors.push(FileError {
                    file: rel_path.to_string_lossy().to_string(),
                    error: e.to_string(),
                }),
            }
        }

        info!(
            "Indexed {}: {} new, {} updated, {} skipped, {} errors",
            repo_full_name,
            report.files_indexed,
            report.files_updated,
            report.files_skipped,
            report.errors.len()
        );

        Ok(report)
    }

    /// Lookup table for the incremental decision:
    /// (file path) → (document id, last indexed commit)
    async fn existing_documents(
        &self,
        owner: &str,
        repo: &str,
    ) -> HashMap<String, (String, Option<String>)> {
        let records = match self.store.vector().scroll(SCROLL_LIMIT).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Could not scan existing documents: {}", e);
                return HashMap::new();
            }
        };

        records
            .into_iter()
            .filter(|r| {
                r.metadata.repo.repo_owner.as_deref() == Some(owner)
                    && r.metadata.repo.repo_name.as_deref() == Some(repo)
            })
            .filter_map(|r| {
                let path = r.metadata.repo.file_path.clone()?;
                let commit = r.metadata.repo.last_modified_commit.clone();
                Some((path, (r.id, commit)))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    async fn index_single_file(
        &self,
        file_path: &Path,
        rel_path: &Path,
        repo_dir: &Path,
        owner: &str,
        repo: &str,
        repo_url: &str,
        category: Category,
        force: bool,
        current_commit: &str,
        current_date: &str,
        existing: &HashMap<String, (String, Option<String>)>,
    ) -> Result<FileAction> {
        let mut content = crate::github::read_file_content(file_path)?;
        let rel_str = rel_path.to_string_lossy().to_string();

        let history = self.github.file_history(repo_dir, rel_path).await;

        let action = match incremental_decision(existing.get(&rel_str), history.sha.as_deref(), force)
        {
            Decision::Skip => {
                debug!("Unchanged: {}", rel_str);
                return Ok(FileAction::Skipped);
            }
            Decision::Replace(old_id) => {
                // Changed: replace the old document wholesale
                self.store.delete(&old_id, false).await;
                FileAction::Updated
            }
            Decision::Create => FileAction::Created,
        };

        let extension = file_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));

        let mut metadata = DocMetadata {
            source: Some(repo_url.to_string()),
            source_type: Some(SourceType::Github),
            content_type: Some(ContentType::Code),
            ..Default::default()
        };
        metadata.set_doc_type("code");
        metadata.repo.repo_owner = Some(owner.to_string());
        metadata.repo.repo_name = Some(repo.to_string());
        metadata.repo.repo_url = Some(repo_url.to_string());
        metadata.repo.file_path = Some(rel_str.clone());
        metadata.repo.file_extension = extension;
        metadata.repo.file_language = Some(get_language(file_path).to_string());
        metadata.repo.commit_sha = Some(current_commit.to_string());
        metadata.repo.commit_date = Some(current_date.to_string());
        metadata.repo.last_modified_commit = history.sha.clone();
        metadata.repo.last_modified_date = history.date.clone();
        metadata.repo.last_modified_author = history.author.clone();
        metadata.repo.category = Some(category);
        metadata.repo.indexed_at = Some(Utc::now().to_rfc3339());

        // Forms get structured metadata and a searchable header
        let is_frm = file_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase() == "frm")
            .unwrap_or(false);
        if is_frm {
            if let Some(form) = vb6::extract_form_metadata(&content) {
                if let Some(ref name) = form.form_name {
                    metadata.extra.insert("vb6_form_name".into(), json!(name));
                }
                if let Some(ref caption) = form.caption {
                    metadata.extra.insert("vb6_caption".into(), json!(caption));
                }
                if let Some(ref module) = form.module_name {
                    metadata.extra.insert("vb6_module_name".into(), json!(module));
                }
                if !form.controls.is_empty() {
                    metadata.extra.insert("vb6_controls".into(), json!(form.controls));
                }
                if !form.procedures.is_empty() {
                    metadata
                        .extra
                        .insert("vb6_procedures".into(), json!(form.procedures));
                }

                if let Some(header) = vb6::searchable_header(&form) {
                    content = format!("{}\n\n{}", header, content);
                }
            }
        }

        let outcome = self.store.add(&content, metadata).await;
        if outcome.id.is_none() {
            return Err(IngestError::Validation(format!(
                "all stores rejected {}: {}",
                rel_str,
                outcome.errors.join("; ")
            )));
        }

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_category_is_personal() {
        assert_eq!(Category::default(), Category::Personal);
        assert_eq!(IndexOptions::default().category, None);
    }

    #[test]
    fn test_incremental_decision() {
        let existing = ("doc-1".to_string(), Some("sha-a".to_string()));

        // Same commit: skip
        assert_eq!(
            incremental_decision(Some(&existing), Some("sha-a"), false),
            Decision::Skip
        );
        // Different commit: replace the stored document
        assert_eq!(
            incremental_decision(Some(&existing), Some("sha-b"), false),
            Decision::Replace("doc-1".to_string())
        );
        // Unknown file: create
        assert_eq!(incremental_decision(None, Some("sha-a"), false), Decision::Create);
        // Force bypasses the comparison entirely
        assert_eq!(
            incremental_decision(Some(&existing), Some("sha-a"), true),
            Decision::Create
        );
        // A file with no history compares as changed against a stored SHA
        assert_eq!(
            incremental_decision(Some(&existing), None, false),
            Decision::Replace("doc-1".to_string())
        );
    }

    #[test]
    fn test_report_serializes_without_empty_errors() {
        let report = IndexReport {
            repo: "acme/widget".to_string(),
            files_indexed: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files_indexed"], 3);
        assert!(json.get("errors").is_none());
    }
}
