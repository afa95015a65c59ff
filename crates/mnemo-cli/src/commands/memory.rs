//! `mnemo memory` command group

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use mnemo_consolidate::Consolidator;
use mnemo_core::{DocMetadata, DocumentProcessor};
use mnemo_store::{DeleteStatus, MemoryStore};
use tracing::warn;

use super::{print_json, App};

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Add content: inline text, a file path, or a URL
    Add(AddArgs),
    /// Query memory across all stores
    Query(QueryArgs),
    /// Count stored documents
    Count,
    /// Deep analysis of memory health
    Analyze,
    /// Run the full consolidation pass
    Consolidate(ConsolidateArgs),
    /// Delete documents matching a query
    Delete(DeleteArgs),
    /// Delete everything
    DeleteAll(DeleteAllArgs),
    /// Per-backend statistics and health
    Stats,
    /// Fast vector-to-graph reconciliation
    Sync,
    /// Pre-warm the query cache with the canned query list
    Warmup,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Inline text, file path, or URL
    pub content: String,

    /// Metadata pairs, repeatable: -m source=notes -m type=fact
    #[arg(short = 'm', long = "metadata", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query text
    pub text: String,

    /// Result limit per store
    #[arg(short = 'l', long, default_value_t = 5)]
    pub limit: usize,

    /// Bypass the query cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug)]
pub struct ConsolidateArgs {
    /// Clear the change-detection state first
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Query whose matches get deleted
    pub query: String,

    /// Actually delete; without it, only list the matches
    #[arg(long)]
    pub confirm: bool,

    /// Delete even documents with graph connections
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct DeleteAllArgs {
    /// Required: wipes every store
    #[arg(long)]
    pub confirm: bool,
}

pub async fn run(app: &App, command: MemoryCommand) -> Result<()> {
    match command {
        MemoryCommand::Add(args) => add(app, args).await,
        MemoryCommand::Query(args) => query(app, args).await,
        MemoryCommand::Count => count(app).await,
        MemoryCommand::Analyze => analyze(app).await,
        MemoryCommand::Consolidate(args) => consolidate(app, args).await,
        MemoryCommand::Delete(args) => delete(app, args).await,
        MemoryCommand::DeleteAll(args) => delete_all(app, args).await,
        MemoryCommand::Stats => stats(app).await,
        MemoryCommand::Sync => sync(app).await,
        MemoryCommand::Warmup => warmup(app).await,
    }
}

/// Parse repeatable `-m key=value` pairs into document metadata
pub fn parse_metadata(pairs: &[String]) -> Result<DocMetadata> {
    let mut map = serde_json::Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata must be key=value, got '{}'", pair);
        };
        map.insert(
            key.trim().to_string(),
            serde_json::Value::String(value.trim().to_string()),
        );
    }
    Ok(serde_json::from_value(serde_json::Value::Object(map))?)
}

/// Shared ingestion path: extract, chunk, add each chunk
pub async fn ingest_content(
    store: &Arc<MemoryStore>,
    input: &str,
    mut metadata: DocMetadata,
) -> Result<Vec<String>> {
    let processor = DocumentProcessor::default();
    let extracted = processor.process(input).await?;

    if metadata.source.is_none() {
        metadata.source = extracted.source.clone();
    }

    let chunks = processor.chunk(&extracted.text);
    if chunks.is_empty() {
        bail!("nothing to add: extracted content is empty");
    }

    let total = chunks.len();
    let mut ids = Vec::new();
    for (index, chunk) in chunks.into_iter().enumerate() {
        let mut chunk_metadata = metadata.clone();
        if total > 1 {
            chunk_metadata.chunk_index = Some(index);
            chunk_metadata.total_chunks = Some(total);
        }
        let outcome = store.add(&chunk, chunk_metadata).await;
        match outcome.id {
            Some(id) => ids.push(id),
            None => warn!(
                "chunk {}/{} rejected by all stores: {}",
                index,
                total,
                outcome.errors.join("; ")
            ),
        }
    }

    if ids.is_empty() {
        bail!("all chunks were rejected");
    }
    Ok(ids)
}

async fn add(app: &App, args: AddArgs) -> Result<()> {
    let store = app.connect().await?;
    let metadata = parse_metadata(&args.metadata)?;
    let ids = ingest_content(&store, &args.content, metadata).await?;

    println!("Added {} document(s)", ids.len());
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

async fn query(app: &App, args: QueryArgs) -> Result<()> {
    let store = app.connect().await?;
    let response = store.query(&args.text, args.limit, !args.no_cache).await;

    if response.cache_hit {
        println!("(cache hit)");
    }
    println!("Vector results: {}", response.vector_results.len());
    for hit in &response.vector_results {
        println!("  [{:.3}] {}  {}", hit.score, hit.id, preview(&hit.content));
    }
    println!("Graph results: {}", response.graph_results.len());
    for node in &response.graph_results {
        println!("  {}  {}", node.id, preview(&node.content));
    }
    if !response.temporal_results.is_empty() {
        println!("Temporal results: {}", response.temporal_results.len());
    }
    Ok(())
}

fn preview(content: &str) -> String {
    let one_line: String = content.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if one_line.chars().count() > 80 {
        format!("{}…", one_line.chars().take(79).collect::<String>())
    } else {
        one_line
    }
}

async fn count(app: &App) -> Result<()> {
    let store = app.connect().await?;
    println!("{}", store.count().await?);
    Ok(())
}

async fn analyze(app: &App) -> Result<()> {
    let store = app.connect().await?;
    let consolidator = Consolidator::new(store);
    let analysis = consolidator.analyze().await;
    print_json(&analysis)
}

async fn consolidate(app: &App, args: ConsolidateArgs) -> Result<()> {
    let store = app.connect().await?;
    let mut consolidator = Consolidator::new(store);
    let report = consolidator.consolidate(args.full).await;

    for error in &report.errors {
        warn!("consolidation phase error: {}", error);
    }
    print_json(&report)
}

async fn delete(app: &App, args: DeleteArgs) -> Result<()> {
    let store = app.connect().await?;
    let response = store.query(&args.query, 20, false).await;

    if response.vector_results.is_empty() {
        println!("No documents match '{}'", args.query);
        return Ok(());
    }

    if !args.confirm {
        println!(
            "Would delete {} document(s); re-run with --confirm:",
            response.vector_results.len()
        );
        for hit in &response.vector_results {
            println!("  {}  {}", hit.id, preview(&hit.content));
        }
        return Ok(());
    }

    let mut deleted = 0;
    let mut blocked = 0;
    for hit in &response.vector_results {
        let outcome = store.delete(&hit.id, !args.force).await;
        match outcome.status {
            DeleteStatus::Success => deleted += 1,
            DeleteStatus::Blocked => {
                blocked += 1;
                warn!(
                    "{} blocked: {} graph connection(s); use --force",
                    hit.id, outcome.connections
                );
            }
            _ => warn!("{} failed: {}", hit.id, outcome.errors.join("; ")),
        }
    }
    println!("Deleted {} document(s), {} blocked", deleted, blocked);
    Ok(())
}

async fn delete_all(app: &App, args: DeleteAllArgs) -> Result<()> {
    if !args.confirm {
        bail!("delete-all wipes every store; re-run with --confirm");
    }
    let store = app.connect().await?;
    let outcome = store.delete_all(true).await?;
    println!(
        "Deleted {} vector points and {} graph nodes",
        outcome.vector_deleted, outcome.graph_deleted
    );
    Ok(())
}

async fn stats(app: &App) -> Result<()> {
    let store = app.connect().await?;
    let stats = store.stats().await;
    print_json(&stats)
}

async fn sync(app: &App) -> Result<()> {
    let store = app.connect().await?;
    let report = store.sync().await;
    print_json(&report)
}

async fn warmup(app: &App) -> Result<()> {
    let store = app.connect().await?;
    let warmed = store.warmup().await;
    println!("Warmed {} queries", warmed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata_typed_and_extra() {
        let meta = parse_metadata(&[
            "source=notes.txt".to_string(),
            "type=fact".to_string(),
            "project=mnemo".to_string(),
        ])
        .unwrap();
        assert_eq!(meta.source.as_deref(), Some("notes.txt"));
        assert_eq!(meta.doc_type(), Some("fact"));
        assert_eq!(
            meta.extra.get("project").and_then(|v| v.as_str()),
            Some("mnemo")
        );
    }

    #[test]
    fn test_parse_metadata_rejects_bare_key() {
        assert!(parse_metadata(&["nodelimiter".to_string()]).is_err());
    }
}
