//! Store coordinator
//!
//! Owns the public `add` / `query` / `delete` / `count` / `stats` /
//! `sync` surface and keeps the three stores convergent. Per-store
//! errors never abort an operation: they are accumulated and reported
//! in the outcome's status. Within one `add`, the vector insert
//! happens-before the graph insert happens-before the cache writes, so
//! a reader that sees a document in the graph will find it in the
//! vector store.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use mnemo_core::{DocMetadata, MetadataEnricher};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::keys;
use crate::embeddings::{fallback_embedding, EmbeddingProvider};
use crate::error::{Result, StoreError};
use crate::traits::{CacheStore, GraphIndex, TemporalIndex, VectorIndex};
use crate::types::{
    AddOutcome, AddStatus, DeleteAllOutcome, DeleteOutcome, DeleteStatus, HealthReport,
    QueryResponse, StatsReport, SyncReport, VectorRecord,
};

/// Keywords folded into the embedding context
const CONTEXT_KEYWORDS: usize = 5;
/// Entities folded into the embedding context
const CONTEXT_ENTITIES: usize = 4;
/// Result IDs considered for prefetch after a query
const PREFETCH_RESULT_LIMIT: usize = 10;
/// Scroll ceiling for sync and consolidation reads
const SCROLL_LIMIT: usize = 10_000;

/// Canned queries used by cache warm-up
const WARMUP_QUERIES: [&str; 5] = [
    "recent notes",
    "project status",
    "open questions",
    "meeting summary",
    "todo list",
];

/// Cached query payload, exactly what `query_cache:*` holds
#[derive(Debug, Serialize, Deserialize)]
struct CachedQuery {
    query: String,
    timestamp: String,
    results: CachedResults,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedResults {
    vector_results: Vec<crate::types::VectorHit>,
    graph_results: Vec<crate::types::GraphNodeRow>,
    #[serde(default)]
    temporal_results: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryEntry {
    query: String,
    timestamp: String,
}

/// Audit record appended to the deletions log
#[derive(Debug, Serialize)]
struct DeletionAudit<'a> {
    deleted_at: String,
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector_deleted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph_deleted: Option<i64>,
}

/// The tri-store coordinator
pub struct MemoryStore {
    vector: Arc<dyn VectorIndex>,
    graph: Arc<dyn GraphIndex>,
    cache: Arc<dyn CacheStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    temporal: Option<Arc<dyn TemporalIndex>>,
    enricher: MetadataEnricher,
    /// Append-only JSONL audit of deletions
    deletions_log: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(
        vector: Arc<dyn VectorIndex>,
        graph: Arc<dyn GraphIndex>,
        cache: Arc<dyn CacheStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            vector,
            graph,
            cache,
            embedder,
            temporal: None,
            enricher: MetadataEnricher::new(),
            deletions_log: None,
        }
    }

    /// Attach the optional temporal collaborator
    pub fn with_temporal(mut self, temporal: Arc<dyn TemporalIndex>) -> Self {
        self.temporal = Some(temporal);
        self
    }

    /// Record deletions to an append-only JSONL file
    pub fn with_deletions_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.deletions_log = Some(path.into());
        self
    }

    /// The embedding dimension every stored vector has
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Direct access for the consolidation engine
    pub fn vector(&self) -> &Arc<dyn VectorIndex> {
        &self.vector
    }

    pub fn graph(&self) -> &Arc<dyn GraphIndex> {
        &self.graph
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed with the provider, degrading to the deterministic
    /// pseudo-vector so ingestion never blocks on the network
    pub async fn embed_or_fallback(&self, text: &str) -> Vec<f32> {
        match self.embedder.embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Embedding failed, using fallback: {}", e);
                fallback_embedding(text, self.embedder.dimension())
            }
        }
    }

    // ========================================================================
    // add
    // ========================================================================

    /// Add a document to all three stores
    pub async fn add(&self, content: &str, metadata: DocMetadata) -> AddOutcome {
        let metadata = self.enricher.enrich(content, metadata, Utc::now());
        let mut errors = Vec::new();

        // Context-augmented embedding: content plus keywords, entities
        // and language, pipe-separated
        let context = embedding_context(content, &metadata);
        let embedding = self.embed_or_fallback(&context).await;

        if let Err(e) = self.vector.ensure_collection(self.embedder.dimension()).await {
            errors.push(format!("vector: {}", e));
        }

        let id = Uuid::new_v4().to_string();

        let vector_ok = match self.vector.add(&id, embedding, content, &metadata).await {
            Ok(()) => true,
            Err(e) => {
                errors.push(format!("vector: {}", e));
                false
            }
        };

        let labels = graph_labels(&metadata);
        let graph_ok = match self.graph.add_node(&id, content, &metadata, &labels).await {
            Ok(()) => true,
            Err(e) => {
                errors.push(format!("graph: {}", e));
                false
            }
        };

        if vector_ok || graph_ok {
            self.write_add_caches(&id, content, &metadata).await;
        }

        let status = match (vector_ok, graph_ok) {
            (true, true) => AddStatus::Full,
            (false, false) => AddStatus::Failed,
            _ => AddStatus::Partial,
        };

        AddOutcome {
            status,
            id: (vector_ok || graph_ok).then_some(id),
            vector_ok,
            graph_ok,
            errors,
        }
    }

    /// Cache entries written after a successful add; all best-effort
    async fn write_add_caches(&self, id: &str, content: &str, metadata: &DocMetadata) {
        best_effort(
            self.cache
                .set(&keys::doc(id), content, Some(keys::DOC_TTL_SECS))
                .await,
            "doc",
        );

        if !metadata.keywords.is_empty() {
            best_effort(
                self.cache
                    .set(
                        &keys::keywords(id),
                        &metadata.keywords.join(","),
                        Some(keys::KEYWORDS_TTL_SECS),
                    )
                    .await,
                "keywords",
            );
        }

        let tokens: Vec<String> = metadata.entities.all().cloned().collect();
        if !tokens.is_empty() {
            if let Ok(json) = serde_json::to_string(&tokens) {
                best_effort(
                    self.cache
                        .set(&keys::doc_entities(id), &json, Some(keys::DOC_ENTITIES_TTL_SECS))
                        .await,
                    "doc_entities",
                );
            }
            for token in &tokens {
                self.append_entity_doc(token, id).await;
            }
        }

        // Recent-documents window, trimmed to the last 100
        let now = Utc::now().timestamp() as f64;
        best_effort(self.cache.zadd(keys::RECENT_DOCS, id, now).await, "recent");
        best_effort(
            self.cache.ztrim_to(keys::RECENT_DOCS, keys::RECENT_WINDOW).await,
            "recent-trim",
        );

        let preview: String = content.chars().take(keys::PREVIEW_LIMIT).collect();
        best_effort(
            self.cache
                .set(
                    &keys::recent_preview(id),
                    &preview,
                    Some(keys::RECENT_PREVIEW_TTL_SECS),
                )
                .await,
            "recent-preview",
        );
    }

    /// Append `id` to the entity's reverse list, capped at 100
    async fn append_entity_doc(&self, token: &str, id: &str) {
        let key = keys::entity_docs(token);
        let mut ids: Vec<String> = match self.cache.get(&key).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_default(),
            _ => Vec::new(),
        };
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        if ids.len() > keys::ENTITY_DOCS_CAP {
            let excess = ids.len() - keys::ENTITY_DOCS_CAP;
            ids.drain(0..excess);
        }
        if let Ok(json) = serde_json::to_string(&ids) {
            best_effort(
                self.cache
                    .set(&key, &json, Some(keys::ENTITY_DOCS_TTL_SECS))
                    .await,
                "entity_docs",
            );
        }
    }

    // ========================================================================
    // query
    // ========================================================================

    /// Query all stores, merging results with per-source attribution
    pub async fn query(&self, text: &str, limit: usize, use_cache: bool) -> QueryResponse {
        if use_cache {
            if let Some(hit) = self.probe_query_cache(text).await {
                debug!("Query cache hit for '{}'", text);
                return hit;
            }
        }

        let response = self.query_stores(text, limit).await;
        self.record_query(text, &response, keys::QUERY_CACHE_TTL_SECS).await;
        self.launch_prefetch(&response);

        response
    }

    async fn probe_query_cache(&self, text: &str) -> Option<QueryResponse> {
        let cached = self.cache.get(&keys::query_cache(text)).await.ok()??;
        let parsed: CachedQuery = serde_json::from_str(&cached).ok()?;
        Some(QueryResponse {
            query: parsed.query,
            cache_hit: true,
            vector_results: parsed.results.vector_results,
            graph_results: parsed.results.graph_results,
            temporal_results: parsed.results.temporal_results,
        })
    }

    /// The parallel fan-out across vector, graph and the optional
    /// temporal collaborator
    async fn query_stores(&self, text: &str, limit: usize) -> QueryResponse {
        let embedding = self.embed_or_fallback(text).await;

        let vector_fut = self.vector.search(embedding, limit, None);
        let graph_fut = self.graph.search_nodes(text, limit);
        let temporal_fut = async {
            match &self.temporal {
                Some(temporal) if temporal.health().await => {
                    temporal.search(text, limit).await.unwrap_or_default()
                }
                // Absent or unhealthy: silently skipped
                _ => Vec::new(),
            }
        };

        let (vector_results, graph_results, temporal_results) =
            tokio::join!(vector_fut, graph_fut, temporal_fut);

        let vector_results = vector_results.unwrap_or_else(|e| {
            warn!("Vector search failed: {}", e);
            Vec::new()
        });
        let graph_results = graph_results.unwrap_or_else(|e| {
            warn!("Graph search failed: {}", e);
            Vec::new()
        });

        QueryResponse {
            query: text.to_string(),
            cache_hit: false,
            vector_results,
            graph_results,
            temporal_results,
        }
    }

    /// Cache the result, bump the frequency counter, extend history
    async fn record_query(&self, text: &str, response: &QueryResponse, ttl: u64) {
        let cached = CachedQuery {
            query: text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            results: CachedResults {
                vector_results: response.vector_results.clone(),
                graph_results: response.graph_results.clone(),
                temporal_results: response.temporal_results.clone(),
            },
        };
        if let Ok(json) = serde_json::to_string(&cached) {
            best_effort(
                self.cache.set(&keys::query_cache(text), &json, Some(ttl)).await,
                "query_cache",
            );
        }

        best_effort(
            self.cache
                .incr(&keys::query_hash(text), keys::QUERY_HASH_TTL_SECS)
                .await
                .map(|_| ()),
            "query_hash",
        );

        let mut history: Vec<HistoryEntry> = match self.cache.get(keys::QUERY_HISTORY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_default(),
            _ => Vec::new(),
        };
        history.push(HistoryEntry {
            query: text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });
        if history.len() > keys::QUERY_HISTORY_CAP {
            let excess = history.len() - keys::QUERY_HISTORY_CAP;
            history.drain(0..excess);
        }
        if let Ok(json) = serde_json::to_string(&history) {
            best_effort(
                self.cache
                    .set(keys::QUERY_HISTORY, &json, Some(keys::QUERY_HISTORY_TTL_SECS))
                    .await,
                "query_history",
            );
        }
    }

    /// Best-effort background prefetch of related documents
    fn launch_prefetch(&self, response: &QueryResponse) {
        let ids: Vec<String> = response
            .vector_results
            .iter()
            .map(|h| h.id.clone())
            .chain(response.graph_results.iter().map(|n| n.id.clone()))
            .filter(|id| !id.is_empty())
            .take(PREFETCH_RESULT_LIMIT)
            .collect();
        if ids.is_empty() {
            return;
        }

        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            for id in ids {
                let Ok(Some(json)) = cache.get(&keys::doc_entities(&id)).await else {
                    continue;
                };
                let Ok(tokens) = serde_json::from_str::<Vec<String>>(&json) else {
                    continue;
                };
                for token in tokens {
                    let Ok(Some(doc_json)) = cache.get(&keys::entity_docs(&token)).await else {
                        continue;
                    };
                    let Ok(related) = serde_json::from_str::<Vec<String>>(&doc_json) else {
                        continue;
                    };
                    for related_id in related {
                        if related_id == id {
                            continue;
                        }
                        let _ = cache
                            .set(&keys::prefetch(&related_id), "1", Some(keys::PREFETCH_TTL_SECS))
                            .await;
                    }
                }
            }
        });
    }

    // ========================================================================
    // get / delete
    // ========================================================================

    /// Fetch one document by ID, trying the vector store then the cache
    pub async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        if let Some(record) = self.vector.get(id).await? {
            return Ok(Some(record));
        }

        if let Ok(Some(content)) = self.cache.get(&keys::doc(id)).await {
            return Ok(Some(VectorRecord {
                id: id.to_string(),
                content,
                metadata: DocMetadata::default(),
            }));
        }

        Ok(None)
    }

    /// Delete one document from every store
    ///
    /// With `preserve_connections`, a node holding any incident edge
    /// blocks the deletion without mutating anything.
    pub async fn delete(&self, id: &str, preserve_connections: bool) -> DeleteOutcome {
        let mut errors = Vec::new();

        if preserve_connections {
            // Best-effort probe; an unreachable graph does not block
            let connections = self
                .graph
                .get_node_relationships(id)
                .await
                .map(|rels| rels.len())
                .unwrap_or(0);
            if connections > 0 {
                return DeleteOutcome {
                    status: DeleteStatus::Blocked,
                    id: id.to_string(),
                    connections,
                    errors,
                };
            }
        }

        let vector_ok = match self.vector.delete(id).await {
            Ok(()) => true,
            Err(e) => {
                errors.push(format!("vector: {}", e));
                false
            }
        };
        let graph_ok = match self.graph.delete_node(id).await {
            Ok(()) => true,
            Err(e) => {
                errors.push(format!("graph: {}", e));
                false
            }
        };

        best_effort(self.cache.delete(&keys::doc(id)).await, "doc");
        best_effort(self.cache.delete(&keys::doc_entities(id)).await, "doc_entities");
        best_effort(self.cache.delete(&keys::keywords(id)).await, "keywords");
        best_effort(self.cache.delete(&keys::recent_preview(id)).await, "recent");

        self.append_audit(DeletionAudit {
            deleted_at: Utc::now().to_rfc3339(),
            action: "delete",
            id: Some(id),
            vector_deleted: None,
            graph_deleted: None,
        })
        .await;

        let status = match (vector_ok, graph_ok) {
            (true, true) => DeleteStatus::Success,
            (false, false) => DeleteStatus::Failed,
            _ => DeleteStatus::Partial,
        };

        DeleteOutcome {
            status,
            id: id.to_string(),
            connections: 0,
            errors,
        }
    }

    /// Truncate everything. Refuses without explicit confirmation.
    pub async fn delete_all(&self, confirm: bool) -> Result<DeleteAllOutcome> {
        if !confirm {
            return Err(StoreError::ConfirmationRequired("delete-all"));
        }

        let mut errors = Vec::new();

        let vector_deleted = match self.vector.delete_all().await {
            Ok(count) => count,
            Err(e) => {
                errors.push(format!("vector: {}", e));
                0
            }
        };
        let graph_deleted = match self.graph.delete_all().await {
            Ok(count) => count,
            Err(e) => {
                errors.push(format!("graph: {}", e));
                0
            }
        };
        best_effort(self.cache.flush_all().await, "flush");

        info!(
            "delete-all removed {} vector points, {} graph nodes",
            vector_deleted, graph_deleted
        );

        self.append_audit(DeletionAudit {
            deleted_at: Utc::now().to_rfc3339(),
            action: "delete_all",
            id: None,
            vector_deleted: Some(vector_deleted),
            graph_deleted: Some(graph_deleted),
        })
        .await;

        Ok(DeleteAllOutcome {
            vector_deleted,
            graph_deleted,
            errors,
        })
    }

    async fn append_audit(&self, audit: DeletionAudit<'_>) {
        let Some(ref path) = self.deletions_log else {
            return;
        };
        let Ok(line) = serde_json::to_string(&audit) else {
            return;
        };

        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let result = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await;
        match result {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                let _ = file.write_all(format!("{}\n", line).as_bytes()).await;
            }
            Err(e) => warn!("Failed to append deletion audit: {}", e),
        }
    }

    // ========================================================================
    // count / stats / sync / warmup
    // ========================================================================

    pub async fn count(&self) -> Result<u64> {
        self.vector.count().await
    }

    /// Per-backend health
    pub async fn health(&self) -> HealthReport {
        let (vector, graph, cache) = tokio::join!(
            self.vector.health(),
            self.graph.health_check(),
            self.cache.health()
        );
        HealthReport {
            vector,
            graph,
            cache,
        }
    }

    pub async fn stats(&self) -> StatsReport {
        let vector_count = self.vector.count().await.unwrap_or(0);
        let graph = self.graph.get_stats().await;
        let health = self.health().await;

        StatsReport {
            vector_count,
            graph,
            health,
            embedding_provider: self.embedder.provider_kind().to_string(),
            embedding_dimension: self.embedder.dimension(),
        }
    }

    /// Fast reconciliation: insert a graph node for every vector ID
    /// missing one. The full fixpoint lives in the consolidation engine.
    pub async fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let records = match self.vector.scroll(SCROLL_LIMIT).await {
            Ok(records) => records,
            Err(e) => {
                report.errors.push(format!("vector: {}", e));
                return report;
            }
        };
        report.checked = records.len();

        let graph_ids: std::collections::HashSet<String> =
            match self.graph.get_all_nodes(SCROLL_LIMIT).await {
                Ok(nodes) => nodes.into_iter().map(|n| n.id).collect(),
                Err(e) => {
                    report.errors.push(format!("graph: {}", e));
                    return report;
                }
            };

        for record in records {
            if graph_ids.contains(&record.id) {
                continue;
            }
            let labels = graph_labels(&record.metadata);
            match self
                .graph
                .add_node(&record.id, &record.content, &record.metadata, &labels)
                .await
            {
                Ok(()) => report.added += 1,
                Err(e) => report.errors.push(format!("{}: {}", record.id, e)),
            }
        }

        info!("sync checked {} documents, added {}", report.checked, report.added);
        report
    }

    /// Run the canned warm-up queries and pin their results at the
    /// longer warm-up TTL
    pub async fn warmup(&self) -> usize {
        let mut warmed = 0;
        for query in WARMUP_QUERIES {
            let response = self.query_stores(query, 5).await;
            self.record_query(query, &response, keys::WARMUP_TTL_SECS).await;
            warmed += 1;
        }
        info!("Warmed {} canned queries", warmed);
        warmed
    }
}

/// The `" | "`-joined text handed to the embedding provider
fn embedding_context(content: &str, metadata: &DocMetadata) -> String {
    let mut sections = vec![content.to_string()];

    if !metadata.keywords.is_empty() {
        sections.push(
            metadata
                .keywords
                .iter()
                .take(CONTEXT_KEYWORDS)
                .cloned()
                .collect::<Vec<_>>()
                .join(" "),
        );
    }

    let entities: Vec<String> = metadata.entities.all().take(CONTEXT_ENTITIES).cloned().collect();
    if !entities.is_empty() {
        sections.push(entities.join(" "));
    }

    if let Some(language) = metadata.language {
        sections.push(
            serde_json::to_value(language)
                .ok()
                .and_then(|v| v.as_str().map(|s| s.to_string()))
                .unwrap_or_default(),
        );
    }

    sections.retain(|s| !s.is_empty());
    sections.join(" | ")
}

/// Metadata labels plus up to three entity-class labels
fn graph_labels(metadata: &DocMetadata) -> Vec<String> {
    let mut labels = metadata.graph_labels();
    let mut push = |label: &str| {
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    };
    if !metadata.entities.people.is_empty() {
        push("Person");
    }
    if !metadata.entities.organizations.is_empty() {
        push("Org");
    }
    if !metadata.entities.locations.is_empty() {
        push("Location");
    }
    labels
}

/// Swallow a cache error, logging at debug
fn best_effort(result: Result<()>, what: &str) {
    if let Err(e) = result {
        debug!("Cache write '{}' failed (ignored): {}", what, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::DeterministicProvider;
    use crate::memory::{InMemoryCache, InMemoryGraph, InMemoryVectorIndex};
    use mnemo_core::metadata::EntityMentions;

    fn store() -> MemoryStore {
        MemoryStore::new(
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(InMemoryGraph::new()),
            Arc::new(InMemoryCache::new()),
            Arc::new(DeterministicProvider::new(64)),
        )
    }

    #[test]
    fn test_embedding_context_shape() {
        let metadata = DocMetadata {
            keywords: vec!["paris".into(), "capital".into()],
            entities: EntityMentions {
                people: vec!["Ada Lovelace".into()],
                ..Default::default()
            },
            language: Some(mnemo_core::Language::En),
            ..Default::default()
        };
        let context = embedding_context("Paris is the capital", &metadata);
        assert_eq!(context, "Paris is the capital | paris capital | Ada Lovelace | en");
    }

    #[test]
    fn test_embedding_context_plain() {
        let context = embedding_context("just text", &DocMetadata::default());
        assert_eq!(context, "just text");
    }

    #[test]
    fn test_graph_labels_include_entity_classes() {
        let metadata = DocMetadata {
            entities: EntityMentions {
                people: vec!["Ada".into()],
                organizations: vec!["Acme Inc".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let labels = graph_labels(&metadata);
        assert_eq!(labels, vec!["Document", "Person", "Org"]);
    }

    #[tokio::test]
    async fn test_add_reports_full_status() {
        let store = store();
        let outcome = store.add("Paris is the capital of France", DocMetadata::default()).await;
        assert_eq!(outcome.status, AddStatus::Full);
        assert!(outcome.id.is_some());
        assert!(outcome.errors.is_empty());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_then_query_finds_document() {
        let store = store();
        store.add("Paris is the capital of France", DocMetadata::default()).await;

        let response = store.query("Paris is the capital of France", 3, false).await;
        assert!(!response.cache_hit);
        assert!(!response.vector_results.is_empty());
        assert!(response.vector_results[0].content.contains("Paris"));
        // The graph arm matches on substring too
        assert!(!response.graph_results.is_empty());
    }

    #[tokio::test]
    async fn test_query_cache_round_trip() {
        let store = store();
        store.add("cached content here", DocMetadata::default()).await;

        let first = store.query("cached content", 3, true).await;
        assert!(!first.cache_hit);

        let second = store.query("cached content", 3, true).await;
        assert!(second.cache_hit);
        assert_eq!(
            serde_json::to_value(&first.vector_results).unwrap(),
            serde_json::to_value(&second.vector_results).unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_totality() {
        let store = store();
        let outcome = store.add("delete me soon", DocMetadata::default()).await;
        let id = outcome.id.unwrap();

        let deleted = store.delete(&id, false).await;
        assert_eq!(deleted.status, DeleteStatus::Success);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.graph().get_node(&id).await.unwrap().is_none());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_connections() {
        let store = store();
        let a = store.add("first of a pair", DocMetadata::default()).await.id.unwrap();
        let b = store.add("second of a pair", DocMetadata::default()).await.id.unwrap();
        store
            .graph()
            .add_relationship(&a, &b, "SIMILAR_TO", &[])
            .await
            .unwrap();

        let blocked = store.delete(&a, true).await;
        assert_eq!(blocked.status, DeleteStatus::Blocked);
        assert_eq!(blocked.connections, 1);
        // Nothing was mutated
        assert_eq!(store.count().await.unwrap(), 2);

        let forced = store.delete(&a, false).await;
        assert_eq!(forced.status, DeleteStatus::Success);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_requires_confirmation() {
        let store = store();
        store.add("content", DocMetadata::default()).await;

        assert!(store.delete_all(false).await.is_err());
        assert_eq!(store.count().await.unwrap(), 1);

        let outcome = store.delete_all(true).await.unwrap();
        assert_eq!(outcome.vector_deleted, 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sync_fills_graph_gaps() {
        let store = store();
        // Insert into the vector store only, bypassing the coordinator
        store
            .vector()
            .add("orphan-id", vec![0.1; 64], "orphan content", &DocMetadata::default())
            .await
            .unwrap();

        let report = store.sync().await;
        assert_eq!(report.checked, 1);
        assert_eq!(report.added, 1);
        assert!(store.graph().get_node("orphan-id").await.unwrap().is_some());

        // Second pass has nothing to do
        let report = store.sync().await;
        assert_eq!(report.added, 0);
    }

    #[tokio::test]
    async fn test_deletion_audit_written() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs/deletions.jsonl");

        let store = MemoryStore::new(
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(InMemoryGraph::new()),
            Arc::new(InMemoryCache::new()),
            Arc::new(DeterministicProvider::new(16)),
        )
        .with_deletions_log(&log);

        let id = store.add("audited", DocMetadata::default()).await.id.unwrap();
        store.delete(&id, false).await;

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("\"action\":\"delete\""));
        assert!(content.contains(&id));
    }

    #[tokio::test]
    async fn test_warmup_pins_queries() {
        let store = store();
        let warmed = store.warmup().await;
        assert_eq!(warmed, 5);

        // Warmed queries now hit the cache
        let response = store.query("recent notes", 5, true).await;
        assert!(response.cache_hit);
    }
}
