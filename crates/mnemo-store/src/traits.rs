//! Capability traits for the three backends
//!
//! The coordinator talks to dense vectors, the property graph and the
//! key-value cache exclusively through these traits; concrete providers
//! are injected at construction. Implementations must be `Send + Sync`
//! and safe for concurrent callers.

use async_trait::async_trait;
use mnemo_core::DocMetadata;

use crate::error::Result;
use crate::types::{
    EntityLinkReport, GraphNodeRow, GraphRelationship, GraphStats, VectorHit, VectorRecord,
};

/// Dense similarity index over fixed-dimension embeddings
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if missing, with cosine metric
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Insert a point under the caller-chosen ID
    async fn add(
        &self,
        id: &str,
        embedding: Vec<f32>,
        content: &str,
        metadata: &DocMetadata,
    ) -> Result<()>;

    /// Top-`limit` by cosine similarity, optionally floored at `min_score`
    async fn search(
        &self,
        embedding: Vec<f32>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<VectorHit>>;

    /// Fetch one point by ID; `None` when absent
    async fn get(&self, id: &str) -> Result<Option<VectorRecord>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Truncate the collection, returning the count from before
    async fn delete_all(&self) -> Result<u64>;

    async fn count(&self) -> Result<u64>;

    /// List up to `limit` points without scoring
    async fn scroll(&self, limit: usize) -> Result<Vec<VectorRecord>>;

    async fn health(&self) -> bool;
}

/// Property graph of documents and extracted entities
#[async_trait]
pub trait GraphIndex: Send + Sync {
    /// Upsert a document node keyed on `id`. Content is sanitised for
    /// graph storage by the implementation; binary content becomes a
    /// placeholder.
    async fn add_node(
        &self,
        id: &str,
        content: &str,
        metadata: &DocMetadata,
        labels: &[String],
    ) -> Result<()>;

    /// Idempotent on (from, to, rel_type)
    async fn add_relationship(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        properties: &[(String, String)],
    ) -> Result<()>;

    async fn get_node(&self, id: &str) -> Result<Option<GraphNodeRow>>;

    /// All incident relationships, both directions
    async fn get_node_relationships(&self, id: &str) -> Result<Vec<GraphRelationship>>;

    /// Substring match on content or source properties
    async fn search_nodes(&self, text: &str, limit: usize) -> Result<Vec<GraphNodeRow>>;

    async fn get_all_nodes(&self, limit: usize) -> Result<Vec<GraphNodeRow>>;

    async fn get_stats(&self) -> GraphStats;

    /// Count of nodes with no incident edges
    async fn get_orphaned_nodes(&self) -> Result<i64>;

    /// Nodes with no incident edges, up to `limit`
    async fn list_orphaned_nodes(&self, limit: i64) -> Result<Vec<GraphNodeRow>>;

    /// Delete up to `limit` edge-less nodes, returning how many went
    async fn delete_orphaned_nodes(&self, limit: i64) -> Result<i64>;

    /// Upsert an entity node keyed on (kind label, lowercase name)
    async fn upsert_entity(
        &self,
        kind: &str,
        name: &str,
        document_count: u64,
        last_updated: &str,
    ) -> Result<()>;

    /// Create a `MENTIONS` edge from a document to an entity
    async fn create_mention(&self, doc_id: &str, kind: &str, name: &str) -> Result<()>;

    /// Densify with keyword-intersection `SIMILAR_TO` edges
    async fn create_entity_links(&self, threshold: f64) -> Result<EntityLinkReport>;

    /// `DETACH DELETE` one node
    async fn delete_node(&self, id: &str) -> Result<()>;

    /// Detach-delete every node, returning the count from before
    async fn delete_all(&self) -> Result<i64>;

    async fn health_check(&self) -> bool;
}

/// Key-value cache with TTLs and a sorted-set window
///
/// Every caller treats writes as best-effort; the engine stays correct
/// with an empty cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value with an optional TTL in seconds
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Add to a sorted set with the given score
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Members by descending score, `start..=stop` ranks
    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// Trim a sorted set to its `max` highest-scored members
    async fn ztrim_to(&self, key: &str, max: usize) -> Result<()>;

    /// Increment a counter, refreshing its TTL
    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<i64>;

    /// Drop everything
    async fn flush_all(&self) -> Result<()>;

    async fn health(&self) -> bool;
}

/// Optional temporal collaborator consulted during query fan-out.
/// Skipped silently when absent or unhealthy.
#[async_trait]
pub trait TemporalIndex: Send + Sync {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<serde_json::Value>>;

    async fn health(&self) -> bool;
}
