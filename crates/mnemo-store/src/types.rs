//! Shared result types for the tri-store

use mnemo_core::DocMetadata;
use serde::{Deserialize, Serialize};

/// A stored vector point with its payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub metadata: DocMetadata,
}

/// A ranked vector search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity, 0.0 to 1.0
    pub score: f32,
    pub content: String,
    pub metadata: DocMetadata,
}

/// A row returned from a graph lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphNodeRow {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// A relationship incident to a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub rel_type: String,
    /// The node on the other end
    pub other_id: String,
    /// True when the edge points away from the queried node
    pub outgoing: bool,
}

/// Aggregate graph statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: i64,
    pub total_relations: i64,
    pub labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of entity-link densification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityLinkReport {
    pub created: usize,
    pub total_nodes: usize,
}

/// Per-store outcome of an `add`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddStatus {
    /// Vector and graph both succeeded
    Full,
    /// Exactly one of vector/graph succeeded
    Partial,
    Failed,
}

/// Result of adding a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOutcome {
    pub status: AddStatus,
    /// The cross-store document ID (set whenever any store accepted it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub vector_ok: bool,
    pub graph_ok: bool,
    /// Per-store errors; never aborts the overall operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Outcome of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    Success,
    /// `preserve_connections` was set and the node has incident edges
    Blocked,
    Partial,
    Failed,
}

/// Result of deleting a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub status: DeleteStatus,
    pub id: String,
    /// Incident edge count observed at check time
    pub connections: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Result of a destructive delete-all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAllOutcome {
    /// Vector points present before truncation
    pub vector_deleted: u64,
    /// Graph nodes present before truncation
    pub graph_deleted: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Merged response of a query fan-out, per-source attribution preserved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub cache_hit: bool,
    pub vector_results: Vec<VectorHit>,
    pub graph_results: Vec<GraphNodeRow>,
    /// Temporal collaborator results, present only when that arm ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub temporal_results: Vec<serde_json::Value>,
}

/// Result of the fast vector→graph reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub checked: usize,
    pub added: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Per-backend health of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub vector: bool,
    pub graph: bool,
    pub cache: bool,
}

/// Engine statistics for `stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub vector_count: u64,
    pub graph: GraphStats,
    pub health: HealthReport,
    pub embedding_provider: String,
    pub embedding_dimension: usize,
}
