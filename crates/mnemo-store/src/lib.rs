//! mnemo-store: the tri-store coordinator and its backends
//!
//! One document, three stores: a Qdrant point for similarity search, a
//! FalkorDB node for structure, and Redis entries for hot state. The
//! [`MemoryStore`] coordinator owns the cross-store ID and the public
//! add/query/delete surface; backends are capability traits injected at
//! construction, with in-memory implementations for offline use.

pub mod cache;
pub mod coordinator;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod memory;
pub mod traits;
pub mod types;
pub mod vector;

pub use cache::{keys, RedisCache, RedisCacheConfig};
pub use coordinator::MemoryStore;
pub use embeddings::{
    create_provider, fallback_embedding, DeterministicProvider, EmbeddingProvider, OpenAiConfig,
    OpenAiProvider, ProviderKind,
};
pub use error::{Result, StoreError};
pub use graph::{escape_cypher_string, sanitize_for_graph, FalkorConfig, FalkorGraph};
pub use memory::{InMemoryCache, InMemoryGraph, InMemoryVectorIndex};
pub use traits::{CacheStore, GraphIndex, TemporalIndex, VectorIndex};
pub use types::{
    AddOutcome, AddStatus, DeleteAllOutcome, DeleteOutcome, DeleteStatus, EntityLinkReport,
    GraphNodeRow, GraphRelationship, GraphStats, HealthReport, QueryResponse, StatsReport,
    SyncReport, VectorHit, VectorRecord,
};
pub use vector::{QdrantConfig, QdrantIndex};
