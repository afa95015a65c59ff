//! Command implementations

pub mod agent;
pub mod code_index;
pub mod memory;
pub mod schedule;

use std::sync::Arc;

use anyhow::{Context, Result};
use mnemo_config::{EmbeddingProviderType, MnemoConfig};
use mnemo_store::{
    create_provider, FalkorConfig, FalkorGraph, InMemoryCache, InMemoryGraph, InMemoryVectorIndex,
    MemoryStore, ProviderKind, QdrantConfig, QdrantIndex, RedisCache, RedisCacheConfig,
};

use crate::state::StateDir;

/// Shared command context: configuration, state dir, and a lazily
/// connected store
pub struct App {
    pub config: MnemoConfig,
    pub state: StateDir,
    /// Use in-memory backends instead of connecting anywhere
    pub offline: bool,
}

impl App {
    /// Connect the tri-store according to configuration
    pub async fn connect(&self) -> Result<Arc<MemoryStore>> {
        let embedder = match (self.offline, self.config.embedding.provider) {
            (true, _) | (_, EmbeddingProviderType::Deterministic) => create_provider(
                ProviderKind::Deterministic,
                "",
                None,
                "",
                self.config.embedding.dimension,
            ),
            (false, EmbeddingProviderType::Openai) => create_provider(
                ProviderKind::Openai,
                &self.config.embedding.base_url,
                self.config.embedding.api_key(),
                &self.config.embedding.model,
                self.config.embedding.dimension,
            ),
        };

        let store = if self.offline {
            MemoryStore::new(
                Arc::new(InMemoryVectorIndex::new()),
                Arc::new(InMemoryGraph::new()),
                Arc::new(InMemoryCache::new()),
                embedder,
            )
        } else {
            let vector = QdrantIndex::connect(QdrantConfig {
                url: self.config.vector.url.clone(),
                api_key: self.config.vector.api_key.clone(),
                collection: self.config.vector.collection.clone(),
            })
            .await
            .context("connecting to Qdrant (is it running? check [vector] in config.toml)")?;

            let graph = FalkorGraph::connect(FalkorConfig {
                url: self.config.graph.url.clone(),
                graph_name: self.config.graph.graph_name.clone(),
            })
            .await
            .context("connecting to FalkorDB (is it running? check [graph] in config.toml)")?;

            let cache = RedisCache::connect(RedisCacheConfig {
                url: self.config.cache.url.clone(),
            })
            .await
            .context("connecting to Redis (is it running? check [cache] in config.toml)")?;

            MemoryStore::new(Arc::new(vector), Arc::new(graph), Arc::new(cache), embedder)
        };

        Ok(Arc::new(
            store.with_deletions_log(self.state.deletions_log()),
        ))
    }
}

/// Print a serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
