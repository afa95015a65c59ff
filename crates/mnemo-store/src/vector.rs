//! Qdrant-backed vector index
//!
//! One fixed collection per process, cosine metric, UUID point IDs
//! chosen by the coordinator and reused across the graph and cache.
//! Payload layout is `{content, metadata}`.

use std::collections::HashMap;

use async_trait::async_trait;
use mnemo_core::DocMetadata;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, points_selector::PointsSelectorOneOf, vectors_config::Config,
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder,
    PointId, PointStruct, PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParams, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::traits::VectorIndex;
use crate::types::{VectorHit, VectorRecord};

/// Configuration for connecting to Qdrant
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Qdrant server URL (e.g., "http://localhost:6334")
    pub url: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Collection name, fixed per process
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "mnemo".to_string(),
        }
    }
}

/// Qdrant client wrapper implementing [`VectorIndex`]
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    /// Connect to Qdrant and probe the connection
    pub async fn connect(config: QdrantConfig) -> Result<Self> {
        info!("Connecting to Qdrant at {}", config.url);

        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        let client = builder.build().map_err(|e| {
            StoreError::Connection(format!("Failed to build Qdrant client: {}", e))
        })?;

        client
            .list_collections()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Qdrant: {}", e)))?;

        info!("Successfully connected to Qdrant");

        Ok(Self {
            client,
            collection: config.collection,
        })
    }

    fn point_to_record(
        id: Option<PointId>,
        payload: HashMap<String, qdrant_client::qdrant::Value>,
    ) -> Option<VectorRecord> {
        let id = point_id_string(id?)?;
        let (content, metadata) = split_payload(payload);
        Some(VectorRecord {
            id,
            content,
            metadata,
        })
    }
}

/// Render a point ID as the string the rest of the engine uses
fn point_id_string(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Uuid(u) => Some(u),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}

/// Pull `{content, metadata}` out of a raw payload map
fn split_payload(
    payload: HashMap<String, qdrant_client::qdrant::Value>,
) -> (String, DocMetadata) {
    let mut content = String::new();
    let mut metadata = DocMetadata::default();

    for (key, value) in payload {
        let value = qdrant_value_to_json(value);
        match key.as_str() {
            "content" => {
                if let Some(s) = value.as_str() {
                    content = s.to_string();
                }
            }
            "metadata" => {
                if let Ok(parsed) = serde_json::from_value::<DocMetadata>(value) {
                    metadata = parsed;
                }
            }
            _ => {}
        }
    }

    (content, metadata)
}

/// Convert a protobuf payload value into JSON
fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind;

    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::DoubleValue(d)) => json!(d),
        Some(Kind::IntegerValue(i)) => json!(i),
        Some(Kind::StringValue(s)) => json!(s),
        Some(Kind::BoolValue(b)) => json!(b),
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
        Some(Kind::ListValue(l)) => serde_json::Value::Array(
            l.values.into_iter().map(qdrant_value_to_json).collect(),
        ),
    }
}

fn ids_selector(id: &str) -> PointsSelectorOneOf {
    PointsSelectorOneOf::Points(PointsIdsList {
        ids: vec![id.to_string().into()],
    })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            return Ok(());
        }

        info!(
            "Creating collection '{}' (dim={}, distance=Cosine)",
            self.collection, dimension
        );

        let vectors_config = VectorsConfig {
            config: Some(Config::Params(VectorParams {
                size: dimension as u64,
                distance: Distance::Cosine.into(),
                ..Default::default()
            })),
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;

        Ok(())
    }

    async fn add(
        &self,
        id: &str,
        embedding: Vec<f32>,
        content: &str,
        metadata: &DocMetadata,
    ) -> Result<()> {
        let payload = Payload::try_from(json!({
            "content": content,
            "metadata": serde_json::to_value(metadata)?,
        }))
        .map_err(|e| StoreError::Qdrant(format!("Failed to build payload: {}", e)))?;

        let point = PointStruct::new(id.to_string(), embedding, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await?;

        debug!("Upserted point {} into '{}'", id, self.collection);
        Ok(())
    }

    async fn search(
        &self,
        embedding: Vec<f32>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<VectorHit>> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, embedding, limit as u64).with_payload(true);
        if let Some(threshold) = min_score {
            builder = builder.score_threshold(threshold);
        }

        let response = self.client.search_points(builder).await?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| {
                let score = point.score;
                let record = QdrantIndex::point_to_record(point.id, point.payload)?;
                Some(VectorHit {
                    id: record.id,
                    score,
                    content: record.content,
                    metadata: record.metadata,
                })
            })
            .collect();

        Ok(hits)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![id.to_string().into()])
                    .with_payload(true),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .next()
            .and_then(|point| QdrantIndex::point_to_record(point.id, point.payload)))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(ids_selector(id))
                    .wait(true),
            )
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let before = self.count().await.unwrap_or(0);

        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting collection '{}'", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }

        Ok(before)
    }

    async fn count(&self) -> Result<u64> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn scroll(&self, limit: usize) -> Result<Vec<VectorRecord>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| QdrantIndex::point_to_record(point.id, point.payload))
            .collect())
    }

    async fn health(&self) -> bool {
        match self.client.list_collections().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = QdrantConfig::default();
        assert_eq!(config.url, "http://localhost:6334");
        assert_eq!(config.collection, "mnemo");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_point_id_string_uuid() {
        let id = PointId {
            point_id_options: Some(PointIdOptions::Uuid("abc-def".to_string())),
        };
        assert_eq!(point_id_string(id), Some("abc-def".to_string()));
    }

    #[test]
    fn test_point_id_string_num() {
        let id = PointId {
            point_id_options: Some(PointIdOptions::Num(42)),
        };
        assert_eq!(point_id_string(id), Some("42".to_string()));
    }
}
