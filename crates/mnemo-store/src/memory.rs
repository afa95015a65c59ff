//! In-memory backend implementations
//!
//! Drop-in `VectorIndex` / `GraphIndex` / `CacheStore` backends with no
//! external services. Used for offline operation, local development and
//! the integration tests; paired with the deterministic embedding
//! provider they make the whole engine runnable in-process.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mnemo_core::{extract_keywords, DocMetadata};

use crate::error::Result;
use crate::traits::{CacheStore, GraphIndex, VectorIndex};
use crate::types::{
    EntityLinkReport, GraphNodeRow, GraphRelationship, GraphStats, VectorHit, VectorRecord,
};

// ============================================================================
// Vector index
// ============================================================================

#[derive(Debug, Clone)]
struct StoredPoint {
    id: String,
    embedding: Vec<f32>,
    content: String,
    metadata: DocMetadata,
}

/// In-memory vector index with exact cosine search
#[derive(Default)]
pub struct InMemoryVectorIndex {
    points: Mutex<Vec<StoredPoint>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn add(
        &self,
        id: &str,
        embedding: Vec<f32>,
        content: &str,
        metadata: &DocMetadata,
    ) -> Result<()> {
        let mut points = self.points.lock().expect("lock");
        points.retain(|p| p.id != id);
        points.push(StoredPoint {
            id: id.to_string(),
            embedding,
            content: content.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }

    async fn search(
        &self,
        embedding: Vec<f32>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<VectorHit>> {
        let points = self.points.lock().expect("lock");
        let mut hits: Vec<VectorHit> = points
            .iter()
            .map(|p| VectorHit {
                id: p.id.clone(),
                score: cosine(&embedding, &p.embedding),
                content: p.content.clone(),
                metadata: p.metadata.clone(),
            })
            .filter(|h| min_score.map(|m| h.score >= m).unwrap_or(true))
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let points = self.points.lock().expect("lock");
        Ok(points.iter().find(|p| p.id == id).map(|p| VectorRecord {
            id: p.id.clone(),
            content: p.content.clone(),
            metadata: p.metadata.clone(),
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.points.lock().expect("lock").retain(|p| p.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut points = self.points.lock().expect("lock");
        let before = points.len() as u64;
        points.clear();
        Ok(before)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.points.lock().expect("lock").len() as u64)
    }

    async fn scroll(&self, limit: usize) -> Result<Vec<VectorRecord>> {
        let points = self.points.lock().expect("lock");
        Ok(points
            .iter()
            .take(limit)
            .map(|p| VectorRecord {
                id: p.id.clone(),
                content: p.content.clone(),
                metadata: p.metadata.clone(),
            })
            .collect())
    }

    async fn health(&self) -> bool {
        true
    }
}

// ============================================================================
// Graph index
// ============================================================================

#[derive(Debug, Clone)]
struct StoredNode {
    content: String,
    source: Option<String>,
    doc_type: Option<String>,
    labels: Vec<String>,
    keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoredEdge {
    from: String,
    to: String,
    rel_type: String,
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<String, StoredNode>,
    edges: Vec<StoredEdge>,
}

/// In-memory property graph
#[derive(Default)]
pub struct InMemoryGraph {
    state: Mutex<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal node key for an entity
    fn entity_key(kind: &str, name: &str) -> String {
        format!("entity:{}:{}", kind, name.to_lowercase())
    }
}

#[async_trait]
impl GraphIndex for InMemoryGraph {
    async fn add_node(
        &self,
        id: &str,
        content: &str,
        metadata: &DocMetadata,
        labels: &[String],
    ) -> Result<()> {
        let keywords = if !metadata.keywords.is_empty() {
            metadata.keywords.iter().take(10).cloned().collect()
        } else {
            extract_keywords(content, 10)
        };

        let mut state = self.state.lock().expect("lock");
        state.nodes.insert(
            id.to_string(),
            StoredNode {
                content: content.chars().take(500).collect(),
                source: metadata.source.clone(),
                doc_type: metadata.doc_type().map(|t| t.to_string()),
                labels: if labels.is_empty() {
                    vec!["Document".to_string()]
                } else {
                    labels.to_vec()
                },
                keywords,
            },
        );
        Ok(())
    }

    async fn add_relationship(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        _properties: &[(String, String)],
    ) -> Result<()> {
        let edge = StoredEdge {
            from: from_id.to_string(),
            to: to_id.to_string(),
            rel_type: rel_type.to_string(),
        };
        let mut state = self.state.lock().expect("lock");
        if !state.nodes.contains_key(from_id) || !state.nodes.contains_key(to_id) {
            return Ok(());
        }
        if !state.edges.contains(&edge) {
            state.edges.push(edge);
        }
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNodeRow>> {
        let state = self.state.lock().expect("lock");
        Ok(state.nodes.get(id).map(|n| GraphNodeRow {
            id: id.to_string(),
            content: n.content.clone(),
            source: n.source.clone(),
            doc_type: n.doc_type.clone(),
            labels: n.labels.clone(),
        }))
    }

    async fn get_node_relationships(&self, id: &str) -> Result<Vec<GraphRelationship>> {
        let state = self.state.lock().expect("lock");
        Ok(state
            .edges
            .iter()
            .filter_map(|e| {
                if e.from == id {
                    Some(GraphRelationship {
                        rel_type: e.rel_type.clone(),
                        other_id: e.to.clone(),
                        outgoing: true,
                    })
                } else if e.to == id {
                    Some(GraphRelationship {
                        rel_type: e.rel_type.clone(),
                        other_id: e.from.clone(),
                        outgoing: false,
                    })
                } else {
                    None
                }
            })
            .collect())
    }

    async fn search_nodes(&self, text: &str, limit: usize) -> Result<Vec<GraphNodeRow>> {
        let state = self.state.lock().expect("lock");
        Ok(state
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.content.contains(text)
                    || n.source.as_deref().map(|s| s.contains(text)).unwrap_or(false)
            })
            .take(limit)
            .map(|(id, n)| GraphNodeRow {
                id: id.clone(),
                content: n.content.clone(),
                source: n.source.clone(),
                doc_type: n.doc_type.clone(),
                labels: n.labels.clone(),
            })
            .collect())
    }

    async fn get_all_nodes(&self, limit: usize) -> Result<Vec<GraphNodeRow>> {
        let state = self.state.lock().expect("lock");
        Ok(state
            .nodes
            .iter()
            .take(limit)
            .map(|(id, n)| GraphNodeRow {
                id: id.clone(),
                content: n.content.clone(),
                source: n.source.clone(),
                doc_type: n.doc_type.clone(),
                labels: n.labels.clone(),
            })
            .collect())
    }

    async fn get_stats(&self) -> GraphStats {
        let state = self.state.lock().expect("lock");
        let mut labels: Vec<String> = state
            .nodes
            .values()
            .flat_map(|n| n.labels.iter().cloned())
            .collect();
        labels.sort();
        labels.dedup();

        let mut relationship_types: Vec<String> =
            state.edges.iter().map(|e| e.rel_type.clone()).collect();
        relationship_types.sort();
        relationship_types.dedup();

        GraphStats {
            total_nodes: state.nodes.len() as i64,
            total_relations: state.edges.len() as i64,
            labels,
            relationship_types,
            connected: true,
            error: None,
        }
    }

    async fn get_orphaned_nodes(&self) -> Result<i64> {
        let state = self.state.lock().expect("lock");
        let count = state
            .nodes
            .keys()
            .filter(|id| !state.edges.iter().any(|e| &e.from == *id || &e.to == *id))
            .count();
        Ok(count as i64)
    }

    async fn list_orphaned_nodes(&self, limit: i64) -> Result<Vec<GraphNodeRow>> {
        let state = self.state.lock().expect("lock");
        Ok(state
            .nodes
            .iter()
            .filter(|(id, _)| !state.edges.iter().any(|e| &e.from == *id || &e.to == *id))
            .take(limit.max(0) as usize)
            .map(|(id, n)| GraphNodeRow {
                id: id.clone(),
                content: n.content.clone(),
                source: n.source.clone(),
                doc_type: n.doc_type.clone(),
                labels: n.labels.clone(),
            })
            .collect())
    }

    async fn delete_orphaned_nodes(&self, limit: i64) -> Result<i64> {
        let mut state = self.state.lock().expect("lock");
        let orphans: Vec<String> = state
            .nodes
            .keys()
            .filter(|id| !state.edges.iter().any(|e| &e.from == *id || &e.to == *id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        for id in &orphans {
            state.nodes.remove(id);
        }
        Ok(orphans.len() as i64)
    }

    async fn upsert_entity(
        &self,
        kind: &str,
        name: &str,
        _document_count: u64,
        _last_updated: &str,
    ) -> Result<()> {
        let key = Self::entity_key(kind, name);
        let mut state = self.state.lock().expect("lock");
        state.nodes.entry(key).or_insert(StoredNode {
            content: name.to_string(),
            source: None,
            doc_type: Some("entity".to_string()),
            labels: vec![kind.to_string()],
            keywords: Vec::new(),
        });
        Ok(())
    }

    async fn create_mention(&self, doc_id: &str, kind: &str, name: &str) -> Result<()> {
        let key = Self::entity_key(kind, name);
        self.add_relationship(doc_id, &key, "MENTIONS", &[]).await
    }

    async fn create_entity_links(&self, threshold: f64) -> Result<EntityLinkReport> {
        let nodes: Vec<(String, Vec<String>)> = {
            let state = self.state.lock().expect("lock");
            state
                .nodes
                .iter()
                .filter(|(_, n)| !n.keywords.is_empty())
                .map(|(id, n)| (id.clone(), n.keywords.clone()))
                .collect()
        };

        let mut created = 0;
        for (i, (id_a, kws_a)) in nodes.iter().enumerate() {
            for (id_b, kws_b) in nodes.iter().skip(i + 1) {
                let intersection = kws_a.iter().filter(|k| kws_b.contains(k)).count();
                if intersection == 0 {
                    continue;
                }
                let weight = intersection as f64 / kws_a.len().min(kws_b.len()) as f64;
                if weight < threshold {
                    continue;
                }
                self.add_relationship(id_a, id_b, "SIMILAR_TO", &[]).await?;
                created += 1;
            }
        }

        Ok(EntityLinkReport {
            created,
            total_nodes: nodes.len(),
        })
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.nodes.remove(id);
        state.edges.retain(|e| e.from != id && e.to != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<i64> {
        let mut state = self.state.lock().expect("lock");
        let before = state.nodes.len() as i64;
        state.nodes.clear();
        state.edges.clear();
        Ok(before)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Default)]
struct CacheState {
    values: HashMap<String, (String, Option<Instant>)>,
    sorted_sets: HashMap<String, Vec<(f64, String)>>,
}

/// In-memory cache with TTL support
#[derive(Default)]
pub struct InMemoryCache {
    state: Mutex<CacheState>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn expired(expiry: &Option<Instant>) -> bool {
    expiry.map(|at| Instant::now() >= at).unwrap_or(false)
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().expect("lock");
        match state.values.get(key) {
            Some((_, expiry)) if expired(expiry) => {
                state.values.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let expiry = ttl_secs.map(|s| Instant::now() + Duration::from_secs(s));
        self.state
            .lock()
            .expect("lock")
            .values
            .insert(key.to_string(), (value.to_string(), expiry));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.values.remove(key);
        state.sorted_sets.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let state = self.state.lock().expect("lock");
        let prefix = pattern.trim_end_matches('*');
        Ok(state
            .values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        let set = state.sorted_sets.entry(key.to_string()).or_default();
        set.retain(|(_, m)| m != member);
        set.push((score, member.to_string()));
        set.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(())
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let state = self.state.lock().expect("lock");
        let Some(set) = state.sorted_sets.get(key) else {
            return Ok(Vec::new());
        };
        let descending: Vec<String> = set.iter().rev().map(|(_, m)| m.clone()).collect();
        let len = descending.len() as isize;
        let resolve = |i: isize| -> usize {
            if i < 0 {
                (len + i).max(0) as usize
            } else {
                i.min(len) as usize
            }
        };
        let from = resolve(start);
        let to = (resolve(stop) + 1).min(descending.len());
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(descending[from..to].to_vec())
    }

    async fn ztrim_to(&self, key: &str, max: usize) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        if let Some(set) = state.sorted_sets.get_mut(key) {
            let len = set.len();
            if len > max {
                set.drain(0..len - max);
            }
        }
        Ok(())
    }

    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<i64> {
        let mut state = self.state.lock().expect("lock");
        let expiry = Some(Instant::now() + Duration::from_secs(ttl_secs));
        let entry = state
            .values
            .entry(key.to_string())
            .or_insert(("0".to_string(), expiry));
        let next = entry.0.parse::<i64>().unwrap_or(0) + 1;
        *entry = (next.to_string(), expiry);
        Ok(next)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.values.clear();
        state.sorted_sets.clear();
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_vector_add_search_delete() {
        let index = InMemoryVectorIndex::new();
        index
            .add("a", vec![1.0, 0.0], "first", &DocMetadata::default())
            .await
            .unwrap();
        index
            .add("b", vec![0.0, 1.0], "second", &DocMetadata::default())
            .await
            .unwrap();

        let hits = index.search(vec![1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].score > hits[1].score);

        index.delete("a").await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_vector_min_score_filters() {
        let index = InMemoryVectorIndex::new();
        index
            .add("a", vec![1.0, 0.0], "x", &DocMetadata::default())
            .await
            .unwrap();
        let hits = index.search(vec![0.0, 1.0], 5, Some(0.5)).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_graph_relationships_both_directions() {
        let graph = InMemoryGraph::new();
        let meta = DocMetadata::default();
        graph.add_node("a", "alpha", &meta, &[]).await.unwrap();
        graph.add_node("b", "beta", &meta, &[]).await.unwrap();
        graph
            .add_relationship("a", "b", "SIMILAR_TO", &[])
            .await
            .unwrap();

        let rels_a = graph.get_node_relationships("a").await.unwrap();
        let rels_b = graph.get_node_relationships("b").await.unwrap();
        assert_eq!(rels_a.len(), 1);
        assert!(rels_a[0].outgoing);
        assert_eq!(rels_b.len(), 1);
        assert!(!rels_b[0].outgoing);
    }

    #[tokio::test]
    async fn test_graph_orphan_cleanup() {
        let graph = InMemoryGraph::new();
        let meta = DocMetadata::default();
        graph.add_node("a", "alpha", &meta, &[]).await.unwrap();
        graph.add_node("b", "beta", &meta, &[]).await.unwrap();
        graph.add_node("c", "gamma", &meta, &[]).await.unwrap();
        graph
            .add_relationship("a", "b", "SIMILAR_TO", &[])
            .await
            .unwrap();

        assert_eq!(graph.get_orphaned_nodes().await.unwrap(), 1);
        assert_eq!(graph.delete_orphaned_nodes(10).await.unwrap(), 1);
        assert_eq!(graph.get_orphaned_nodes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_graph_mention_requires_entity() {
        let graph = InMemoryGraph::new();
        let meta = DocMetadata::default();
        graph.add_node("d", "doc", &meta, &[]).await.unwrap();
        graph
            .upsert_entity("Company", "Acme Inc", 1, "2024-01-01")
            .await
            .unwrap();
        graph.create_mention("d", "Company", "Acme Inc").await.unwrap();

        let rels = graph.get_node_relationships("d").await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, "MENTIONS");
    }

    #[tokio::test]
    async fn test_cache_ttl_zero_means_instant_expiry() {
        let cache = InMemoryCache::new();
        cache.set("k", "v", Some(0)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_cache_sorted_set_window() {
        let cache = InMemoryCache::new();
        for i in 0..5 {
            cache.zadd("recent", &format!("doc-{}", i), i as f64).await.unwrap();
        }
        cache.ztrim_to("recent", 3).await.unwrap();

        let top = cache.zrevrange("recent", 0, -1).await.unwrap();
        assert_eq!(top, vec!["doc-4", "doc-3", "doc-2"]);
    }

    #[tokio::test]
    async fn test_cache_incr() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.incr("hits", 60).await.unwrap(), 1);
        assert_eq!(cache.incr("hits", 60).await.unwrap(), 2);
    }
}
