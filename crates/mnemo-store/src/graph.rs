//! FalkorDB-backed property graph
//!
//! FalkorDB speaks the Redis protocol, so queries go out as
//! `GRAPH.QUERY <name> <cypher>` over a pooled connection manager.
//! The graph is not a general binary store: every string parameter
//! passes through a single-pass escaper at this boundary, stored
//! content is truncated and stripped of control and non-ASCII
//! characters, and binary content becomes a placeholder.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use mnemo_core::{extract_keywords, is_binary_content, DocMetadata};
use redis::aio::ConnectionManager;
use redis::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::traits::GraphIndex;
use crate::types::{EntityLinkReport, GraphNodeRow, GraphRelationship, GraphStats};

/// Stored node content is clipped to this many characters
const CONTENT_PREVIEW_LIMIT: usize = 500;

/// Placeholder stored when content fails the binary heuristic
const BINARY_PLACEHOLDER: &str = "[Binary content - not stored in graph]";

/// Keywords stored per node for link densification
const NODE_KEYWORD_LIMIT: usize = 10;

/// Nodes sampled when densifying entity links
const ENTITY_LINK_NODE_LIMIT: usize = 500;

/// Configuration for connecting to FalkorDB
#[derive(Debug, Clone)]
pub struct FalkorConfig {
    /// Redis-protocol URL (e.g., "redis://localhost:6370")
    pub url: String,
    /// Graph name queries execute against
    pub graph_name: String,
}

impl Default for FalkorConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6370".to_string(),
            graph_name: "default".to_string(),
        }
    }
}

/// FalkorDB client implementing [`GraphIndex`]
pub struct FalkorGraph {
    conn: ConnectionManager,
    graph_name: String,
}

impl FalkorGraph {
    /// Connect to FalkorDB and probe with PING
    pub async fn connect(config: FalkorConfig) -> Result<Self> {
        info!("Connecting to FalkorDB at {}", config.url);

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(format!("Invalid FalkorDB URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to FalkorDB: {}", e)))?;

        let graph = Self {
            conn,
            graph_name: config.graph_name,
        };

        if !graph.health_check().await {
            return Err(StoreError::Connection(
                "FalkorDB did not answer PING".to_string(),
            ));
        }

        info!("Successfully connected to FalkorDB");
        Ok(graph)
    }

    /// Execute a Cypher query and return rows as column→string maps
    pub async fn execute(&self, query: &str) -> Result<Vec<HashMap<String, String>>> {
        debug!("GRAPH.QUERY {}: {}", self.graph_name, query);

        let mut conn = self.conn.clone();
        let value: Value = redis::cmd("GRAPH.QUERY")
            .arg(&self.graph_name)
            .arg(query)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Graph(e.to_string()))?;

        Ok(parse_graph_reply(value))
    }
}

/// Escape a string for inclusion in a single-quoted Cypher literal
///
/// Single pass: backslash, both quote kinds, newline and carriage
/// return. Applied to every caller-supplied string at this boundary.
pub fn escape_cypher_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Clip content for node storage: first 500 chars, control characters
/// to space, non-ASCII to `?`
pub fn sanitize_for_graph(content: &str) -> String {
    content
        .chars()
        .take(CONTENT_PREVIEW_LIMIT)
        .map(|c| {
            let code = c as u32;
            if code < 32 && code != 9 && code != 10 && code != 13 {
                ' '
            } else if code > 127 {
                '?'
            } else {
                c
            }
        })
        .collect()
}

/// Render any reply cell as a display string
fn value_to_string(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::BulkString(bytes) => String::from_utf8_lossy(bytes).to_string(),
        Value::SimpleString(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

/// Parse a GRAPH.QUERY reply: `[header, rows, stats]`
///
/// Header entries may be plain strings or `[type, name]` pairs
/// depending on protocol mode; both are handled.
fn parse_graph_reply(value: Value) -> Vec<HashMap<String, String>> {
    let Value::Array(mut sections) = value else {
        return Vec::new();
    };
    if sections.len() < 2 {
        return Vec::new();
    }

    let rows_value = sections.remove(1);
    let header_value = sections.remove(0);

    let Value::Array(header_items) = header_value else {
        return Vec::new();
    };
    let columns: Vec<String> = header_items
        .iter()
        .map(|item| match item {
            Value::Array(parts) => parts.last().map(value_to_string).unwrap_or_default(),
            other => value_to_string(other),
        })
        .collect();

    let Value::Array(rows) = rows_value else {
        return Vec::new();
    };

    rows.into_iter()
        .filter_map(|row| {
            let Value::Array(cells) = row else {
                return None;
            };
            Some(
                columns
                    .iter()
                    .cloned()
                    .zip(cells.iter().map(value_to_string))
                    .collect::<HashMap<String, String>>(),
            )
        })
        .collect()
}

fn row_to_node(row: &HashMap<String, String>) -> GraphNodeRow {
    GraphNodeRow {
        id: row.get("id").cloned().unwrap_or_default(),
        content: row.get("content").cloned().unwrap_or_default(),
        source: row.get("source").cloned().filter(|s| !s.is_empty()),
        doc_type: row.get("type").cloned().filter(|s| !s.is_empty()),
        labels: row
            .get("labels")
            .map(|s| {
                s.split(',')
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_string())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn count_from(rows: &[HashMap<String, String>], column: &str) -> i64 {
    rows.first()
        .and_then(|r| r.get(column))
        .and_then(|c| c.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl GraphIndex for FalkorGraph {
    async fn add_node(
        &self,
        id: &str,
        content: &str,
        metadata: &DocMetadata,
        labels: &[String],
    ) -> Result<()> {
        let preview = if is_binary_content(content) {
            BINARY_PLACEHOLDER.to_string()
        } else {
            sanitize_for_graph(content)
        };

        let label_str = if labels.is_empty() {
            "Document".to_string()
        } else {
            labels
                .iter()
                .map(|l| escape_label(l))
                .collect::<Vec<_>>()
                .join(":")
        };

        let keywords = if is_binary_content(content) {
            Vec::new()
        } else if !metadata.keywords.is_empty() {
            metadata.keywords.iter().take(NODE_KEYWORD_LIMIT).cloned().collect()
        } else {
            extract_keywords(content, NODE_KEYWORD_LIMIT)
        };

        // Upsert keyed on id; property changes merge into the
        // existing node instead of duplicating it
        let query = format!(
            "MERGE (n:{label} {{id: '{id}'}}) \
             SET n.content = '{content}', n.source = '{source}', n.type = '{doc_type}', \
                 n.created_at = '{created}', n.keywords = '{keywords}'",
            label = label_str,
            id = escape_cypher_string(id),
            content = escape_cypher_string(&preview),
            source = escape_cypher_string(metadata.source.as_deref().unwrap_or("unknown")),
            doc_type = escape_cypher_string(metadata.doc_type().unwrap_or("document")),
            created = escape_cypher_string(metadata.created_at.as_deref().unwrap_or("")),
            keywords = escape_cypher_string(&keywords.join(",")),
        );

        self.execute(&query).await?;
        Ok(())
    }

    async fn add_relationship(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        properties: &[(String, String)],
    ) -> Result<()> {
        let set_clause = if properties.is_empty() {
            String::new()
        } else {
            let assignments: Vec<String> = properties
                .iter()
                .map(|(k, v)| format!("r.{} = '{}'", escape_label(k), escape_cypher_string(v)))
                .collect();
            format!(" SET {}", assignments.join(", "))
        };

        let query = format!(
            "MATCH (a {{id: '{from}'}}), (b {{id: '{to}'}}) \
             MERGE (a)-[r:{rel}]->(b){set}",
            from = escape_cypher_string(from_id),
            to = escape_cypher_string(to_id),
            rel = escape_label(rel_type),
            set = set_clause,
        );

        self.execute(&query).await?;
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNodeRow>> {
        let query = format!(
            "MATCH (n {{id: '{id}'}}) \
             RETURN n.id as id, n.content as content, n.source as source, \
                    n.type as type, labels(n) as labels",
            id = escape_cypher_string(id),
        );
        let rows = self.execute(&query).await?;
        Ok(rows.first().map(row_to_node))
    }

    async fn get_node_relationships(&self, id: &str) -> Result<Vec<GraphRelationship>> {
        let escaped = escape_cypher_string(id);

        let outgoing = format!(
            "MATCH (n {{id: '{escaped}'}})-[r]->(m) RETURN type(r) as type, m.id as other",
        );
        let incoming = format!(
            "MATCH (n {{id: '{escaped}'}})<-[r]-(m) RETURN type(r) as type, m.id as other",
        );

        let mut relationships = Vec::new();
        for row in self.execute(&outgoing).await? {
            relationships.push(GraphRelationship {
                rel_type: row.get("type").cloned().unwrap_or_default(),
                other_id: row.get("other").cloned().unwrap_or_default(),
                outgoing: true,
            });
        }
        for row in self.execute(&incoming).await? {
            relationships.push(GraphRelationship {
                rel_type: row.get("type").cloned().unwrap_or_default(),
                other_id: row.get("other").cloned().unwrap_or_default(),
                outgoing: false,
            });
        }

        Ok(relationships)
    }

    async fn search_nodes(&self, text: &str, limit: usize) -> Result<Vec<GraphNodeRow>> {
        let escaped = escape_cypher_string(text);
        let query = format!(
            "MATCH (n) \
             WHERE n.content CONTAINS '{escaped}' OR n.source CONTAINS '{escaped}' \
             RETURN n.id as id, n.content as content, n.source as source, n.type as type \
             LIMIT {limit}",
        );
        let rows = self.execute(&query).await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    async fn get_all_nodes(&self, limit: usize) -> Result<Vec<GraphNodeRow>> {
        let query = format!(
            "MATCH (n) \
             RETURN n.id as id, n.content as content, n.source as source, \
                    n.type as type, labels(n) as labels \
             LIMIT {limit}",
        );
        let rows = self.execute(&query).await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    async fn get_stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();

        let nodes = match self.execute("MATCH (n) RETURN count(n) as count").await {
            Ok(rows) => count_from(&rows, "count"),
            Err(e) => {
                stats.error = Some(e.to_string());
                return stats;
            }
        };
        stats.total_nodes = nodes;

        if let Ok(rows) = self.execute("MATCH ()-[r]->() RETURN count(r) as count").await {
            stats.total_relations = count_from(&rows, "count");
        }
        if let Ok(rows) = self.execute("CALL db.labels()").await {
            stats.labels = rows
                .iter()
                .filter_map(|r| r.get("label").cloned())
                .filter(|l| !l.is_empty())
                .collect();
        }
        if let Ok(rows) = self.execute("CALL db.relationshipTypes()").await {
            stats.relationship_types = rows
                .iter()
                .filter_map(|r| r.get("relationshipType").cloned())
                .filter(|t| !t.is_empty())
                .collect();
        }

        stats.connected = true;
        stats
    }

    async fn get_orphaned_nodes(&self) -> Result<i64> {
        let rows = self
            .execute(
                "MATCH (n) WHERE NOT (n)-[]->() AND NOT ()-[]->(n) \
                 RETURN count(n) as count",
            )
            .await?;
        Ok(count_from(&rows, "count"))
    }

    async fn list_orphaned_nodes(&self, limit: i64) -> Result<Vec<GraphNodeRow>> {
        let rows = self
            .execute(&format!(
                "MATCH (n) WHERE NOT (n)-[]->() AND NOT ()-[]->(n) \
                 RETURN n.id as id, n.content as content, n.source as source, \
                        n.type as type, labels(n) as labels \
                 LIMIT {limit}",
            ))
            .await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    async fn delete_orphaned_nodes(&self, limit: i64) -> Result<i64> {
        let rows = self
            .execute(&format!(
                "MATCH (n) WHERE NOT (n)-[]->() AND NOT ()-[]->(n) \
                 WITH n LIMIT {limit} \
                 DETACH DELETE n \
                 RETURN count(n) as count",
            ))
            .await?;
        Ok(count_from(&rows, "count"))
    }

    async fn upsert_entity(
        &self,
        kind: &str,
        name: &str,
        document_count: u64,
        last_updated: &str,
    ) -> Result<()> {
        // Uniqueness key is (kind, lowercase name); the as-written form
        // is kept as display_name. Entity nodes carry a synthetic id so
        // reconciliation can address them like any other node.
        let kind = escape_label(kind);
        let key = escape_cypher_string(&name.to_lowercase());
        let query = format!(
            "MERGE (e:{kind} {{name: '{key}'}}) \
             SET e.id = 'entity:{kind}:{key}', e.display_name = '{display}', \
                 e.document_count = {count}, e.last_updated = '{updated}'",
            display = escape_cypher_string(name),
            count = document_count,
            updated = escape_cypher_string(last_updated),
        );
        self.execute(&query).await?;
        Ok(())
    }

    async fn create_mention(&self, doc_id: &str, kind: &str, name: &str) -> Result<()> {
        let query = format!(
            "MATCH (d {{id: '{doc}'}}), (e:{kind} {{name: '{name}'}}) \
             MERGE (d)-[:MENTIONS]->(e)",
            doc = escape_cypher_string(doc_id),
            kind = escape_label(kind),
            name = escape_cypher_string(&name.to_lowercase()),
        );
        self.execute(&query).await?;
        Ok(())
    }

    async fn create_entity_links(&self, threshold: f64) -> Result<EntityLinkReport> {
        let query = format!(
            "MATCH (n) WHERE n.keywords IS NOT NULL \
             RETURN n.id as id, n.keywords as keywords LIMIT {ENTITY_LINK_NODE_LIMIT}",
        );
        let rows = self.execute(&query).await?;

        let nodes: Vec<(String, HashSet<String>)> = rows
            .iter()
            .filter_map(|row| {
                let id = row.get("id")?.clone();
                if id.is_empty() {
                    return None;
                }
                let keywords: HashSet<String> = row
                    .get("keywords")?
                    .split(',')
                    .filter(|k| !k.is_empty())
                    .map(|k| k.to_string())
                    .collect();
                Some((id, keywords))
            })
            .collect();

        if nodes.len() < 2 {
            return Ok(EntityLinkReport {
                created: 0,
                total_nodes: nodes.len(),
            });
        }

        let mut created = 0;
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();

        for (i, (id_a, kws_a)) in nodes.iter().enumerate() {
            if kws_a.is_empty() {
                continue;
            }
            for (id_b, kws_b) in nodes.iter().skip(i + 1) {
                if kws_b.is_empty() {
                    continue;
                }
                let intersection = kws_a.intersection(kws_b).count();
                if intersection == 0 {
                    continue;
                }
                let weight = intersection as f64 / kws_a.len().min(kws_b.len()) as f64;
                if weight < threshold {
                    continue;
                }

                let pair = if id_a < id_b {
                    (id_a.clone(), id_b.clone())
                } else {
                    (id_b.clone(), id_a.clone())
                };
                if !seen_pairs.insert(pair) {
                    continue;
                }

                let props = vec![("weight".to_string(), format!("{:.2}", weight))];
                if self
                    .add_relationship(id_a, id_b, "SIMILAR_TO", &props)
                    .await
                    .is_ok()
                {
                    created += 1;
                }
            }
        }

        Ok(EntityLinkReport {
            created,
            total_nodes: nodes.len(),
        })
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let query = format!(
            "MATCH (n {{id: '{id}'}}) DETACH DELETE n",
            id = escape_cypher_string(id),
        );
        self.execute(&query).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<i64> {
        let before = self.get_stats().await.total_nodes;
        self.execute("MATCH (n) DETACH DELETE n").await?;
        Ok(before)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: std::result::Result<String, redis::RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => true,
            Err(e) => {
                warn!("FalkorDB health check failed: {}", e);
                false
            }
        }
    }
}

/// Labels and relationship types allow word characters only
fn escape_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_cypher_string() {
        assert_eq!(escape_cypher_string("plain"), "plain");
        assert_eq!(escape_cypher_string("it's"), "it\\'s");
        assert_eq!(escape_cypher_string("a\"b"), "a\\\"b");
        assert_eq!(escape_cypher_string("back\\slash"), "back\\\\slash");
        assert_eq!(escape_cypher_string("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_cypher_string("strip\rcr"), "stripcr");
    }

    #[test]
    fn test_escape_blocks_injection() {
        let hostile = "x'}) DETACH DELETE (n) //";
        let escaped = escape_cypher_string(hostile);
        assert!(!escaped.contains("'}"));
    }

    #[test]
    fn test_sanitize_for_graph() {
        assert_eq!(sanitize_for_graph("clean text"), "clean text");
        assert_eq!(sanitize_for_graph("a\u{1}b"), "a b");
        assert_eq!(sanitize_for_graph("caf\u{e9}"), "caf?");

        let long = "x".repeat(600);
        assert_eq!(sanitize_for_graph(&long).len(), 500);
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("Document"), "Document");
        assert_eq!(escape_label("SIMILAR_TO"), "SIMILAR_TO");
        assert_eq!(escape_label("bad`label"), "badlabel");
    }

    #[test]
    fn test_parse_graph_reply_rows() {
        let reply = Value::Array(vec![
            Value::Array(vec![
                Value::BulkString(b"id".to_vec()),
                Value::BulkString(b"count".to_vec()),
            ]),
            Value::Array(vec![Value::Array(vec![
                Value::BulkString(b"doc-1".to_vec()),
                Value::Int(7),
            ])]),
            Value::Array(vec![]),
        ]);

        let rows = parse_graph_reply(reply);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id").unwrap(), "doc-1");
        assert_eq!(rows[0].get("count").unwrap(), "7");
    }

    #[test]
    fn test_parse_graph_reply_compact_header() {
        // Compact protocol wraps each column as [type, name]
        let reply = Value::Array(vec![
            Value::Array(vec![Value::Array(vec![
                Value::Int(1),
                Value::BulkString(b"label".to_vec()),
            ])]),
            Value::Array(vec![Value::Array(vec![Value::BulkString(
                b"Document".to_vec(),
            )])]),
            Value::Array(vec![]),
        ]);

        let rows = parse_graph_reply(reply);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("label").unwrap(), "Document");
    }

    #[test]
    fn test_parse_graph_reply_list_cell_joins() {
        let reply = Value::Array(vec![
            Value::Array(vec![Value::BulkString(b"labels".to_vec())]),
            Value::Array(vec![Value::Array(vec![Value::Array(vec![
                Value::BulkString(b"Document".to_vec()),
                Value::BulkString(b"Person".to_vec()),
            ])])]),
            Value::Array(vec![]),
        ]);

        let rows = parse_graph_reply(reply);
        assert_eq!(rows[0].get("labels").unwrap(), "Document,Person");
    }

    #[test]
    fn test_parse_graph_reply_malformed() {
        assert!(parse_graph_reply(Value::Nil).is_empty());
        assert!(parse_graph_reply(Value::Array(vec![Value::Nil])).is_empty());
    }

    #[test]
    fn test_row_to_node_splits_labels() {
        let mut row = HashMap::new();
        row.insert("id".to_string(), "d1".to_string());
        row.insert("content".to_string(), "text".to_string());
        row.insert("labels".to_string(), "Document,Person".to_string());

        let node = row_to_node(&row);
        assert_eq!(node.id, "d1");
        assert_eq!(node.labels, vec!["Document", "Person"]);
        assert!(node.source.is_none());
    }
}
