//! The consolidation engine
//!
//! Thirteen phases, strictly sequential, each isolated: a failing phase
//! records an error string in the report and the run continues. The
//! engine never throws to the caller and is re-runnable; a second pass
//! over an idle store performs no further corrective mutations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use mnemo_core::{content_hash, extract_graph_entities, full_hash, DocMetadata, GraphEntity};
use mnemo_store::{MemoryStore, Result, VectorRecord};
use tracing::{debug, info, warn};

use crate::analysis::{analyze_documents, MIN_CONTENT_LENGTH};
use crate::dedup::{similarity_ratio, FUZZY_THRESHOLD};
use crate::insights::render_insights;
use crate::report::{ConsolidationReport, MemoryAnalysis, ReconciliationReport};

/// Documents read per scroll; the working-set ceiling
const SCROLL_LIMIT: usize = 10_000;
/// Documents sampled by the semantic duplicate pass
const SEMANTIC_SAMPLE: usize = 200;
/// Cosine floor for semantic duplicates
const SEMANTIC_THRESHOLD: f32 = 0.85;
/// Documents sampled by the fuzzy duplicate pass
const FUZZY_SAMPLE: usize = 200;
/// Documents sampled when building document-document links
const DOC_LINK_SAMPLE: usize = 100;
/// Cosine floor for `SIMILAR_TO` document links
const DOC_LINK_THRESHOLD: f32 = 0.7;
/// `MENTIONS` edges created per entity, bounding fan-out
const MENTION_CAP: usize = 10;
/// Orphaned graph nodes deleted per pass
const ORPHAN_DELETE_LIMIT: i64 = 1000;
/// Iteration bound for the graph/vector fixpoint loop
const FIXPOINT_MAX_ITERATIONS: usize = 5;
/// Keyword-intersection threshold for entity link densification
const ENTITY_LINK_THRESHOLD: f64 = 0.3;

/// What the change-detection phase observed
#[derive(Debug, Default)]
struct ChangeSet {
    changed: usize,
    new_docs: usize,
    resynced: usize,
    /// True when a non-insight document was new or changed
    content_changed: bool,
}

/// The consolidation engine
///
/// Holds the in-process hash map used by change detection; it does not
/// survive a restart, so a fresh engine performs a full resync.
pub struct Consolidator {
    store: Arc<MemoryStore>,
    previous_hashes: HashMap<String, String>,
}

impl Consolidator {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            previous_hashes: HashMap::new(),
        }
    }

    /// Standalone deep analysis without mutations
    pub async fn analyze(&self) -> MemoryAnalysis {
        let records = self.read_all().await.unwrap_or_default();
        let orphans = self.count_true_orphans().await.unwrap_or(0);
        analyze_documents(&records, orphans)
    }

    /// Run the full consolidation pass
    pub async fn consolidate(&mut self, force_full: bool) -> ConsolidationReport {
        let mut report = ConsolidationReport {
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };

        if force_full {
            self.previous_hashes.clear();
        }

        info!("Consolidation started (force_full={})", force_full);

        // Phase 1: deep analysis
        match self.read_all().await {
            Ok(records) => {
                let orphans = self.count_true_orphans().await.unwrap_or(0);
                report.analysis = Some(analyze_documents(&records, orphans));
            }
            Err(e) => report.errors.push(format!("analysis: {}", e)),
        }

        // Phase 2 + 3: change detection and incremental graph sync
        let mut content_changed = false;
        match self.detect_and_sync_changes().await {
            Ok(changes) => {
                report.changed_documents = changes.changed;
                report.new_documents = changes.new_docs;
                report.resynced = changes.resynced;
                content_changed = changes.content_changed;
            }
            Err(e) => report.errors.push(format!("change_detection: {}", e)),
        }

        let mut deleted: HashSet<String> = HashSet::new();

        // Phase 4: exact-duplicate purge
        match self.purge_exact_duplicates(&mut deleted).await {
            Ok(count) => report.duplicates_removed = count,
            Err(e) => report.errors.push(format!("exact_duplicates: {}", e)),
        }

        // Phase 5: semantic-duplicate purge
        match self.purge_semantic_duplicates(&mut deleted).await {
            Ok((removed, sampled)) => {
                report.semantic_duplicates_removed = removed;
                report.semantic_sampled = sampled;
            }
            Err(e) => report.errors.push(format!("semantic_duplicates: {}", e)),
        }

        // Phase 6: fuzzy-duplicate purge
        match self.purge_fuzzy_duplicates(&mut deleted).await {
            Ok(count) => report.fuzzy_duplicates_removed = count,
            Err(e) => report.errors.push(format!("fuzzy_duplicates: {}", e)),
        }

        // Phase 7: malformed purge
        match self.purge_malformed(&mut deleted).await {
            Ok(count) => report.malformed_removed = count,
            Err(e) => report.errors.push(format!("malformed: {}", e)),
        }

        // Phase 8: entity extraction and node creation
        match self.extract_entities().await {
            Ok((entities, mentions)) => {
                report.entities_extracted = entities;
                report.mentions_created = mentions;
            }
            Err(e) => report.errors.push(format!("entities: {}", e)),
        }

        // Phase 9: document-document relationships
        match self.link_similar_documents().await {
            Ok(count) => report.relationships_created = count,
            Err(e) => report.errors.push(format!("doc_links: {}", e)),
        }

        // Phase 10: cross-reference validation
        match self.count_true_orphans().await {
            Ok(orphans) => {
                report.cross_reference.orphaned_nodes = orphans;
                let vector_count = self.store.vector().count().await.unwrap_or(0) as i64;
                let graph_docs = self.graph_document_ids().await.map(|s| s.len()).unwrap_or(0) as i64;
                if vector_count != graph_docs {
                    report.cross_reference.issues.push(format!(
                        "vector has {} documents, graph has {}",
                        vector_count, graph_docs
                    ));
                }
            }
            Err(e) => report.errors.push(format!("cross_reference: {}", e)),
        }

        // Phase 11: orphan cleanup
        match self.purge_true_orphans().await {
            Ok(count) => report.orphans_deleted = count,
            Err(e) => report.errors.push(format!("orphan_cleanup: {}", e)),
        }

        // Phase 12: insight generation. Skipped on a quiet run so a
        // second consolidation of an idle store writes nothing.
        let store_changed = report.total_mutations() > 0 || content_changed;
        match self.save_insights(store_changed).await {
            Ok(saved) => report.insight_saved = saved,
            Err(e) => report.errors.push(format!("insights: {}", e)),
        }

        // Phase 13: full graph reconciliation
        match self.reconcile_graph().await {
            Ok(reconciliation) => report.reconciliation = reconciliation,
            Err(e) => report.errors.push(format!("reconciliation: {}", e)),
        }

        report.finished_at = Utc::now().to_rfc3339();
        info!(
            "Consolidation finished: {} mutations, {} errors",
            report.total_mutations(),
            report.errors.len()
        );
        report
    }

    async fn read_all(&self) -> Result<Vec<VectorRecord>> {
        self.store.vector().scroll(SCROLL_LIMIT).await
    }

    /// Phases 2 + 3: hash every document, diff against the previous
    /// run, upsert graph nodes for the changed set
    async fn detect_and_sync_changes(&mut self) -> Result<ChangeSet> {
        let records = self.read_all().await?;

        let mut current: HashMap<String, String> = HashMap::new();
        let mut changed_ids: Vec<String> = Vec::new();
        let mut changes = ChangeSet::default();

        for record in &records {
            let hash = full_hash(&record.content);
            let is_insight = record.metadata.doc_type() == Some("insight");
            match self.previous_hashes.get(&record.id) {
                None => {
                    changes.new_docs += 1;
                    changes.content_changed |= !is_insight;
                    changed_ids.push(record.id.clone());
                }
                Some(previous) if previous != &hash => {
                    changes.changed += 1;
                    changes.content_changed |= !is_insight;
                    changed_ids.push(record.id.clone());
                }
                Some(_) => {}
            }
            current.insert(record.id.clone(), hash);
        }
        self.previous_hashes = current;

        let by_id: HashMap<&str, &VectorRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();

        for id in &changed_ids {
            if let Some(record) = by_id.get(id.as_str()) {
                let labels = record.metadata.graph_labels();
                if self
                    .store
                    .graph()
                    .add_node(&record.id, &record.content, &record.metadata, &labels)
                    .await
                    .is_ok()
                {
                    changes.resynced += 1;
                }
            }
        }

        debug!(
            "Change detection: {} new, {} changed, {} resynced",
            changes.new_docs, changes.changed, changes.resynced
        );
        Ok(changes)
    }

    /// Phase 4: group by normalised content hash, keep the first
    async fn purge_exact_duplicates(&self, deleted: &mut HashSet<String>) -> Result<usize> {
        let records = self.read_all().await?;

        let mut seen: HashMap<String, String> = HashMap::new();
        let mut removed = 0usize;

        for record in &records {
            let key = full_hash(&record.content.trim().to_lowercase());
            if seen.contains_key(&key) {
                self.store.vector().delete(&record.id).await?;
                deleted.insert(record.id.clone());
                removed += 1;
            } else {
                seen.insert(key, record.id.clone());
            }
        }

        Ok(removed)
    }

    /// Phase 5: re-embed a sample, delete high-cosine neighbours
    async fn purge_semantic_duplicates(
        &self,
        deleted: &mut HashSet<String>,
    ) -> Result<(usize, usize)> {
        let records = self.read_all().await?;
        let sample: Vec<&VectorRecord> = records.iter().take(SEMANTIC_SAMPLE).collect();
        let sampled = sample.len();

        let mut removed = 0usize;
        for record in sample {
            if deleted.contains(&record.id) {
                continue;
            }
            let embedding = self.store.embed_or_fallback(&record.content).await;
            let hits = self
                .store
                .vector()
                .search(embedding, 5, Some(SEMANTIC_THRESHOLD))
                .await?;
            for hit in hits {
                if hit.id == record.id || deleted.contains(&hit.id) {
                    continue;
                }
                self.store.vector().delete(&hit.id).await?;
                deleted.insert(hit.id);
                removed += 1;
            }
        }

        Ok((removed, sampled))
    }

    /// Phase 6: pairwise LCS ratio over a sample, delete the later one
    async fn purge_fuzzy_duplicates(&self, deleted: &mut HashSet<String>) -> Result<usize> {
        let records = self.read_all().await?;
        let sample: Vec<&VectorRecord> = records.iter().take(FUZZY_SAMPLE).collect();

        let mut removed = 0usize;
        for (i, a) in sample.iter().enumerate() {
            if deleted.contains(&a.id) {
                continue;
            }
            for b in sample.iter().skip(i + 1) {
                if deleted.contains(&b.id) {
                    continue;
                }
                let ratio = similarity_ratio(&a.content, &b.content);
                if ratio >= FUZZY_THRESHOLD {
                    debug!(
                        "Fuzzy duplicate ({:.2}): {} ~ {}",
                        ratio, a.id, b.id
                    );
                    self.store.vector().delete(&b.id).await?;
                    deleted.insert(b.id.clone());
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    /// Phase 7: drop empty and below-threshold documents
    async fn purge_malformed(&self, deleted: &mut HashSet<String>) -> Result<usize> {
        let records = self.read_all().await?;

        let mut removed = 0usize;
        for record in &records {
            if deleted.contains(&record.id) {
                continue;
            }
            let trimmed = record.content.trim();
            if trimmed.is_empty() || trimmed.chars().count() < MIN_CONTENT_LENGTH {
                self.store.vector().delete(&record.id).await?;
                deleted.insert(record.id.clone());
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Phase 8: promote Person/Company/Project mentions to graph nodes
    /// with capped `MENTIONS` edges
    async fn extract_entities(&self) -> Result<(usize, usize)> {
        let records = self.read_all().await?;

        // entity key -> (entity, mentioning document ids)
        let mut aggregated: HashMap<String, (GraphEntity, Vec<String>)> = HashMap::new();
        for record in &records {
            for entity in extract_graph_entities(&record.content) {
                let entry = aggregated
                    .entry(entity.key())
                    .or_insert_with(|| (entity, Vec::new()));
                if !entry.1.contains(&record.id) {
                    entry.1.push(record.id.clone());
                }
            }
        }

        let now = Utc::now().to_rfc3339();
        let mut mentions = 0usize;
        let entity_count = aggregated.len();

        for (_, (entity, doc_ids)) in aggregated {
            self.store
                .graph()
                .upsert_entity(
                    entity.kind.label(),
                    &entity.name,
                    doc_ids.len() as u64,
                    &now,
                )
                .await?;

            for doc_id in doc_ids.iter().take(MENTION_CAP) {
                if self
                    .store
                    .graph()
                    .create_mention(doc_id, entity.kind.label(), &entity.name)
                    .await
                    .is_ok()
                {
                    mentions += 1;
                }
            }
        }

        Ok((entity_count, mentions))
    }

    /// Phase 9: `SIMILAR_TO` edges between semantically close documents
    async fn link_similar_documents(&self) -> Result<usize> {
        let records = self.read_all().await?;
        let sample: Vec<&VectorRecord> = records.iter().take(DOC_LINK_SAMPLE).collect();

        let mut created = 0usize;
        let mut linked_pairs: HashSet<(String, String)> = HashSet::new();

        for record in sample {
            // Existing links are not duplicated
            let existing: HashSet<String> = self
                .store
                .graph()
                .get_node_relationships(&record.id)
                .await
                .unwrap_or_default()
                .into_iter()
                .filter(|r| r.rel_type == "SIMILAR_TO")
                .map(|r| r.other_id)
                .collect();

            let embedding = self.store.embed_or_fallback(&record.content).await;
            let hits = self
                .store
                .vector()
                .search(embedding, 5, Some(DOC_LINK_THRESHOLD))
                .await?;

            for hit in hits {
                if hit.id == record.id || existing.contains(&hit.id) {
                    continue;
                }
                let pair = ordered_pair(&record.id, &hit.id);
                if !linked_pairs.insert(pair) {
                    continue;
                }
                let props = vec![("score".to_string(), format!("{:.4}", hit.score))];
                if self
                    .store
                    .graph()
                    .add_relationship(&record.id, &hit.id, "SIMILAR_TO", &props)
                    .await
                    .is_ok()
                {
                    created += 1;
                }
            }
        }

        Ok(created)
    }

    /// Phase 12: write the insight document. Previous insights are
    /// excluded from the aggregation, and nothing is written when the
    /// run saw no changes or an identical document already exists.
    async fn save_insights(&self, store_changed: bool) -> Result<bool> {
        let records = self.read_all().await?;
        let subjects: Vec<VectorRecord> = records
            .iter()
            .filter(|r| r.metadata.doc_type() != Some("insight"))
            .cloned()
            .collect();
        if subjects.is_empty() {
            return Ok(false);
        }

        let has_insight = records.len() > subjects.len();
        if !store_changed && has_insight {
            debug!("Store unchanged, skipping insight generation");
            return Ok(false);
        }

        let graph_stats = self.store.graph().get_stats().await;
        let body = render_insights(&subjects, &graph_stats);
        let body_hash = content_hash(&body);

        let already_saved = records
            .iter()
            .any(|r| r.metadata.content_hash.as_deref() == Some(body_hash.as_str()));
        if already_saved {
            debug!("Insight document unchanged, skipping save");
            return Ok(false);
        }

        let mut metadata = DocMetadata {
            source: Some("consolidator".to_string()),
            ..Default::default()
        };
        metadata.set_doc_type("insight");

        let outcome = self.store.add(&body, metadata).await;
        Ok(outcome.id.is_some())
    }

    /// An orphan is a node with no incident edges AND no vector
    /// counterpart. Edge-less document nodes whose vector twin exists
    /// are not orphans; reconciliation keeps them.
    async fn true_orphans(&self) -> Result<Vec<String>> {
        let vector_ids: HashSet<String> = self
            .read_all()
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        Ok(self
            .store
            .graph()
            .list_orphaned_nodes(ORPHAN_DELETE_LIMIT)
            .await?
            .into_iter()
            .map(|n| n.id)
            .filter(|id| !id.is_empty() && !vector_ids.contains(id))
            .collect())
    }

    async fn count_true_orphans(&self) -> Result<i64> {
        Ok(self.true_orphans().await?.len() as i64)
    }

    /// Phase 11: delete up to the per-pass limit of true orphans
    async fn purge_true_orphans(&self) -> Result<i64> {
        let orphans = self.true_orphans().await?;
        let mut deleted = 0i64;
        for id in orphans {
            if self.store.graph().delete_node(&id).await.is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Graph IDs that belong to documents (entity nodes are excluded)
    async fn graph_document_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .store
            .graph()
            .get_all_nodes(SCROLL_LIMIT)
            .await?
            .into_iter()
            .filter(|n| !n.id.is_empty() && n.labels.iter().any(|l| l == "Document"))
            .map(|n| n.id)
            .collect())
    }

    /// Phase 13: bounded fixpoint between vector and graph ID sets,
    /// then entity-link densification
    async fn reconcile_graph(&self) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::default();

        for iteration in 0..FIXPOINT_MAX_ITERATIONS {
            report.iterations = iteration + 1;

            let records = self.read_all().await?;
            let vector_ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
            let graph_ids = self.graph_document_ids().await?;

            let missing: Vec<&VectorRecord> = records
                .iter()
                .filter(|r| !graph_ids.contains(&r.id))
                .collect();
            let orphans: Vec<&String> = graph_ids
                .iter()
                .filter(|id| !vector_ids.contains(*id))
                .collect();

            if missing.is_empty() && orphans.is_empty() {
                report.converged = true;
                break;
            }

            for id in orphans {
                if self.store.graph().delete_node(id).await.is_ok() {
                    report.orphans_removed += 1;
                }
            }
            for record in missing {
                let labels = record.metadata.graph_labels();
                if self
                    .store
                    .graph()
                    .add_node(&record.id, &record.content, &record.metadata, &labels)
                    .await
                    .is_ok()
                {
                    report.missing_added += 1;
                }
            }
        }

        if !report.converged {
            warn!(
                "Graph reconciliation did not converge after {} iterations",
                FIXPOINT_MAX_ITERATIONS
            );
        }

        let links = self
            .store
            .graph()
            .create_entity_links(ENTITY_LINK_THRESHOLD)
            .await?;
        report.entity_links_created = links.created;

        Ok(report)
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_pair() {
        assert_eq!(ordered_pair("b", "a"), ("a".to_string(), "b".to_string()));
        assert_eq!(ordered_pair("a", "b"), ("a".to_string(), "b".to_string()));
    }
}
