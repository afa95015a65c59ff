//! Consolidation engine integration tests
//!
//! Run against the in-memory backends with deterministic embeddings, so
//! every property holds without external services.

use std::sync::Arc;

use mnemo_consolidate::Consolidator;
use mnemo_core::DocMetadata;
use mnemo_store::{
    DeleteStatus, DeterministicProvider, InMemoryCache, InMemoryGraph, InMemoryVectorIndex,
    MemoryStore,
};

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(
        Arc::new(InMemoryVectorIndex::new()),
        Arc::new(InMemoryGraph::new()),
        Arc::new(InMemoryCache::new()),
        Arc::new(DeterministicProvider::new(64)),
    ))
}

fn meta(doc_type: &str) -> DocMetadata {
    let mut m = DocMetadata {
        source: Some("test".to_string()),
        ..Default::default()
    };
    m.set_doc_type(doc_type);
    m
}

/// Stored documents excluding the insight document consolidation writes
async fn content_docs(store: &MemoryStore) -> Vec<String> {
    store
        .vector()
        .scroll(1000)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.metadata.doc_type() != Some("insight"))
        .map(|r| r.content)
        .collect()
}

#[tokio::test]
async fn exact_duplicates_are_removed() {
    let store = store();
    store.add("hello world", meta("fact")).await;
    store.add("hello world", meta("fact")).await;
    assert_eq!(store.count().await.unwrap(), 2);

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let report = consolidator.consolidate(false).await;

    assert!(report.duplicates_removed >= 1, "report: {:?}", report);
    assert_eq!(content_docs(&store).await.len(), 1);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn exact_duplicates_ignore_case_and_whitespace() {
    let store = store();
    store.add("Hello World", meta("fact")).await;
    store.add("  hello world  ", meta("fact")).await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let report = consolidator.consolidate(false).await;

    assert!(report.duplicates_removed >= 1);
    assert_eq!(content_docs(&store).await.len(), 1);
}

#[tokio::test]
async fn fuzzy_duplicates_are_removed() {
    let store = store();
    store.add("Fox jumps over the lazy dog.", meta("fact")).await;
    store.add("Fox jumps over the lazy dog!", meta("fact")).await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let report = consolidator.consolidate(false).await;

    assert!(
        report.duplicates_removed + report.fuzzy_duplicates_removed >= 1,
        "report: {:?}",
        report
    );
    assert_eq!(content_docs(&store).await.len(), 1);
}

#[tokio::test]
async fn malformed_documents_are_purged() {
    let store = store();
    store.add("ok", meta("fact")).await; // below the 10-char floor
    store
        .add("This one is long enough to survive the purge.", meta("fact"))
        .await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let report = consolidator.consolidate(false).await;

    assert!(report.malformed_removed >= 1);
    let remaining = store.vector().scroll(100).await.unwrap();
    assert!(remaining.iter().all(|r| r.content.len() >= 10));
}

#[tokio::test]
async fn consolidation_is_idempotent() {
    let store = store();
    store.add("hello world", meta("fact")).await;
    store.add("hello world", meta("fact")).await;
    store
        .add("Ada Lovelace worked with Acme Inc on project Apollo.", meta("fact"))
        .await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let first = consolidator.consolidate(false).await;
    assert!(first.total_mutations() > 0);

    let second = consolidator.consolidate(false).await;
    assert_eq!(second.total_mutations(), 0, "second run: {:?}", second);
    assert!(!second.insight_saved);
}

#[tokio::test]
async fn entities_get_nodes_and_mentions() {
    let store = store();
    let a = store
        .add("Ada Lovelace consulted for Acme Inc last spring.", meta("note"))
        .await
        .id
        .unwrap();
    store
        .add("The contract with Acme Inc was renewed by Grace Hopper.", meta("note"))
        .await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let report = consolidator.consolidate(false).await;

    assert!(report.entities_extracted >= 2);
    assert!(report.mentions_created >= 2);

    let rels = store.graph().get_node_relationships(&a).await.unwrap();
    assert!(rels.iter().any(|r| r.rel_type == "MENTIONS"));
}

#[tokio::test]
async fn blocked_delete_after_consolidation() {
    let store = store();
    let a = store
        .add("Acme Inc shipped the widget to Berlin.", meta("note"))
        .await
        .id
        .unwrap();
    store
        .add("A filing shows Acme Inc expanded again.", meta("note"))
        .await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    consolidator.consolidate(false).await;

    let blocked = store.delete(&a, true).await;
    assert_eq!(blocked.status, DeleteStatus::Blocked);

    let forced = store.delete(&a, false).await;
    assert_eq!(forced.status, DeleteStatus::Success);
    assert!(store.get(&a).await.unwrap().is_none());
}

#[tokio::test]
async fn graph_and_vector_converge() {
    let store = store();
    store.add("First document body, long enough.", meta("note")).await;
    store.add("Second document body, also long enough.", meta("note")).await;

    // Simulate drift: a vector point with no graph node, and a stray
    // graph document node with no vector point
    store
        .vector()
        .add("drift-vec", vec![0.5; 64], "vector only document", &meta("note"))
        .await
        .unwrap();
    store
        .graph()
        .add_node("drift-graph", "graph only document", &meta("note"), &["Document".into()])
        .await
        .unwrap();

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let report = consolidator.consolidate(false).await;

    assert!(report.reconciliation.converged, "report: {:?}", report);
    // The stray graph node is gone (orphan cleanup or reconciliation)
    assert!(store.graph().get_node("drift-graph").await.unwrap().is_none());

    // ID unity: every vector ID now has a graph node
    let records = store.vector().scroll(100).await.unwrap();
    assert!(!records.is_empty());
    for record in records {
        assert!(
            store.graph().get_node(&record.id).await.unwrap().is_some(),
            "missing graph node for {}",
            record.id
        );
    }
}

#[tokio::test]
async fn orphan_count_is_monotonic() {
    let store = store();
    store.add("Document one for the orphan check.", meta("note")).await;
    store.add("Document two for the orphan check.", meta("note")).await;

    let before = store.graph().get_orphaned_nodes().await.unwrap();

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    consolidator.consolidate(false).await;

    let after = store.graph().get_orphaned_nodes().await.unwrap();
    assert!(after <= before, "orphans grew from {} to {}", before, after);
}

#[tokio::test]
async fn insight_document_is_written_once() {
    let store = store();
    store
        .add("Kubernetes rollout strategies and deployment design notes.", meta("note"))
        .await;
    store
        .add("Comparing ingress controllers for the platform migration.", meta("note"))
        .await;

    let mut consolidator = Consolidator::new(Arc::clone(&store));
    let first = consolidator.consolidate(false).await;
    assert!(first.insight_saved);

    let insights: Vec<_> = store
        .vector()
        .scroll(100)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.metadata.doc_type() == Some("insight"))
        .collect();
    assert_eq!(insights.len(), 1);
    assert!(insights[0].content.starts_with("# Insights Generados"));

    let second = consolidator.consolidate(false).await;
    assert!(!second.insight_saved);
}

#[tokio::test]
async fn analyze_reports_health() {
    let store = store();
    store.add("A good document with enough substance here.", meta("note")).await;
    store.add("", meta("note")).await;

    let consolidator = Consolidator::new(Arc::clone(&store));
    let analysis = consolidator.analyze().await;

    assert_eq!(analysis.total_documents, 2);
    assert_eq!(analysis.issues.empty_content.count, 1);
    assert!(analysis.quality_metrics.health_score < 100.0);
    assert!(!analysis.recommendations.is_empty());
}
