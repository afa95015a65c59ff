//! Insight generation
//!
//! Aggregates source and content-type distributions, graph health and
//! the dominant vocabulary into a markdown document that consolidation
//! writes back into memory with `type=insight`.

use std::collections::HashMap;

use mnemo_store::{GraphStats, VectorRecord};

/// Terms shorter than this are ignored
const TERM_MIN_LEN: usize = 5;
/// Top terms kept in the insight document
const TERM_LIMIT: usize = 20;
/// Documents sampled for term frequency
const TERM_SAMPLE: usize = 100;

/// The stopword set reused from keyword extraction lives in
/// `mnemo_core`; terms are additionally length-filtered here.
fn significant_terms(records: &[VectorRecord]) -> Vec<(String, usize)> {
    let mut frequency: HashMap<String, usize> = HashMap::new();

    for record in records.iter().take(TERM_SAMPLE) {
        // Unique words per document so one chatty document cannot
        // dominate the distribution
        let mut seen = std::collections::HashSet::new();
        for keyword in mnemo_core::extract_keywords(&record.content, usize::MAX) {
            if keyword.chars().count() >= TERM_MIN_LEN && seen.insert(keyword.clone()) {
                *frequency.entry(keyword).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(TERM_LIMIT);
    ranked
}

fn distribution<F>(records: &[VectorRecord], mut key: F) -> Vec<(String, usize)>
where
    F: FnMut(&VectorRecord) -> String,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        *counts.entry(key(record)).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// Render the insight markdown
///
/// Deliberately timestamp-free so identical stores produce identical
/// documents; the write timestamp lives in the metadata.
pub fn render_insights(records: &[VectorRecord], graph_stats: &GraphStats) -> String {
    let mut lines = vec!["# Insights Generados".to_string(), String::new()];

    lines.push(format!("Documentos totales: {}", records.len()));
    lines.push(String::new());

    let sources = distribution(records, |r| {
        r.metadata.source.clone().unwrap_or_else(|| "unknown".to_string())
    });
    if !sources.is_empty() {
        lines.push("## Distribucion por fuente".to_string());
        lines.push(String::new());
        for (source, count) in sources.iter().take(10) {
            lines.push(format!("- **{}**: {} documentos", source, count));
        }
        lines.push(String::new());
    }

    let content_types = distribution(records, |r| {
        r.metadata
            .content_type
            .and_then(|t| serde_json::to_value(t).ok())
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    });
    if !content_types.is_empty() {
        lines.push("## Distribucion por tipo de contenido".to_string());
        lines.push(String::new());
        for (content_type, count) in content_types.iter().take(10) {
            lines.push(format!("- {}: {} documentos", content_type, count));
        }
        lines.push(String::new());
    }

    lines.push("## Salud del grafo".to_string());
    lines.push(String::new());
    lines.push(format!("- Nodos: {}", graph_stats.total_nodes));
    lines.push(format!("- Relaciones: {}", graph_stats.total_relations));
    lines.push(format!("- Etiquetas: {}", graph_stats.labels.join(", ")));
    lines.push(String::new());

    let terms = significant_terms(records);
    if !terms.is_empty() {
        lines.push("## Conceptos clave".to_string());
        lines.push(String::new());
        for (term, count) in &terms {
            lines.push(format!("- {}: {} menciones", term, count));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::DocMetadata;

    fn record(id: &str, content: &str, source: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata: DocMetadata {
                source: Some(source.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_render_includes_sections() {
        let records = vec![
            record("a", "kubernetes deployment rollout strategies explained", "ops"),
            record("b", "kubernetes ingress controllers compared thoroughly", "ops"),
            record("c", "gardening tips for spring tomatoes", "hobby"),
        ];
        let stats = GraphStats {
            total_nodes: 3,
            total_relations: 1,
            labels: vec!["Document".to_string()],
            ..Default::default()
        };

        let doc = render_insights(&records, &stats);
        assert!(doc.starts_with("# Insights Generados"));
        assert!(doc.contains("**ops**: 2 documentos"));
        assert!(doc.contains("Nodos: 3"));
        assert!(doc.contains("kubernetes: 2 menciones"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let records = vec![record("a", "stable deterministic output check", "s")];
        let stats = GraphStats::default();
        assert_eq!(
            render_insights(&records, &stats),
            render_insights(&records, &stats)
        );
    }

    #[test]
    fn test_terms_filter_short_words() {
        let records = vec![record("a", "tiny word list with elephant elephants", "s")];
        let terms = significant_terms(&records);
        assert!(terms.iter().all(|(t, _)| t.chars().count() >= TERM_MIN_LEN));
    }
}
