//! Content quality assessment and deep analysis
//!
//! Scores every document, buckets the problems, and folds the counts
//! into a 0–100 health score. Quality is multiplicative: a document
//! starts at 1.0 and loses ground for repetition, missing punctuation
//! and noise.

use std::collections::{HashMap, HashSet};

use mnemo_store::VectorRecord;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::{IssueBuckets, MemoryAnalysis, QualityMetrics};

/// Documents shorter than this are malformed
pub const MIN_CONTENT_LENGTH: usize = 10;
/// Documents longer than this likely need re-chunking
pub const MAX_CONTENT_LENGTH: usize = 100_000;
/// Quality scores below this are flagged low quality
pub const LOW_QUALITY_THRESHOLD: f64 = 0.3;

/// Mojibake detectors: UTF-8 read as Latin-1, mangled smart quotes,
/// double-encoded replacement chars, and the replacement char itself
static ENCODING_ISSUES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new("Ã[^\\x00-\\x7F]").expect("valid regex"),
        Regex::new("â€").expect("valid regex"),
        Regex::new("Ã¯Â¿Â½").expect("valid regex"),
        Regex::new("\u{fffd}").expect("valid regex"),
    ]
});

/// True when content shows mojibake patterns
pub fn has_encoding_issues(content: &str) -> bool {
    ENCODING_ISSUES.iter().any(|re| re.is_match(content))
}

/// Multiplicative quality score in [0, 1]
///
/// Penalties: under 30% unique tokens halves the score, no sentence
/// punctuation takes 30%, over 30% non-alphanumeric takes 40%.
pub fn assess_quality(content: &str) -> f64 {
    if content.is_empty() {
        return 0.0;
    }

    let mut score = 1.0;

    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() > 10 {
        let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let repetition_ratio = unique.len() as f64 / words.len() as f64;
        if repetition_ratio < 0.3 {
            score *= 0.5;
        }
    }

    let has_punctuation = content.chars().any(|c| ".!?;:".contains(c));
    if !has_punctuation {
        score *= 0.7;
    }

    let total = content.chars().count();
    let special = content
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    if total > 0 && special as f64 / total as f64 > 0.3 {
        score *= 0.6;
    }

    score
}

/// 0–100 health score from weighted issue counts
///
/// Weights: duplicates 2, empty 5, short 1, encoding 3, low quality 2,
/// orphaned graph node 4. The denominator assumes a worst case of five
/// penalty points per document.
pub fn health_score(total: usize, issues: &IssueBuckets, orphaned_nodes: i64) -> f64 {
    if total == 0 {
        return 100.0;
    }

    let penalty = issues.duplicates.count * 2
        + issues.empty_content.count * 5
        + issues.too_short.count
        + issues.encoding_issues.count * 3
        + issues.low_quality.count * 2
        + orphaned_nodes.max(0) as usize * 4;

    let max_penalty = total * 5;
    let health = 100.0 - (penalty as f64 / max_penalty as f64 * 100.0);
    (health.max(0.0) * 10.0).round() / 10.0
}

/// Run deep analysis over every document
pub fn analyze_documents(records: &[VectorRecord], orphaned_nodes: i64) -> MemoryAnalysis {
    let total = records.len();
    let mut issues = IssueBuckets::default();
    let mut seen_content: HashMap<u64, String> = HashMap::new();
    let mut sources: HashMap<String, usize> = HashMap::new();

    let mut total_length = 0usize;
    let mut with_metadata = 0usize;

    for record in records {
        let content = &record.content;
        let content_len = content.chars().count();
        total_length += content_len;

        if content.trim().is_empty() {
            issues.empty_content.push(&record.id, Some("Empty content".to_string()));
            continue;
        }

        if content_len < MIN_CONTENT_LENGTH {
            issues.too_short.push(
                &record.id,
                Some(format!("{} chars: {}", content_len, preview(content, 30))),
            );
        }

        if content_len > MAX_CONTENT_LENGTH {
            issues
                .too_long
                .push(&record.id, Some(format!("{} chars", content_len)));
        }

        let normalised_hash = normalised_content_hash(content);
        if let Some(first) = seen_content.get(&normalised_hash) {
            issues
                .duplicates
                .push(&record.id, Some(format!("duplicate of {}", first)));
        } else {
            seen_content.insert(normalised_hash, record.id.clone());
        }

        // Required metadata: a source and a document type
        let mut missing = Vec::new();
        if record.metadata.source.is_none() {
            missing.push("source");
        }
        if record.metadata.doc_type().is_none() {
            missing.push("type");
        }
        if missing.is_empty() {
            with_metadata += 1;
        } else {
            issues
                .missing_metadata
                .push(&record.id, Some(missing.join(", ")));
        }

        if has_encoding_issues(content) {
            issues
                .encoding_issues
                .push(&record.id, Some(preview(content, 50)));
        }

        let quality = assess_quality(content);
        if quality < LOW_QUALITY_THRESHOLD {
            issues
                .low_quality
                .push(&record.id, Some(format!("score {:.2}", quality)));
        }

        let source = record
            .metadata
            .source
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *sources.entry(source).or_insert(0) += 1;
    }

    let quality_metrics = QualityMetrics {
        unique_content: seen_content.len(),
        avg_content_length: if total > 0 {
            total_length as f64 / total as f64
        } else {
            0.0
        },
        metadata_coverage: if total > 0 {
            with_metadata as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        sources,
        health_score: health_score(total, &issues, orphaned_nodes),
    };

    let recommendations = recommendations_for(&issues, &quality_metrics);

    MemoryAnalysis {
        total_documents: total,
        issues,
        quality_metrics,
        recommendations,
    }
}

/// Hash of the trimmed, lowercased content, the exact-duplicate key
pub fn normalised_content_hash(content: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    content.trim().to_lowercase().hash(&mut hasher);
    hasher.finish()
}

fn preview(content: &str, limit: usize) -> String {
    content.chars().take(limit).collect()
}

/// Human-readable next steps keyed on thresholds
fn recommendations_for(issues: &IssueBuckets, metrics: &QualityMetrics) -> Vec<String> {
    let mut recs = Vec::new();

    if metrics.health_score >= 90.0 {
        recs.push("Memory is in excellent condition".to_string());
    } else if metrics.health_score >= 70.0 {
        recs.push("Memory is in good condition, minor cleanup recommended".to_string());
    } else {
        recs.push("Memory needs attention".to_string());
    }

    if issues.duplicates.count > 0 {
        recs.push(format!(
            "Run consolidation to remove {} duplicates",
            issues.duplicates.count
        ));
    }
    if issues.empty_content.count > 0 {
        recs.push(format!("Remove {} empty entries", issues.empty_content.count));
    }
    if issues.too_short.count > 0 {
        recs.push(format!("Review {} very short entries", issues.too_short.count));
    }
    if issues.encoding_issues.count > 0 {
        recs.push(format!("Fix {} encoding issues", issues.encoding_issues.count));
    }
    if issues.low_quality.count > 0 {
        recs.push(format!(
            "Consider removing {} low quality entries",
            issues.low_quality.count
        ));
    }
    if metrics.metadata_coverage < 80.0 {
        recs.push(format!(
            "Improve metadata coverage ({:.0}%)",
            metrics.metadata_coverage
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::DocMetadata;

    fn record(id: &str, content: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata: DocMetadata::default(),
        }
    }

    #[test]
    fn test_quality_clean_prose() {
        let score = assess_quality("A sensible sentence with variety. Another follows here!");
        assert!(score > 0.9);
    }

    #[test]
    fn test_quality_penalises_repetition() {
        let repetitive = "spam ".repeat(50);
        let score = assess_quality(repetitive.trim());
        assert!(score < 0.5);
    }

    #[test]
    fn test_quality_penalises_missing_punctuation() {
        let score = assess_quality("words without any sentence marks at all");
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_quality_penalises_noise() {
        let score = assess_quality("@@##$$%%^^&&**(()) a.");
        assert!(score <= 0.6);
    }

    #[test]
    fn test_quality_empty_is_zero() {
        assert_eq!(assess_quality(""), 0.0);
    }

    #[test]
    fn test_encoding_detection() {
        assert!(has_encoding_issues("caf\u{c3}\u{a9}")); // Ã©
        assert!(has_encoding_issues("quote â€œhereâ€"));
        assert!(has_encoding_issues("bad \u{fffd} char"));
        assert!(!has_encoding_issues("perfectly fine text"));
    }

    #[test]
    fn test_health_score_empty_store() {
        assert_eq!(health_score(0, &IssueBuckets::default(), 0), 100.0);
    }

    #[test]
    fn test_health_score_degrades() {
        let mut issues = IssueBuckets::default();
        for i in 0..5 {
            issues.empty_content.push(format!("doc-{}", i), None);
        }
        // 10 docs, 5 empty: penalty 25 of max 50
        let score = health_score(10, &issues, 0);
        assert_eq!(score, 50.0);
    }

    #[test]
    fn test_health_score_floors_at_zero() {
        let mut issues = IssueBuckets::default();
        for i in 0..20 {
            issues.empty_content.push(format!("doc-{}", i), None);
        }
        assert_eq!(health_score(2, &issues, 10), 0.0);
    }

    #[test]
    fn test_analyze_buckets_duplicates() {
        let records = vec![
            record("a", "Same content here."),
            record("b", "same content here. "),
            record("c", "Different content entirely."),
        ];
        let analysis = analyze_documents(&records, 0);
        assert_eq!(analysis.total_documents, 3);
        assert_eq!(analysis.issues.duplicates.count, 1);
        assert_eq!(analysis.quality_metrics.unique_content, 2);
    }

    #[test]
    fn test_analyze_flags_missing_metadata() {
        let records = vec![record("a", "Content with no source or type at all.")];
        let analysis = analyze_documents(&records, 0);
        assert_eq!(analysis.issues.missing_metadata.count, 1);
        assert_eq!(analysis.quality_metrics.metadata_coverage, 0.0);
    }

    #[test]
    fn test_analyze_empty_content_short_circuits() {
        let records = vec![record("a", "   ")];
        let analysis = analyze_documents(&records, 0);
        assert_eq!(analysis.issues.empty_content.count, 1);
        assert_eq!(analysis.issues.too_short.count, 0);
    }

    #[test]
    fn test_recommendations_praise_clean_store() {
        let records = vec![VectorRecord {
            id: "a".to_string(),
            content: "A perfectly good document about something. It has detail.".to_string(),
            metadata: {
                let mut m = DocMetadata {
                    source: Some("notes".to_string()),
                    ..Default::default()
                };
                m.set_doc_type("fact");
                m
            },
        }];
        let analysis = analyze_documents(&records, 0);
        assert!(analysis.recommendations[0].contains("excellent"));
    }
}
