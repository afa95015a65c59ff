//! Consolidation and analysis report types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One flagged document inside an issue bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueEntry {
    pub id: String,
    /// Short context: a preview, a length, or the missing fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A class of problem with its count and a capped sample of entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueBucket {
    pub count: usize,
    /// At most ten entries, for display
    pub entries: Vec<IssueEntry>,
}

impl IssueBucket {
    /// Entries kept per bucket for display
    pub const DISPLAY_LIMIT: usize = 10;

    pub fn push(&mut self, id: impl Into<String>, detail: Option<String>) {
        self.count += 1;
        if self.entries.len() < Self::DISPLAY_LIMIT {
            self.entries.push(IssueEntry {
                id: id.into(),
                detail,
            });
        }
    }
}

/// All issue classes found by deep analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueBuckets {
    pub duplicates: IssueBucket,
    pub empty_content: IssueBucket,
    pub too_short: IssueBucket,
    pub too_long: IssueBucket,
    pub missing_metadata: IssueBucket,
    pub encoding_issues: IssueBucket,
    pub low_quality: IssueBucket,
}

/// Aggregate quality metrics over the whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Distinct normalised contents
    pub unique_content: usize,
    pub avg_content_length: f64,
    /// Percentage of documents carrying the required metadata
    pub metadata_coverage: f64,
    /// Document count per source
    pub sources: HashMap<String, usize>,
    /// 0–100 memory hygiene summary
    pub health_score: f64,
}

/// Deep-analysis result: issues, metrics and recommendations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryAnalysis {
    pub total_documents: usize,
    pub issues: IssueBuckets,
    pub quality_metrics: QualityMetrics,
    pub recommendations: Vec<String>,
}

/// Cross-store consistency findings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossReference {
    /// Graph nodes with no incident edges
    pub orphaned_nodes: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Outcome of the bounded graph/vector fixpoint loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub iterations: usize,
    pub missing_added: usize,
    pub orphans_removed: usize,
    /// False when the loop hit its bound with counts still diverging
    pub converged: bool,
    pub entity_links_created: usize,
}

/// The full consolidation report, one entry per phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub started_at: String,
    pub finished_at: String,

    /// Phase 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MemoryAnalysis>,

    /// Phase 2: change detection
    pub changed_documents: usize,
    pub new_documents: usize,

    /// Phase 3: incremental graph sync
    pub resynced: usize,

    /// Phases 4–6
    pub duplicates_removed: usize,
    pub semantic_duplicates_removed: usize,
    /// Documents inspected by the semantic sampling pass
    pub semantic_sampled: usize,
    pub fuzzy_duplicates_removed: usize,

    /// Phase 7
    pub malformed_removed: usize,

    /// Phase 8
    pub entities_extracted: usize,
    pub mentions_created: usize,

    /// Phase 9
    pub relationships_created: usize,

    /// Phases 10–11
    pub cross_reference: CrossReference,
    pub orphans_deleted: i64,

    /// Phase 12
    pub insight_saved: bool,

    /// Phase 13
    pub reconciliation: ReconciliationReport,

    /// Collected phase errors; consolidation never throws
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ConsolidationReport {
    /// Total corrective mutations across all phases
    pub fn total_mutations(&self) -> usize {
        self.duplicates_removed
            + self.semantic_duplicates_removed
            + self.fuzzy_duplicates_removed
            + self.malformed_removed
            + self.orphans_deleted.max(0) as usize
            + self.reconciliation.missing_added
            + self.reconciliation.orphans_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_bucket_caps_entries() {
        let mut bucket = IssueBucket::default();
        for i in 0..25 {
            bucket.push(format!("doc-{}", i), None);
        }
        assert_eq!(bucket.count, 25);
        assert_eq!(bucket.entries.len(), IssueBucket::DISPLAY_LIMIT);
    }

    #[test]
    fn test_total_mutations() {
        let report = ConsolidationReport {
            duplicates_removed: 2,
            fuzzy_duplicates_removed: 1,
            orphans_deleted: 3,
            ..Default::default()
        };
        assert_eq!(report.total_mutations(), 6);
    }
}
