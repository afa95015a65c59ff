//! Entity extraction regex families
//!
//! Shared by the metadata enricher (people / organizations / locations,
//! capped at three per class) and the consolidation engine (Person /
//! Company / Project graph nodes). Pattern-based on purpose: no model
//! inference, deterministic, cheap enough to run on every document.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Two or three capitalized words, the base person-name shape
static PERSON_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b").expect("valid regex")
});

/// Titled forms: Mr. Smith, Dr. Ada Lovelace
static PERSON_TITLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Dr)\.\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?").expect("valid regex")
});

/// Capitalized phrase ending in a corporate suffix
static COMPANY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*\s+(?:Inc|LLC|Corp|Ltd|SA|SL|Corporation|Company)\b")
        .expect("valid regex")
});

/// Well-known organizations matched by name alone
static COMPANY_KNOWN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:Google|Microsoft|Apple|Amazon|Meta|Netflix|OpenAI|Anthropic|Oracle|IBM|Tesla|Qdrant|Redis)\b")
        .expect("valid regex")
});

/// `project Apollo` / `Apollo Project` forms
static PROJECT_PREFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[Pp]roject\s+([A-Z][a-zA-Z0-9]+)").expect("valid regex"));
static PROJECT_SUFFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-zA-Z]+)\s+Project\b").expect("valid regex"));

/// Capitalized word after a location preposition
static LOCATION_PREP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:in|at|from|near)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\b").expect("valid regex")
});

/// Kind of entity promoted to a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Company,
    Project,
}

impl EntityKind {
    /// Graph label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Person => "Person",
            EntityKind::Company => "Company",
            EntityKind::Project => "Project",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Push `value` if its lowercase form is unseen, stopping at `cap`
fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, value: &str, cap: usize) {
    if out.len() >= cap {
        return;
    }
    let key = value.trim().to_lowercase();
    if !key.is_empty() && seen.insert(key) {
        out.push(value.trim().to_string());
    }
}

/// Extract person names, deduplicated, first `cap` in document order
pub fn extract_people(text: &str, cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for m in PERSON_TITLED.find_iter(text) {
        push_unique(&mut out, &mut seen, m.as_str(), cap);
    }
    for m in PERSON_NAME.find_iter(text) {
        // Company matches shadow person matches for the same span
        if COMPANY_SUFFIX.is_match(m.as_str()) {
            continue;
        }
        push_unique(&mut out, &mut seen, m.as_str(), cap);
    }
    out
}

/// Extract organization names, deduplicated, first `cap` in document order
pub fn extract_organizations(text: &str, cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for m in COMPANY_SUFFIX.find_iter(text) {
        push_unique(&mut out, &mut seen, m.as_str(), cap);
    }
    for m in COMPANY_KNOWN.find_iter(text) {
        push_unique(&mut out, &mut seen, m.as_str(), cap);
    }
    out
}

/// Extract project names, deduplicated, first `cap` in document order
pub fn extract_projects(text: &str, cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for caps in PROJECT_PREFIXED.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            push_unique(&mut out, &mut seen, name.as_str(), cap);
        }
    }
    for caps in PROJECT_SUFFIXED.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            push_unique(&mut out, &mut seen, name.as_str(), cap);
        }
    }
    out
}

/// Extract location names, deduplicated, first `cap` in document order
pub fn extract_locations(text: &str, cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for caps in LOCATION_PREP.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            push_unique(&mut out, &mut seen, name.as_str(), cap);
        }
    }
    out
}

/// An entity mention destined for a graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphEntity {
    pub kind: EntityKind,
    /// Canonical (as-written) name
    pub name: String,
}

impl GraphEntity {
    /// Dedup key: kind plus lowercase name
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind.label(), self.name.to_lowercase())
    }
}

/// Extract the Person / Company / Project mentions consolidation
/// promotes to graph nodes. Unbounded per document; the MENTIONS edge
/// cap is applied at link-creation time.
pub fn extract_graph_entities(text: &str) -> Vec<GraphEntity> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for name in extract_people(text, usize::MAX) {
        let e = GraphEntity {
            kind: EntityKind::Person,
            name,
        };
        if seen.insert(e.key()) {
            out.push(e);
        }
    }
    for name in extract_organizations(text, usize::MAX) {
        let e = GraphEntity {
            kind: EntityKind::Company,
            name,
        };
        if seen.insert(e.key()) {
            out.push(e);
        }
    }
    for name in extract_projects(text, usize::MAX) {
        let e = GraphEntity {
            kind: EntityKind::Project,
            name,
        };
        if seen.insert(e.key()) {
            out.push(e);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_people_basic() {
        let people = extract_people("Ada Lovelace met Charles Babbage in London.", 3);
        assert!(people.contains(&"Ada Lovelace".to_string()));
        assert!(people.contains(&"Charles Babbage".to_string()));
    }

    #[test]
    fn test_extract_people_titled() {
        let people = extract_people("Dr. Grace Hopper wrote the compiler.", 3);
        assert!(people.iter().any(|p| p.contains("Grace Hopper")));
    }

    #[test]
    fn test_extract_people_respects_cap() {
        let text = "Ada Lovelace, Alan Turing, Grace Hopper, John McCarthy all came.";
        assert_eq!(extract_people(text, 3).len(), 3);
    }

    #[test]
    fn test_extract_organizations_suffix() {
        let orgs = extract_organizations("Acme Inc bought Widget Works LLC.", 3);
        assert!(orgs.contains(&"Acme Inc".to_string()));
        assert!(orgs.contains(&"Widget Works LLC".to_string()));
    }

    #[test]
    fn test_extract_organizations_known_names() {
        let orgs = extract_organizations("Deployed on Google infrastructure.", 3);
        assert_eq!(orgs, vec!["Google".to_string()]);
    }

    #[test]
    fn test_extract_projects_both_forms() {
        let projects = extract_projects("We started project Apollo and the Gemini Project.", 5);
        assert!(projects.contains(&"Apollo".to_string()));
        assert!(projects.contains(&"Gemini".to_string()));
    }

    #[test]
    fn test_extract_locations() {
        let locs = extract_locations("The office in Berlin opened, then one near Buenos Aires.", 3);
        assert!(locs.contains(&"Berlin".to_string()));
        assert!(locs.contains(&"Buenos Aires".to_string()));
    }

    #[test]
    fn test_graph_entities_dedup_case_insensitive() {
        let text = "Acme Inc partnered with ACME Inc.";
        let entities = extract_graph_entities(text);
        let companies: Vec<_> = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Company)
            .collect();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Acme Inc");
    }

    #[test]
    fn test_graph_entity_key() {
        let e = GraphEntity {
            kind: EntityKind::Person,
            name: "Ada Lovelace".to_string(),
        };
        assert_eq!(e.key(), "Person:ada lovelace");
    }
}
