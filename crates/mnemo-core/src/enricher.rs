//! Metadata enricher
//!
//! Pure function from `(content, user metadata, timestamp)` to enriched
//! metadata. Fills keywords, named entities, language, source type,
//! content hash and counters. Caller-supplied values always win; the
//! enricher only fills what the caller left blank.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::content_hash;
use crate::entities::{extract_locations, extract_organizations, extract_people};
use crate::metadata::{ContentType, DocMetadata, EntityMentions, Language, SourceType};

/// How many keywords survive frequency ranking
const KEYWORD_LIMIT: usize = 15;

/// How many entities are kept per class
const ENTITY_LIMIT: usize = 3;

/// Margin by which one language's marker count must beat the other
const LANGUAGE_MARGIN: usize = 3;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").expect("valid regex"));

/// Filler words never counted as keywords, English and Spanish mixed
const STOPWORDS: [&str; 50] = [
    "this", "that", "with", "from", "have", "been", "were", "they", "their", "which", "would",
    "could", "should", "there", "where", "when", "what", "more", "also", "than", "then", "them",
    "these", "those", "will", "your", "about", "into", "other", "some", "such", "only", "over",
    "very", "just", "because", "para", "pero", "como", "esta", "este", "todo", "bien", "donde",
    "cuando", "entre", "hasta", "porque", "sobre", "desde",
];

/// Marker words used for the Spanish/English vote
const SPANISH_MARKERS: [&str; 10] = [
    " que ", " de ", " la ", " el ", " en ", " los ", " las ", " por ", " con ", " una ",
];
const ENGLISH_MARKERS: [&str; 10] = [
    " the ", " and ", " is ", " of ", " to ", " that ", " for ", " with ", " this ", " are ",
];

/// Extensions treated as office-style documents
const DOCUMENT_EXTS: [&str; 6] = ["pdf", "doc", "docx", "odt", "ppt", "pptx"];
/// Extensions treated as source code
const CODE_EXTS: [&str; 16] = [
    "py", "rs", "js", "jsx", "ts", "tsx", "java", "kt", "go", "rb", "php", "c", "cpp", "cs",
    "swift", "vb",
];
/// Extensions treated as configuration
const CONFIG_EXTS: [&str; 8] = ["json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env"];

/// Stateless metadata enricher
#[derive(Debug, Clone, Default)]
pub struct MetadataEnricher;

impl MetadataEnricher {
    pub fn new() -> Self {
        Self
    }

    /// Enrich `user` metadata from `content`, stamping `timestamp`
    pub fn enrich(
        &self,
        content: &str,
        mut user: DocMetadata,
        timestamp: DateTime<Utc>,
    ) -> DocMetadata {
        let stamp = timestamp.to_rfc3339();
        if user.created_at.is_none() {
            user.created_at = Some(stamp.clone());
        }
        user.updated_at = Some(user.updated_at.unwrap_or(stamp));

        if user.keywords.is_empty() {
            user.keywords = extract_keywords(content, KEYWORD_LIMIT);
        }

        if user.entities.is_empty() {
            user.entities = EntityMentions {
                people: extract_people(content, ENTITY_LIMIT),
                organizations: extract_organizations(content, ENTITY_LIMIT),
                locations: extract_locations(content, ENTITY_LIMIT),
            };
        }
        if user.entity_labels.is_empty() {
            user.entity_labels = entity_labels(&user.entities);
        }

        if user.language.is_none() {
            user.language = detect_language(content);
        }

        if user.source_type.is_none() {
            user.source_type = user.source.as_deref().map(infer_source_type);
        }
        if user.content_type.is_none() {
            user.content_type = user.source.as_deref().and_then(infer_content_type);
        }

        if user.content_hash.is_none() {
            user.content_hash = Some(content_hash(content));
        }
        if user.word_count.is_none() {
            user.word_count = Some(content.split_whitespace().count());
        }
        if user.char_count.is_none() {
            user.char_count = Some(content.chars().count());
        }

        user
    }
}

/// Top-`limit` keywords by frequency: lowercase 4+ letter tokens,
/// stopword-filtered, ties broken by first occurrence
pub fn extract_keywords(content: &str, limit: usize) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for (position, m) in WORD_RE.find_iter(&lowered).enumerate() {
        let word = m.as_str();
        if STOPWORDS.contains(&word) {
            continue;
        }
        let entry = counts.entry(word).or_insert((0, position));
        entry.0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(word, _, _)| word.to_string())
        .collect()
}

/// Vote Spanish vs English on marker-word counts; `None` below margin
pub fn detect_language(content: &str) -> Option<Language> {
    let padded = format!(" {} ", content.to_lowercase());
    let count = |markers: &[&str]| -> usize {
        markers.iter().map(|m| padded.matches(m).count()).sum()
    };

    let es = count(&SPANISH_MARKERS);
    let en = count(&ENGLISH_MARKERS);

    if es >= en + LANGUAGE_MARGIN {
        Some(Language::Es)
    } else if en >= es + LANGUAGE_MARGIN {
        Some(Language::En)
    } else {
        None
    }
}

/// Classify a source string: URL host, path extension, or bare text
pub fn infer_source_type(source: &str) -> SourceType {
    if source.starts_with("http://") || source.starts_with("https://") {
        let lowered = source.to_lowercase();
        if lowered.contains("github.com") {
            return SourceType::Github;
        }
        if lowered.contains("wikipedia.org") || lowered.contains("wiki.") {
            return SourceType::Wiki;
        }
        return SourceType::Url;
    }

    match extension_of(source) {
        Some(ext) if DOCUMENT_EXTS.contains(&ext.as_str()) => SourceType::Document,
        Some(ext) if CODE_EXTS.contains(&ext.as_str()) => SourceType::Code,
        Some(ext) if CONFIG_EXTS.contains(&ext.as_str()) => SourceType::Config,
        Some(ext) if ext == "txt" || ext == "md" => SourceType::TextFile,
        Some(_) => SourceType::File,
        None if source.contains('/') || source.contains('\\') => SourceType::File,
        None => SourceType::Text,
    }
}

/// Content type when the source string makes it obvious
fn infer_content_type(source: &str) -> Option<ContentType> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Some(ContentType::Webpage);
    }
    let ext = extension_of(source)?;
    match ext.as_str() {
        "pdf" | "odt" | "ppt" | "pptx" => Some(ContentType::Document),
        "doc" | "docx" => Some(ContentType::Word),
        "xls" | "xlsx" | "csv" => Some(ContentType::Spreadsheet),
        "png" | "jpg" | "jpeg" | "gif" | "webp" => Some(ContentType::Image),
        "mp4" | "mov" | "avi" | "mkv" => Some(ContentType::Video),
        "txt" | "md" => Some(ContentType::Text),
        _ if CODE_EXTS.contains(&ext.as_str()) => Some(ContentType::Code),
        _ => None,
    }
}

/// Lowercase extension of a path-looking source string
fn extension_of(source: &str) -> Option<String> {
    let name = source.rsplit(['/', '\\']).next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains(' ') {
        return None;
    }
    Some(ext.to_lowercase())
}

/// `Person:X` / `Org:Y` / `Location:Z` labels from entity mentions
fn entity_labels(entities: &EntityMentions) -> Vec<String> {
    let mut labels = Vec::new();
    for p in &entities.people {
        labels.push(format!("Person:{}", p));
    }
    for o in &entities.organizations {
        labels.push(format!("Org:{}", o));
    }
    for l in &entities.locations {
        labels.push(format!("Location:{}", l));
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_keywords_frequency_ranked() {
        let text = "memory memory memory engine engine graph";
        let kws = extract_keywords(text, 15);
        assert_eq!(kws[0], "memory");
        assert_eq!(kws[1], "engine");
        assert_eq!(kws[2], "graph");
    }

    #[test]
    fn test_keywords_drop_stopwords_and_short_tokens() {
        let kws = extract_keywords("this is that with a cat dog elephant elephant", 15);
        assert!(!kws.contains(&"this".to_string()));
        assert!(!kws.contains(&"that".to_string()));
        assert!(!kws.contains(&"cat".to_string())); // under 4 letters
        assert!(kws.contains(&"elephant".to_string()));
    }

    #[test]
    fn test_keywords_limit() {
        let text: String = (0..40).map(|i| format!("word{:02}xx ", i)).collect();
        assert_eq!(extract_keywords(&text, 15).len(), 15);
    }

    #[test]
    fn test_detect_language_english() {
        let text = "the cat is on the mat and the dog is in the yard for the day";
        assert_eq!(detect_language(text), Some(Language::En));
    }

    #[test]
    fn test_detect_language_spanish() {
        let text = "la casa de la abuela que vive en el campo con una huerta por la tarde";
        assert_eq!(detect_language(text), Some(Language::Es));
    }

    #[test]
    fn test_detect_language_undecided() {
        assert_eq!(detect_language("hola world"), None);
    }

    #[test]
    fn test_infer_source_type() {
        assert_eq!(
            infer_source_type("https://github.com/acme/widget"),
            SourceType::Github
        );
        assert_eq!(
            infer_source_type("https://en.wikipedia.org/wiki/Rust"),
            SourceType::Wiki
        );
        assert_eq!(infer_source_type("https://example.com"), SourceType::Url);
        assert_eq!(infer_source_type("report.pdf"), SourceType::Document);
        assert_eq!(infer_source_type("src/main.rs"), SourceType::Code);
        assert_eq!(infer_source_type("app/config.toml"), SourceType::Config);
        assert_eq!(infer_source_type("notes.txt"), SourceType::TextFile);
        assert_eq!(infer_source_type("a plain label"), SourceType::Text);
    }

    #[test]
    fn test_enrich_fills_hash_and_counts() {
        let enricher = MetadataEnricher::new();
        let meta = enricher.enrich("hello world", DocMetadata::default(), ts());
        assert_eq!(meta.content_hash.as_deref(), Some(&content_hash("hello world")[..]));
        assert_eq!(meta.word_count, Some(2));
        assert_eq!(meta.char_count, Some(11));
        assert!(meta.created_at.is_some());
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn test_enrich_user_metadata_wins() {
        let enricher = MetadataEnricher::new();
        let user = DocMetadata {
            keywords: vec!["custom".to_string()],
            language: Some(Language::Es),
            created_at: Some("2020-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        let meta = enricher.enrich("the quick brown fox is here for the win", user, ts());
        assert_eq!(meta.keywords, vec!["custom".to_string()]);
        assert_eq!(meta.language, Some(Language::Es));
        assert_eq!(meta.created_at.as_deref(), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_enrich_entity_labels() {
        let enricher = MetadataEnricher::new();
        let meta = enricher.enrich(
            "Ada Lovelace joined Acme Inc in Berlin.",
            DocMetadata::default(),
            ts(),
        );
        assert!(meta
            .entity_labels
            .iter()
            .any(|l| l.starts_with("Person:")));
        assert!(meta.entity_labels.iter().any(|l| l == "Org:Acme Inc"));
        assert!(meta.entity_labels.iter().any(|l| l == "Location:Berlin"));
    }
}
