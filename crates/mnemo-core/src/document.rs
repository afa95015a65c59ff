//! Document model
//!
//! A document is the unit of storage: one point in the vector index, one
//! node in the graph, zero or more cache entries. The `id` chosen at
//! vector insert time is reused verbatim across all three stores.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::metadata::DocMetadata;

/// A stored document with its embedding and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable ID, identical across vector, graph and cache
    pub id: String,
    /// Unicode text content
    pub content: String,
    /// Fixed-dimension embedding, cosine-comparable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub metadata: DocMetadata,
}

impl Document {
    /// Short content hash: first 16 hex chars of SHA-256
    pub fn content_hash(&self) -> String {
        content_hash(&self.content)
    }
}

/// First 16 hex chars of the SHA-256 of `content`
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// Full SHA-256 hex digest, used for change detection
pub fn full_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Heuristic binary-content check
///
/// Looks at the first 1000 chars: null bytes, known magic prefixes, or
/// more than 10% control/non-ASCII characters mark the content binary.
/// Binary documents get placeholder text in the graph store.
pub fn is_binary_content(content: &str) -> bool {
    if content.is_empty() {
        return false;
    }

    let sample: String = content.chars().take(1000).collect();

    if sample.contains('\0') {
        return true;
    }

    const BINARY_HEADERS: [&str; 7] = [
        "MZ",
        "PK\u{3}\u{4}",
        "\u{ff}\u{d8}\u{ff}",
        "GIF87",
        "GIF89",
        "%PDF",
        "\u{89}PNG",
    ];
    if BINARY_HEADERS.iter().any(|h| sample.starts_with(h)) {
        return true;
    }

    let total = sample.chars().count();
    let non_printable = sample
        .chars()
        .filter(|&c| {
            let code = c as u32;
            (code < 32 && code != 9 && code != 10 && code != 13) || code > 127
        })
        .count();

    total > 0 && non_printable as f64 / total as f64 > 0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_16_hex_chars() {
        let h = content_hash("hello world");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_hash_deterministic() {
        assert_eq!(content_hash("same input"), content_hash("same input"));
        assert_ne!(content_hash("a"), content_hash("b"));
    }

    #[test]
    fn test_full_hash_prefix_matches_short_hash() {
        let text = "prefix relation";
        assert!(full_hash(text).starts_with(&content_hash(text)));
    }

    #[test]
    fn test_plain_text_is_not_binary() {
        assert!(!is_binary_content("Just some regular prose.\nWith lines."));
        assert!(!is_binary_content(""));
    }

    #[test]
    fn test_null_byte_is_binary() {
        assert!(is_binary_content("abc\0def"));
    }

    #[test]
    fn test_magic_prefix_is_binary() {
        assert!(is_binary_content("%PDF-1.4 rest of file"));
        assert!(is_binary_content("GIF89a...."));
    }

    #[test]
    fn test_high_non_ascii_ratio_is_binary() {
        let noisy: String = std::iter::repeat('\u{fe}').take(200).collect();
        assert!(is_binary_content(&noisy));
    }
}
