//! Fuzzy duplicate detection
//!
//! Near-duplicates are found with a longest-common-subsequence ratio
//! over whitespace- and case-normalised text. Exact duplicates are
//! handled separately by hashing; this module only covers the fuzzy
//! band between "identical" and "merely similar".

/// Pairs at or above this ratio are duplicates
pub const FUZZY_THRESHOLD: f64 = 0.75;

/// Characters compared per document; the ratio stabilises well before
/// this and the DP cost is quadratic
const COMPARE_LIMIT: usize = 300;

/// Collapse whitespace and case
pub fn normalise(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Similarity ratio in [0, 1]: `2·LCS(a, b) / (|a| + |b|)`
///
/// Computed on normalised text clipped to 300 chars. A cheap length
/// bound short-circuits pairs that cannot reach the threshold.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalise(a).chars().take(COMPARE_LIMIT).collect();
    let b: Vec<char> = normalise(b).chars().take(COMPARE_LIMIT).collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // LCS is bounded by the shorter length; a pair whose bound is
    // already below the threshold cannot be a duplicate
    let upper_bound = 2.0 * a.len().min(b.len()) as f64 / (a.len() + b.len()) as f64;
    if upper_bound < FUZZY_THRESHOLD {
        return upper_bound;
    }

    let lcs = lcs_length(&a, &b);
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

/// Two-row dynamic-programming LCS length
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_collapses_whitespace_and_case() {
        assert_eq!(normalise("  Fox   JUMPS\n\tover "), "fox jumps over");
    }

    #[test]
    fn test_identical_texts_score_one() {
        assert_eq!(similarity_ratio("same text", "same text"), 1.0);
        assert_eq!(similarity_ratio("Same  TEXT", "same text"), 1.0);
    }

    #[test]
    fn test_punctuation_variant_is_fuzzy_duplicate() {
        let ratio = similarity_ratio(
            "Fox jumps over the lazy dog.",
            "Fox jumps over the lazy dog!",
        );
        assert!(ratio >= FUZZY_THRESHOLD, "ratio was {}", ratio);
    }

    #[test]
    fn test_unrelated_texts_score_low() {
        let ratio = similarity_ratio(
            "Quarterly revenue discussion for the board.",
            "zebra xylophone quantum frog",
        );
        assert!(ratio < FUZZY_THRESHOLD, "ratio was {}", ratio);
    }

    #[test]
    fn test_length_mismatch_short_circuits() {
        let long = "word ".repeat(100);
        let ratio = similarity_ratio("word", &long);
        assert!(ratio < FUZZY_THRESHOLD);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("text", ""), 0.0);
    }

    #[test]
    fn test_lcs_length_basic() {
        let a: Vec<char> = "abcde".chars().collect();
        let b: Vec<char> = "ace".chars().collect();
        assert_eq!(lcs_length(&a, &b), 3);
    }
}
