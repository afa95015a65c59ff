//! Embedding provider trait and the deterministic fallback
//!
//! The contract: `embed` returns a vector of exactly `dimension()`
//! floats and, outside of configuration mistakes, does not fail — a
//! provider that loses its backend substitutes the hash-seeded
//! pseudo-embedding so ingestion never blocks on the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of embedding provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// OpenAI-compatible HTTP API with deterministic fallback
    #[default]
    Openai,
    /// Pure hash-seeded vectors, no network at all
    Deterministic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Deterministic => write!(f, "deterministic"),
        }
    }
}

/// Text → fixed-dimension vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. Implementations fall back to
    /// [`fallback_embedding`] on transport failure rather than erroring.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of returned vectors
    fn dimension(&self) -> usize;

    fn provider_kind(&self) -> ProviderKind;
}

/// Deterministic pseudo-embedding seeded by the MD5 of the input
///
/// Values are uniform in [-1, 1] from a xorshift generator, then
/// L2-normalised. The same text always maps to the same vector, which
/// keeps cosine comparisons meaningful even in pure-fallback mode.
pub fn fallback_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let digest = md5::compute(text.as_bytes());
    let mut seed = u64::from_le_bytes(digest.0[..8].try_into().expect("md5 is 16 bytes"));
    if seed == 0 {
        seed = 0x9e3779b97f4a7c15;
    }

    let mut vector: Vec<f32> = (0..dimension)
        .map(|_| {
            // xorshift64*
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let unit = (seed >> 11) as f64 / (1u64 << 53) as f64;
            (unit * 2.0 - 1.0) as f32
        })
        .collect();

    normalize(&mut vector);
    vector
}

/// L2-normalise in place; zero vectors are left untouched
pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Force a vector to `dimension`: truncate long, zero-pad short
pub fn pad_or_truncate(mut vector: Vec<f32>, dimension: usize) -> Vec<f32> {
    vector.resize(dimension, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_deterministic() {
        let a = fallback_embedding("same text", 64);
        let b = fallback_embedding("same text", 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fallback_differs_by_input() {
        assert_ne!(fallback_embedding("one", 64), fallback_embedding("two", 64));
    }

    #[test]
    fn test_fallback_is_normalised() {
        let v = fallback_embedding("anything at all", 256);
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_fallback_has_requested_dimension() {
        assert_eq!(fallback_embedding("x", 1536).len(), 1536);
        assert_eq!(fallback_embedding("x", 8).len(), 8);
    }

    #[test]
    fn test_pad_or_truncate() {
        assert_eq!(pad_or_truncate(vec![1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(pad_or_truncate(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_normalize_leaves_zero_vector() {
        let mut v = vec![0.0f32; 4];
        normalize(&mut v);
        assert_eq!(v, vec![0.0f32; 4]);
    }
}
