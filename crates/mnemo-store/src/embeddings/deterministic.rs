//! Deterministic embedding provider
//!
//! Pure fallback mode: every text maps to its hash-seeded pseudo-vector
//! without touching the network. Used for offline operation and tests.

use async_trait::async_trait;

use super::provider::{fallback_embedding, EmbeddingProvider, ProviderKind};
use crate::error::Result;

/// Hash-seeded provider with no backend at all
#[derive(Debug, Clone)]
pub struct DeterministicProvider {
    dimension: usize,
}

impl DeterministicProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(fallback_embedding(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Deterministic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_embed() {
        let provider = DeterministicProvider::new(16);
        let a = provider.embed("memory").await.unwrap();
        let b = provider.embed("memory").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(provider.dimension(), 16);
    }
}
