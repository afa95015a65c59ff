//! Embedding generation
//!
//! One trait, two providers: the OpenAI-compatible HTTP provider (which
//! degrades to the deterministic fallback on any failure) and the pure
//! deterministic provider for offline use. Select with [`create_provider`].

pub mod deterministic;
pub mod openai;
pub mod provider;

use std::sync::Arc;

pub use deterministic::DeterministicProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::{fallback_embedding, normalize, pad_or_truncate, EmbeddingProvider, ProviderKind};

/// Build a provider from its kind and connection settings
pub fn create_provider(
    kind: ProviderKind,
    base_url: &str,
    api_key: Option<String>,
    model: &str,
    dimension: usize,
) -> Arc<dyn EmbeddingProvider> {
    match kind {
        ProviderKind::Openai => Arc::new(OpenAiProvider::new(OpenAiConfig {
            base_url: base_url.to_string(),
            api_key,
            model: model.to_string(),
            dimension,
            timeout_secs: 30,
        })),
        ProviderKind::Deterministic => Arc::new(DeterministicProvider::new(dimension)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_provider() {
        let p = create_provider(ProviderKind::Deterministic, "", None, "", 32);
        assert_eq!(p.provider_kind(), ProviderKind::Deterministic);
        assert_eq!(p.dimension(), 32);

        let p = create_provider(ProviderKind::Openai, "http://localhost:9", None, "m", 64);
        assert_eq!(p.provider_kind(), ProviderKind::Openai);
        assert_eq!(p.dimension(), 64);
    }
}
