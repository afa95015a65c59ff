//! mnemo configuration management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.mnemo/config.toml`
//! - Local config: `.mnemo/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default embedding dimension (OpenAI text-embedding family)
pub const DEFAULT_DIMENSION: usize = 1536;

/// Root configuration for mnemo.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MnemoConfig {
    /// Vector store (Qdrant) settings
    pub vector: VectorConfig,

    /// Graph store (FalkorDB) settings
    pub graph: GraphConfig,

    /// Cache (Redis) settings
    pub cache: CacheConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,

    /// Web search provider settings (research agents)
    pub research: ResearchConfig,

    /// Repository ingestion tuning
    pub ingest: IngestConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl MnemoConfig {
    /// Validate settings that have cross-field requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        if self.vector.collection.is_empty() {
            return Err(ConfigError::ValidationError(
                "vector.collection must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply CLI overrides on top of the merged configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.vector_url {
            self.vector.url = url.clone();
        }
        if let Some(ref url) = overrides.graph_url {
            self.graph.url = url.clone();
        }
        if let Some(ref url) = overrides.cache_url {
            self.cache.url = url.clone();
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }
}

/// Qdrant connection and collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Qdrant server URL (gRPC port)
    pub url: String,
    /// Optional API key
    pub api_key: Option<String>,
    /// Collection name, fixed per process
    pub collection: String,
    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "mnemo".to_string(),
            timeout_secs: 30,
        }
    }
}

/// FalkorDB connection settings. FalkorDB speaks the Redis protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Redis-protocol URL of the FalkorDB server
    pub url: String,
    /// Graph name queries execute against
    pub graph_name: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6370".to_string(),
            graph_name: "default".to_string(),
        }
    }
}

/// Redis cache connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Which embedding provider generates vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible HTTP API
    #[default]
    Openai,
    /// Hash-seeded deterministic vectors, no network
    Deterministic,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderType::Openai => write!(f, "openai"),
            EmbeddingProviderType::Deterministic => write!(f, "deterministic"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProviderType::Openai),
            "deterministic" => Ok(EmbeddingProviderType::Deterministic),
            other => Err(ConfigError::invalid_value(
                "embedding.provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

/// Embedding provider configuration.
///
/// # Example TOML
///
/// ```toml
/// [embedding]
/// provider = "openai"
/// base_url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// model = "text-embedding-3-small"
/// dimension = 1536
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,
    /// Base URL for the OpenAI-compatible API
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    /// Vector dimension; shorter provider outputs are zero-padded,
    /// longer ones truncated
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Openai,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl EmbeddingConfig {
    /// Validate that required settings exist for the selected provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.provider == EmbeddingProviderType::Openai {
            if self.base_url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "embedding.base_url is required for the openai provider".to_string(),
                ));
            }
            if self.model.is_empty() {
                return Err(ConfigError::ValidationError(
                    "embedding.model is required for the openai provider".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Web search provider for the research agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Provider name; empty disables the research agents
    pub provider: String,
    pub api_key_env: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key_env: "SEARCH_API_KEY".to_string(),
        }
    }
}

/// Repository ingestion tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Files above this size are skipped
    pub max_file_size_kb: u64,
    /// Extra exclude patterns on top of the built-in set
    pub exclude_patterns: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size_kb: 1024,
            exclude_patterns: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Optional log file path
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// CLI-supplied overrides applied after file-based configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub vector_url: Option<String>,
    pub graph_url: Option<String>,
    pub cache_url: Option<String>,
    pub embedding_provider: Option<EmbeddingProviderType>,
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MnemoConfig::default();
        assert_eq!(config.vector.url, "http://localhost:6334");
        assert_eq!(config.vector.collection, "mnemo");
        assert_eq!(config.graph.graph_name, "default");
        assert_eq!(config.cache.url, "redis://localhost:6379");
        assert_eq!(config.embedding.dimension, 1536);
        config.validate().unwrap();
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            "deterministic".parse::<EmbeddingProviderType>().unwrap(),
            EmbeddingProviderType::Deterministic
        );
        assert!("bogus".parse::<EmbeddingProviderType>().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_dimension() {
        let mut config = MnemoConfig::default();
        config.embedding.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = MnemoConfig::default();
        config.apply_overrides(&ConfigOverrides {
            vector_url: Some("http://qdrant:6334".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        });
        assert_eq!(config.vector.url, "http://qdrant:6334");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_parses() {
        let config: MnemoConfig = toml::from_str(
            r#"
            [graph]
            url = "redis://falkor:6370"
            "#,
        )
        .unwrap();
        assert_eq!(config.graph.url, "redis://falkor:6370");
        assert_eq!(config.graph.graph_name, "default");
        assert_eq!(config.vector.collection, "mnemo");
    }
}
