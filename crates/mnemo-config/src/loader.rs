//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.mnemo/config.toml`
//! 2. Local config: `.mnemo/config.toml` (working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConfigOverrides, MnemoConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration directory name, both global and local.
const CONFIG_DIR: &str = ".mnemo";

/// Environment variable overriding the global config directory.
const HOME_ENV: &str = "MNEMO_HOME";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.mnemo`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<MnemoConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// The global directory is `$MNEMO_HOME` when set, `~/.mnemo`
    /// otherwise.
    pub fn new() -> Self {
        let global_config_dir = std::env::var(HOME_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(CONFIG_DIR)));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// The global state directory (`~/.mnemo`), if resolvable.
    pub fn global_dir(&self) -> Option<&Path> {
        self.global_config_dir.as_deref()
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a working directory.
    pub fn local_config_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        workdir: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<MnemoConfig, ConfigError> {
        let mut config = MnemoConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(workdir)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<MnemoConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a working directory.
    pub fn load_local(&self, workdir: &Path) -> Result<Option<MnemoConfig>, ConfigError> {
        let local_path = self.local_config_path(workdir);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &MnemoConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        let global_path = global_dir.join(CONFIG_FILE_NAME);
        save_config_file(&global_path, config)
    }

    /// Initialize the global configuration directory.
    ///
    /// Creates `~/.mnemo/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        if !global_dir.exists() {
            std::fs::create_dir_all(global_dir)
                .map_err(|e| ConfigError::create_dir(global_dir, e))?;
        }

        let config_path = global_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            let default_config = MnemoConfig::default();
            save_config_file(&config_path, &default_config)?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<MnemoConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &MnemoConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Field-by-field merge keyed on "differs from default", allowing
/// partial configs at every layer.
fn merge_configs(base: MnemoConfig, overlay: MnemoConfig) -> MnemoConfig {
    let defaults = MnemoConfig::default();

    MnemoConfig {
        vector: crate::VectorConfig {
            url: pick(base.vector.url, overlay.vector.url, &defaults.vector.url),
            api_key: overlay.vector.api_key.or(base.vector.api_key),
            collection: pick(
                base.vector.collection,
                overlay.vector.collection,
                &defaults.vector.collection,
            ),
            timeout_secs: if overlay.vector.timeout_secs != defaults.vector.timeout_secs {
                overlay.vector.timeout_secs
            } else {
                base.vector.timeout_secs
            },
        },
        graph: crate::GraphConfig {
            url: pick(base.graph.url, overlay.graph.url, &defaults.graph.url),
            graph_name: pick(
                base.graph.graph_name,
                overlay.graph.graph_name,
                &defaults.graph.graph_name,
            ),
        },
        cache: crate::CacheConfig {
            url: pick(base.cache.url, overlay.cache.url, &defaults.cache.url),
        },
        embedding: crate::EmbeddingConfig {
            provider: if overlay.embedding.provider != defaults.embedding.provider {
                overlay.embedding.provider
            } else {
                base.embedding.provider
            },
            base_url: pick(
                base.embedding.base_url,
                overlay.embedding.base_url,
                &defaults.embedding.base_url,
            ),
            api_key_env: pick(
                base.embedding.api_key_env,
                overlay.embedding.api_key_env,
                &defaults.embedding.api_key_env,
            ),
            model: pick(
                base.embedding.model,
                overlay.embedding.model,
                &defaults.embedding.model,
            ),
            dimension: if overlay.embedding.dimension != defaults.embedding.dimension {
                overlay.embedding.dimension
            } else {
                base.embedding.dimension
            },
        },
        research: crate::ResearchConfig {
            provider: pick(
                base.research.provider,
                overlay.research.provider,
                &defaults.research.provider,
            ),
            api_key_env: pick(
                base.research.api_key_env,
                overlay.research.api_key_env,
                &defaults.research.api_key_env,
            ),
        },
        ingest: crate::IngestConfig {
            max_file_size_kb: if overlay.ingest.max_file_size_kb != defaults.ingest.max_file_size_kb
            {
                overlay.ingest.max_file_size_kb
            } else {
                base.ingest.max_file_size_kb
            },
            // Patterns merge additively across layers
            exclude_patterns: {
                let mut patterns = base.ingest.exclude_patterns;
                for pattern in overlay.ingest.exclude_patterns {
                    if !patterns.contains(&pattern) {
                        patterns.push(pattern);
                    }
                }
                patterns
            },
        },
        logging: crate::LoggingConfig {
            level: pick(
                base.logging.level,
                overlay.logging.level,
                &defaults.logging.level,
            ),
            file: overlay.logging.file.or(base.logging.file),
        },
    }
}

/// Overlay wins when it differs from the default, base otherwise.
fn pick(base: String, overlay: String, default: &str) -> String {
    if overlay != default {
        overlay
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_local_config(content: &str, dir: &Path) {
        let config_dir = dir.join(".mnemo");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.vector.url, "http://localhost:6334");
        assert_eq!(config.graph.graph_name, "default");
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [vector]
            url = "http://custom:6334"
            collection = "custom_memory"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.vector.url, "http://custom:6334");
        assert_eq!(config.vector.collection, "custom_memory");
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"

            [vector]
            url = "http://global:6334"
            "#,
        )
        .unwrap();

        create_local_config(
            r#"
            [vector]
            url = "http://local:6334"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        // Local override takes effect, global value survives elsewhere
        assert_eq!(config.vector.url, "http://local:6334");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_local_config(
            r#"
            [vector]
            url = "http://local:6334"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let overrides = ConfigOverrides {
            vector_url: Some("http://cli:6334".to_string()),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.vector.url, "http://cli:6334");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_init_global_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_global().unwrap();

        assert!(config_path.exists());
        let content = std::fs::read_to_string(&config_path).unwrap();
        let _: MnemoConfig = toml::from_str(&content).unwrap();
    }

    #[test]
    fn test_exclude_patterns_merge() {
        let base = MnemoConfig {
            ingest: crate::IngestConfig {
                exclude_patterns: vec!["generated".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let overlay = MnemoConfig {
            ingest: crate::IngestConfig {
                exclude_patterns: vec!["fixtures".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = merge_configs(base, overlay);
        assert!(merged.ingest.exclude_patterns.contains(&"generated".to_string()));
        assert!(merged.ingest.exclude_patterns.contains(&"fixtures".to_string()));
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
