//! Ingestion pipeline configuration.
//!
//! Provides a layered config loader in the shape of the teacher's own
//! config crate: compiled-in defaults, overlaid by an optional TOML file,
//! overlaid by environment variables. Later sources win.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the ingestion pipeline.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Where per-repository stores and clones live.
    pub storage: StorageConfig,

    /// Summarizer (LLM) provider settings.
    pub summarizer: ProviderConfig,

    /// Embeddings provider settings.
    pub embeddings: ProviderConfig,

    /// Concurrency and rate-limit overrides.
    pub concurrency: ConcurrencyConfig,

    /// Credentials forwarded to the clone utility, if needed.
    pub github_token: Option<String>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl IngestConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.summarizer.validate("summarizer")?;
        self.embeddings.validate("embeddings")?;
        Ok(())
    }

    /// Path to the per-repository store for `repo_slug`.
    pub fn db_path(&self, repo_slug: &str) -> PathBuf {
        self.storage.db_dir.join(format!("{repo_slug}.db"))
    }

    /// Path to the working-tree clone for `repo_slug`.
    pub fn clone_path(&self, repo_slug: &str) -> PathBuf {
        self.storage.db_dir.join("clones").join(repo_slug)
    }
}

/// Storage configuration: where stores and clones live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root workspace path for `{slug}.db` stores and `clones/{slug}/` checkouts.
    pub db_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from(".ingest"),
        }
    }
}

/// Settings for an HTTP-based model or embeddings provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key (usually sourced from an environment variable, never committed to a file).
    pub api_key: Option<String>,

    /// Base URL of the provider's API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,
}

impl ProviderConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{section}.base_url is required"
            )));
        }
        if self.model.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{section}.model is required"
            )));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: String::new(),
        }
    }
}

/// Concurrency and rate-limit overrides.
///
/// `None` fields mean "use the owning crate's built-in default"
/// (`ingest_core::concurrency::RateBudget::summaries_default`/`embeddings_default`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Overrides the summarizer's requests-per-second budget.
    pub max_requests_per_second: Option<f64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.storage.db_dir, PathBuf::from(".ingest"));
        assert_eq!(config.logging.level, "info");
        assert!(config.github_token.is_none());
    }

    #[test]
    fn test_db_and_clone_paths() {
        let mut config = IngestConfig::default();
        config.storage.db_dir = PathBuf::from("/var/ingest");

        assert_eq!(config.db_path("my-repo"), PathBuf::from("/var/ingest/my-repo.db"));
        assert_eq!(
            config.clone_path("my-repo"),
            PathBuf::from("/var/ingest/clones/my-repo")
        );
    }

    #[test]
    fn test_validate_requires_model() {
        let mut config = IngestConfig::default();
        config.summarizer.base_url = "https://example.com".to_string();
        config.summarizer.model = String::new();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("summarizer.model"));
    }

    #[test]
    fn test_validate_ok_with_models_set() {
        let mut config = IngestConfig::default();
        config.summarizer.model = "gpt-4o-mini".to_string();
        config.embeddings.model = "text-embedding-3-small".to_string();

        assert!(config.validate().is_ok());
    }
}
