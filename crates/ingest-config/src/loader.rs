//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.ingest/config.toml`
//! 2. Local config: `.ingest/config.toml` (in workspace)
//! 3. Environment variable overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConcurrencyConfig, IngestConfig, ProviderConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global/local configuration directory name.
const CONFIG_DIR: &str = ".ingest";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.ingest`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<IngestConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.ingest`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(CONFIG_DIR));

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

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a workspace.
    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a workspace, applying environment variable
    /// overrides last.
    ///
    /// Merges config in order: defaults → global → local → environment.
    pub fn load(&mut self, workspace_root: &Path) -> Result<IngestConfig, ConfigError> {
        let mut config = IngestConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(workspace_root)? {
            config = merge_configs(config, local_config);
        }

        apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<IngestConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("no home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!(path = ?global_path, "global config not found");
            return Ok(None);
        }

        debug!(path = ?global_path, "loading global config");
        let config = load_config_file(&global_path)?;
        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a workspace.
    pub fn load_local(&self, workspace_root: &Path) -> Result<Option<IngestConfig>, ConfigError> {
        let local_path = self.local_config_path(workspace_root);

        if !local_path.exists() {
            trace!(path = ?local_path, "local config not found");
            return Ok(None);
        }

        debug!(path = ?local_path, "loading local config");
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the local config file for a workspace.
    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &IngestConfig,
    ) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(workspace_root);
        save_config_file(&local_path, config)
    }

    /// Initialize local configuration for a workspace.
    ///
    /// Creates `.ingest/config.toml` with default configuration.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        let local_dir = workspace_root.join(CONFIG_DIR);

        if !local_dir.exists() {
            std::fs::create_dir_all(&local_dir)
                .map_err(|e| ConfigError::create_dir(&local_dir, e))?;
        }

        let config_path = local_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            save_config_file(&config_path, &IngestConfig::default())?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<IngestConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &IngestConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Overlay environment variables onto `config`, per the five variables this
/// system recognizes.
fn apply_env_overrides(config: &mut IngestConfig) {
    if let Ok(v) = std::env::var("ANALYSIS_DB_DIR") {
        config.storage.db_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("SUMMARIES_API_KEY") {
        config.summarizer.api_key = Some(v);
    }
    if let Ok(v) = std::env::var("SUMMARIES_BASE_URL") {
        config.summarizer.base_url = v;
    }
    if let Ok(v) = std::env::var("SUMMARIES_MODEL") {
        config.summarizer.model = v;
    }
    if let Ok(v) = std::env::var("EMBEDDINGS_API_KEY") {
        config.embeddings.api_key = Some(v);
    }
    if let Ok(v) = std::env::var("EMBEDDINGS_BASE_URL") {
        config.embeddings.base_url = v;
    }
    if let Ok(v) = std::env::var("EMBEDDINGS_MODEL") {
        config.embeddings.model = v;
    }
    if let Ok(v) = std::env::var("MAX_REQUESTS_PER_SECOND") {
        if let Ok(parsed) = v.parse::<f64>() {
            config.concurrency.max_requests_per_second = Some(parsed);
        }
    }
    if let Ok(v) = std::env::var("GITHUB_TOKEN") {
        config.github_token = Some(v);
    }
}

/// Merge two configurations, with `overlay` taking precedence.
fn merge_configs(base: IngestConfig, overlay: IngestConfig) -> IngestConfig {
    IngestConfig {
        storage: crate::StorageConfig {
            db_dir: if overlay.storage.db_dir != PathBuf::from(".ingest") {
                overlay.storage.db_dir
            } else {
                base.storage.db_dir
            },
        },
        summarizer: merge_provider(base.summarizer, overlay.summarizer),
        embeddings: merge_provider(base.embeddings, overlay.embeddings),
        concurrency: ConcurrencyConfig {
            max_requests_per_second: overlay
                .concurrency
                .max_requests_per_second
                .or(base.concurrency.max_requests_per_second),
        },
        github_token: overlay.github_token.or(base.github_token),
        logging: crate::LoggingConfig {
            level: if overlay.logging.level != "info" {
                overlay.logging.level
            } else {
                base.logging.level
            },
            format: overlay.logging.format,
        },
    }
}

/// Merge provider config, overlay values override base.
fn merge_provider(base: ProviderConfig, overlay: ProviderConfig) -> ProviderConfig {
    let default = ProviderConfig::default();
    ProviderConfig {
        api_key: overlay.api_key.or(base.api_key),
        base_url: if overlay.base_url != default.base_url {
            overlay.base_url
        } else {
            base.base_url
        },
        model: if !overlay.model.is_empty() {
            overlay.model
        } else {
            base.model
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".ingest");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path()).unwrap();

        assert_eq!(config.storage.db_dir, PathBuf::from(".ingest"));
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [storage]
            db_dir = ".custom-ingest"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path()).unwrap();
        assert_eq!(config.storage.db_dir, PathBuf::from(".custom-ingest"));
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

            [storage]
            db_dir = ".global-ingest"
            "#,
        )
        .unwrap();

        create_test_config(
            r#"
            [storage]
            db_dir = ".local-ingest"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path()).unwrap();

        assert_eq!(config.storage.db_dir, PathBuf::from(".local-ingest"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        create_test_config(
            r#"
            [summarizer]
            base_url = "https://file.example.com"
            model = "from-file"
            "#,
            temp.path(),
        );

        std::env::set_var("SUMMARIES_MODEL", "from-env");
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load(temp.path()).unwrap();
        std::env::remove_var("SUMMARIES_MODEL");

        assert_eq!(config.summarizer.model, "from-env");
        assert_eq!(config.summarizer.base_url, "https://file.example.com");
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = IngestConfig::default();
        config.summarizer.model = "gpt-4o-mini".to_string();
        config.embeddings.model = "text-embedding-3-small".to_string();
        config.logging.level = "warn".to_string();

        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path()).unwrap();

        assert_eq!(loaded.summarizer.model, "gpt-4o-mini");
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".ingest/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let _: IngestConfig = toml::from_str(&content).unwrap();
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
