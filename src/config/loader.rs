//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate.
//! Handles directory discovery, environment detection and layered merging.

use super::error::{ConfigResult, ConfigurationError};
use super::LeadflowConfig;
use ::config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Base file name under the configuration directory
const BASE_CONFIG_NAME: &str = "leadflow";

/// Prefix for environment overrides, e.g. `LEADFLOW__DATABASE__URL`
const ENV_PREFIX: &str = "LEADFLOW";

/// Loaded configuration plus the context it was loaded from
#[derive(Debug)]
pub struct ConfigManager {
    config: LeadflowConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    ///
    /// Useful for tests that must not touch process-wide environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        if config_directory.exists() && !config_directory.is_dir() {
            return Err(ConfigurationError::DirectoryError {
                path: config_directory.display().to_string(),
                error: "path exists but is not a directory".to_string(),
            });
        }

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = environment,
            max_connections = config.database.max_connections,
            automation_enabled = config.automation.enabled,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (embedding hosts, tests)
    pub fn from_config(config: LeadflowConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &LeadflowConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<LeadflowConfig> {
        let base_path = config_directory.join(format!("{BASE_CONFIG_NAME}.toml"));
        let env_path = config_directory.join(format!("{BASE_CONFIG_NAME}.{environment}.toml"));

        let settings = Config::builder()
            .add_source(File::from(base_path).required(false))
            .add_source(File::from(env_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        settings
            .try_deserialize::<LeadflowConfig>()
            .map_err(|e| ConfigurationError::load_error(environment, e))
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("LEADFLOW_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_directory_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let manager =
            ConfigManager::load_from_directory_with_env(Some(missing), "test").unwrap();
        assert_eq!(manager.config().database.max_connections, 10);
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("leadflow.toml"),
            "[database]\nmax_connections = 20\n\n[automation]\nretry_batch_max_size = 50\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("leadflow.test.toml"),
            "[database]\nmax_connections = 3\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        assert_eq!(manager.config().database.max_connections, 3);
        assert_eq!(manager.config().automation.retry_batch_max_size, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("leadflow.toml"),
            "[events]\nchannel_capacity = 0\n",
        )
        .unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(result.is_err());
    }
}
