//! Configuration Loader
//!
//! Environment-aware loading: a base file, an optional per-environment override
//! file and `REPLICATION_FLOW__*` environment variables, merged by the `config`
//! crate and deserialized into a validated [`FlowConfig`].

use super::error::{ConfigResult, ConfigurationError};
use super::{FlowConfig, JobRegistry};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];
const ENV_PREFIX: &str = "REPLICATION_FLOW";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigManager {
    config: FlowConfig,
    registry: JobRegistry,
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

    /// Load configuration from a specific directory with explicit environment.
    /// Tests use this to avoid touching process-wide environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        let manager = Self::build(config, environment, config_directory)?;

        info!(
            environment = %environment,
            jobs = manager.config.jobs.len(),
            job_flows = manager.config.job_flows.len(),
            event_bus = %manager.config.event_bus.name,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(manager))
    }

    /// Wrap an already-built configuration, validating it the same way files are
    pub fn from_config(config: FlowConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        Self::build(config, environment, PathBuf::new()).map(Arc::new)
    }

    fn build(
        config: FlowConfig,
        environment: &str,
        config_directory: PathBuf,
    ) -> ConfigResult<ConfigManager> {
        config.validate()?;

        debug!(
            "Resolved configuration: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        let registry = JobRegistry::from_config(&config);
        Ok(ConfigManager {
            config,
            registry,
            environment: environment.to_string(),
            config_directory,
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with sensitive-looking values masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn detect_environment() -> String {
        crate::logging::get_environment().to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        std::env::var("REPLICATION_FLOW_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config").join("replication-flow"))
    }

    fn find_config_file(config_directory: &Path, stem: &str) -> Option<PathBuf> {
        CONFIG_EXTENSIONS
            .iter()
            .map(|extension| config_directory.join(format!("{stem}.{extension}")))
            .find(|path| path.is_file())
    }

    fn load_and_merge_config(config_directory: &Path, environment: &str) -> ConfigResult<FlowConfig> {
        let base = Self::find_config_file(config_directory, "base").ok_or_else(|| {
            ConfigurationError::config_file_not_found(
                CONFIG_EXTENSIONS
                    .iter()
                    .map(|extension| config_directory.join(format!("base.{extension}")))
                    .collect(),
            )
        })?;
        debug!("Found base configuration file: {}", base.display());

        let mut builder = Config::builder().add_source(File::from(base.as_path()));

        if let Some(overrides) = Self::find_config_file(config_directory, environment) {
            debug!(
                "Applying environment-specific overrides from: {}",
                overrides.display()
            );
            builder = builder.add_source(File::from(overrides.as_path()));
        }

        let merged = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::parse_error(base.display().to_string(), e))?;

        merged
            .try_deserialize::<FlowConfig>()
            .map_err(|e| ConfigurationError::parse_error(base.display().to_string(), e))
    }

    fn sanitize_config_for_logging(config: &FlowConfig) -> serde_json::Value {
        let mut config_json = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        let sensitive_patterns = ["password", "secret", "token", "credential", "auth"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if !is_sensitive {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                        continue;
                    }

                    *val = match val {
                        serde_json::Value::String(s) if s.is_empty() => {
                            serde_json::Value::String("[EMPTY]".to_string())
                        }
                        serde_json::Value::String(s) => {
                            let chars: Vec<char> = s.chars().collect();
                            let masked = if chars.len() > 4 {
                                format!(
                                    "{}***{}",
                                    chars[..2].iter().collect::<String>(),
                                    chars[chars.len() - 2..].iter().collect::<String>()
                                )
                            } else {
                                "***".to_string()
                            };
                            serde_json::Value::String(format!("[MASKED: {masked}]"))
                        }
                        serde_json::Value::Null => serde_json::Value::Null,
                        _ => serde_json::Value::String("[MASKED]".to_string()),
                    };
                }
            }
            serde_json::Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("environment", &self.environment)
            .field("config_directory", &self.config_directory)
            .field("jobs", &self.registry.job_count())
            .finish()
    }
}
