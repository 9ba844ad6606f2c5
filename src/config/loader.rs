//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery, environment
//! detection, deep merging of environment sections and environment variable
//! overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::MetricsConfig;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_NAMES: [&str; 2] = ["learner-metrics.yaml", "learner-metrics.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration plus the context it was resolved in
#[derive(Debug)]
pub struct ConfigManager {
    config: MetricsConfig,
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

    /// Load configuration from a specific directory with an explicit environment
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

        let mut config = Self::load_and_merge_config(&config_directory, environment)?;
        config.apply_env_overrides()?;
        config.validate()?;

        let sanitized_config = Self::sanitize_config_for_logging(&config);
        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&sanitized_config)
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = environment,
            cache_backend = %config.cache.backend,
            freshness_seconds = config.cache.freshness_seconds,
            max_attempts = config.query.max_attempts,
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, for embedding and tests
    pub fn from_config(mut config: MetricsConfig, environment: &str) -> ConfigResult<Self> {
        config.environment = environment.to_string();
        config.validate()?;
        Ok(Self {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        })
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Configuration as JSON with sensitive fields masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        crate::logging::get_environment().to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let dir = PathBuf::from(manifest_dir).join("config");
            if dir.exists() {
                return dir;
            }
        }
        PathBuf::from("config")
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.is_file() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<MetricsConfig> {
        let config_file = Self::find_config_file(config_directory)?;
        let yaml_content = std::fs::read_to_string(&config_file)
            .map_err(|e| ConfigurationError::file_read_error(config_file.display().to_string(), e))?;

        let mut config = Self::parse_with_environment(&yaml_content, environment)
            .map_err(|e| match e {
                ConfigurationError::InvalidYaml { error, .. } => {
                    ConfigurationError::invalid_yaml(config_file.display().to_string(), error)
                }
                other => other,
            })?;
        config.environment = environment.to_string();
        Ok(config)
    }

    /// Parse a YAML document and fold the named environment section over it
    pub(crate) fn parse_with_environment(
        yaml_content: &str,
        environment: &str,
    ) -> ConfigResult<MetricsConfig> {
        let mut yaml_data: YamlValue = serde_yaml::from_str(yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml("<inline>", e))?;

        if yaml_data.is_null() {
            yaml_data = YamlValue::Mapping(Default::default());
        }

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!(
                "Applying environment-specific overrides for: {}",
                environment
            );
            Self::merge_yaml_values(&mut yaml_data, env_overrides)?;
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                "<inline>",
                format!("Failed to deserialize configuration: {e}"),
            )
        })
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) -> ConfigResult<()> {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value)?;
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (YamlValue::Mapping(_), other) if !other.is_null() => {
                return Err(ConfigurationError::ConfigMergeError {
                    error: format!("environment section must be a mapping, found {other:?}"),
                });
            }
            (_, YamlValue::Null) => {}
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
        Ok(())
    }

    fn sanitize_config_for_logging(config: &MetricsConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["password", "secret", "token", "credential"];
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

                    if is_sensitive {
                        *val = match val {
                            serde_json::Value::String(s) if s.is_empty() => {
                                serde_json::Value::String("[EMPTY]".to_string())
                            }
                            _ => serde_json::Value::String("[MASKED]".to_string()),
                        };
                    } else if key_lower == "url" {
                        if let serde_json::Value::String(s) = val {
                            *s = redact_url(s);
                        }
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

/// Replace the userinfo of a connection URL with `***`
pub(crate) fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            if scheme_end < at_pos {
                return format!("{}://***@{}", &url[..scheme_end], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
