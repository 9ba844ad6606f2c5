//! # Learner Metrics Configuration System
//!
//! YAML-based configuration for the source database, the cache store, query
//! retry behaviour, the refresh cycle and the metric engine constants.
//!
//! ## Architecture
//!
//! - **Single Source of Truth**: configuration comes from `config/learner-metrics.yaml`
//! - **Environment Awareness**: `development` / `test` / `production` sections override the base
//! - **Explicit Validation**: invalid values fail loading instead of being silently replaced
//!
//! ## Usage
//!
//! ```rust,no_run
//! use learner_metrics::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let freshness = manager.config().cache.freshness_window();
//! let attempts = manager.config().query.max_attempts;
//! # let _ = (freshness, attempts);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring learner-metrics.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Source database connection and pooling
    pub database: DatabaseConfig,

    /// Cache store backend and freshness window
    pub cache: CacheConfig,

    /// Query retry and batching
    pub query: QueryConfig,

    /// Refresh cycle behaviour
    pub refresh: RefreshConfig,

    /// Metric engine constants
    pub metrics: MetricsSettings,

    /// Environment the configuration was resolved for
    #[serde(skip_deserializing)]
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            database: "learner_metrics".to_string(),
            max_connections: 15,
            min_connections: 5,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL built from `url` or the discrete fields
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Cache store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Moka,
}

impl std::str::FromStr for CacheBackend {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "moka" | "memory" | "in-memory" => Ok(Self::Moka),
            other => Err(ConfigurationError::invalid_value(
                "cache.backend",
                other,
                "expected one of: redis, moka",
            )),
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Moka => write!(f, "moka"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Age after which the shared freshness timestamp is stale
    pub freshness_seconds: u64,

    pub redis: RedisConfig,
    pub moka: MokaConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            freshness_seconds: constants::DEFAULT_FRESHNESS_SECONDS,
            redis: RedisConfig::default(),
            moka: MokaConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub connection_timeout_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MokaConfig {
    pub max_capacity: u64,
}

impl Default for MokaConfig {
    fn default() -> Self {
        Self { max_capacity: 64 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Rows accumulated per streamed batch
    pub batch_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_QUERY_ATTEMPTS,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY_MS,
            batch_size: constants::DEFAULT_BATCH_SIZE,
        }
    }
}

impl QueryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Force a full historical load on every cycle
    pub always_full: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub session_min_learners: usize,
    pub daily_cap_seconds: i64,
    pub trailing_weeks: i64,
    pub diagnostic_purpose: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            session_min_learners: constants::SESSION_MIN_LEARNERS,
            daily_cap_seconds: constants::DAILY_CAP_SECONDS,
            trailing_weeks: constants::TRAILING_WEEKS,
            diagnostic_purpose: constants::DIAGNOSTIC_PURPOSE.to_string(),
        }
    }
}

impl MetricsConfig {
    /// Apply environment variable overrides on top of the file values
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.cache.redis.url = url;
        }
        if let Ok(backend) = std::env::var("LEARNER_METRICS_CACHE_BACKEND") {
            self.cache.backend = backend.parse()?;
        }
        if let Ok(seconds) = std::env::var("LEARNER_METRICS_FRESHNESS_SECONDS") {
            self.cache.freshness_seconds = seconds.trim().parse().map_err(|_| {
                ConfigurationError::invalid_value(
                    "cache.freshness_seconds",
                    seconds.clone(),
                    "must be a positive integer",
                )
            })?;
        }
        Ok(())
    }

    /// Reject values that would break the refresh or metric pipeline
    pub fn validate(&self) -> ConfigResult<()> {
        if self.query.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "query.max_attempts",
                "0",
                "at least one attempt is required",
            ));
        }

        if self.query.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "query.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        if self.cache.freshness_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.freshness_seconds",
                "0",
                "freshness window must be greater than 0",
            ));
        }

        if self.cache.backend == CacheBackend::Moka && self.cache.moka.max_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.moka.max_capacity",
                "0",
                "capacity must hold every cache key",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.metrics.session_min_learners == 0 {
            return Err(ConfigurationError::invalid_value(
                "metrics.session_min_learners",
                "0",
                "a session needs at least one learner",
            ));
        }

        if self.metrics.daily_cap_seconds <= 0 {
            return Err(ConfigurationError::invalid_value(
                "metrics.daily_cap_seconds",
                self.metrics.daily_cap_seconds.to_string(),
                "daily cap must be positive",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_pipeline_constants() {
        let config = MetricsConfig::default();
        assert_eq!(config.cache.freshness_window(), Duration::from_secs(3600));
        assert_eq!(config.query.max_attempts, 3);
        assert_eq!(config.query.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.metrics.session_min_learners, 3);
        assert_eq!(config.metrics.daily_cap_seconds, 2700);
        assert_eq!(config.metrics.trailing_weeks, 5);
        assert_eq!(config.metrics.diagnostic_purpose, "Main Diagnostic");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn database_url_prefers_explicit_url() {
        let mut db = DatabaseConfig::default();
        assert_eq!(
            db.database_url(),
            "postgresql://postgres:@localhost:5432/learner_metrics"
        );
        db.url = Some("postgresql://reader@db/analytics".to_string());
        assert_eq!(db.database_url(), "postgresql://reader@db/analytics");
    }

    #[test]
    fn validation_rejects_zero_values() {
        let mut config = MetricsConfig::default();
        config.query.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. }) if field == "query.max_attempts"
        ));

        let mut config = MetricsConfig::default();
        config.query.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = MetricsConfig::default();
        config.cache.freshness_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cache_backend_parsing() {
        assert_eq!("redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!(" Moka ".parse::<CacheBackend>().unwrap(), CacheBackend::Moka);
        assert!("memcached".parse::<CacheBackend>().is_err());
    }
}
