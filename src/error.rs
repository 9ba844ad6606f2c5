//! Error types for the learner metrics system.

use crate::cache::CacheError;
use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Query '{operation}' failed after {attempts} attempts: {reason}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        reason: String,
    },
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Cache entry '{0}' missing after refresh")]
    MissingCacheEntry(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for MetricsError {
    fn from(err: sqlx::Error) -> Self {
        MetricsError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for MetricsError {
    fn from(err: serde_json::Error) -> Self {
        MetricsError::Serialization(format!("JSON serialization error: {err}"))
    }
}

impl From<std::io::Error> for MetricsError {
    fn from(err: std::io::Error) -> Self {
        MetricsError::Serialization(format!("I/O error: {err}"))
    }
}

impl From<CacheError> for MetricsError {
    fn from(err: CacheError) -> Self {
        MetricsError::Cache(err.to_string())
    }
}

impl From<ConfigurationError> for MetricsError {
    fn from(err: ConfigurationError) -> Self {
        MetricsError::Configuration(err.to_string())
    }
}

pub type MetricsResult<T> = Result<T, MetricsError>;
