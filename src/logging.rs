//! # Structured Logging Module
//!
//! Environment-aware structured logging that writes to the console and to a
//! JSON log file, so refresh cycles and metric computations can be traced after
//! the fact.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level));

        let log_dir = PathBuf::from("log");
        let file_ready = log_dir.exists() || fs::create_dir_all(&log_dir).is_ok();

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");

        let (file_layer, guard) = if file_ready {
            let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(log_level));
            (Some(layer), Some(guard))
        } else {
            (None, None)
        };

        // A host application may already own the global subscriber.
        if tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_output = file_ready,
            "STRUCTURED LOGGING: Initialized"
        );

        // The worker guard must outlive every writer.
        if let Some(guard) = guard {
            std::mem::forget(guard);
        }
    });
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var("LEARNER_METRICS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" | "development" => "debug",
        _ => "debug",
    }
}

/// Log structured data for refresh cycles
pub fn log_refresh_operation(
    operation: &str,
    mode: Option<&str>,
    rows: Option<usize>,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        mode = mode,
        rows = rows,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "REFRESH_OPERATION"
    );
}

/// Log structured data for source queries
pub fn log_query_operation(
    operation: &str,
    attempt: Option<u32>,
    rows: Option<usize>,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        attempt = attempt,
        rows = rows,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "QUERY_OPERATION"
    );
}

/// Log structured data for cache store access
pub fn log_cache_operation(
    operation: &str,
    key: &str,
    provider: &str,
    status: &str,
    bytes: Option<usize>,
) {
    tracing::debug!(
        operation = %operation,
        key = %key,
        provider = %provider,
        status = %status,
        bytes = bytes,
        timestamp = %Utc::now().to_rfc3339(),
        "CACHE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_refresh_operation("refresh", Some("full"), Some(0), "ok", None, None);
    }
}
