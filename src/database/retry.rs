//! Bounded fixed-delay retry for source queries

use crate::config::QueryConfig;
use crate::error::{MetricsError, MetricsResult};
use crate::logging::{log_error, log_query_operation};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.retry_delay(),
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> MetricsResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut number = 1;
        loop {
            let started = Instant::now();
            match attempt(number).await {
                Ok(value) => {
                    log_query_operation(
                        operation,
                        Some(number),
                        None,
                        "success",
                        Some(started.elapsed().as_millis() as u64),
                        None,
                    );
                    return Ok(value);
                }
                Err(err) if !is_transient(&err) => {
                    log_query_operation(
                        operation,
                        Some(number),
                        None,
                        "failed",
                        Some(started.elapsed().as_millis() as u64),
                        Some(&err.to_string()),
                    );
                    return Err(MetricsError::from(err));
                }
                Err(err) if number >= self.max_attempts => {
                    log_error("query", operation, &err.to_string(), Some("retry attempts exhausted"));
                    return Err(MetricsError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: number,
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    warn!(
                        operation = %operation,
                        attempt = number,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %err,
                        "Transient query failure, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    number += 1;
                }
            }
        }
    }
}

/// Connection-level failures worth another attempt
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code.starts_with("57P0")),
        _ => false,
    }
}
