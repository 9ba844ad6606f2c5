//! Batched, retried query execution

use super::retry::RetryPolicy;
use crate::config::QueryConfig;
use crate::error::MetricsResult;
use crate::logging::log_query_operation;
use futures::stream::{StreamExt, TryStreamExt};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::time::Instant;
use tracing::debug;

/// Runs read queries against the source store.
///
/// Rows are streamed and collected in `batch_size` chunks so a large
/// result never sits twice in memory as driver buffers plus rows.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: PgPool,
    retry: RetryPolicy,
    batch_size: usize,
}

impl QueryExecutor {
    pub fn new(pool: PgPool, config: &QueryConfig) -> Self {
        Self {
            pool,
            retry: RetryPolicy::from_config(config),
            batch_size: config.batch_size.max(1),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch every row of the query produced by `build`.
    ///
    /// `build` is called once per attempt because a built query consumes
    /// its bound arguments.
    pub async fn fetch_all_batched<T, F>(&self, operation: &str, build: F) -> MetricsResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        F: Fn() -> QueryBuilder<'static, Postgres>,
    {
        let started = Instant::now();
        let rows = self
            .retry
            .run(operation, |attempt| {
                let mut builder = build();
                let pool = self.pool.clone();
                let batch_size = self.batch_size;
                async move {
                    let mut chunks = builder
                        .build_query_as::<T>()
                        .fetch(&pool)
                        .try_chunks(batch_size);
                    let mut rows = Vec::new();
                    let mut batches = 0usize;
                    while let Some(chunk) = chunks.next().await {
                        let chunk = chunk.map_err(|e| e.1)?;
                        batches += 1;
                        debug!(
                            attempt = attempt,
                            batch = batches,
                            batch_rows = chunk.len(),
                            "Fetched row batch"
                        );
                        rows.extend(chunk);
                    }
                    Ok(rows)
                }
            })
            .await?;

        log_query_operation(
            operation,
            None,
            Some(rows.len()),
            "completed",
            Some(started.elapsed().as_millis() as u64),
            None,
        );
        Ok(rows)
    }
}
