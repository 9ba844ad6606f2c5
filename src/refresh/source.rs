//! Boundary between the refresh pipeline and the relational store

use crate::error::MetricsResult;
use crate::models::{RawAttempt, ReferenceSnapshot};
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Attempt rows updated at or after `since`, or the full history for `None`
    async fn fetch_learner_attempts(
        &self,
        since: Option<NaiveDateTime>,
    ) -> MetricsResult<Vec<RawAttempt>>;

    /// Every reference table, read in one pass
    async fn fetch_reference_snapshot(&self) -> MetricsResult<ReferenceSnapshot>;
}
