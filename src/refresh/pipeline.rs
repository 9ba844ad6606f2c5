//! One refresh cycle: read the source, merge, write the cache.
//!
//! Both source reads complete before the first cache write, so a failed
//! read leaves the cache at its last-known-good state. Writes are
//! sequential with no rollback; the freshness timestamp is written last.

use super::denormalize::Denormalizer;
use super::source::SourceStore;
use crate::cache::codec;
use crate::cache::store::timestamp_bounds;
use crate::cache::{CacheKey, CacheProvider, CacheService, Clock};
use crate::error::MetricsResult;
use crate::logging::{log_cache_operation, log_refresh_operation};
use crate::models::{LearnerAttempt, ReferenceSnapshot};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    Full,
    Incremental,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshMode::Full => f.write_str("full"),
            RefreshMode::Incremental => f.write_str("incremental"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub mode: RefreshMode,
    /// Rows returned by the source, including re-read boundary rows
    pub fetched_rows: usize,
    /// Snapshot growth after merging and dedup
    pub new_rows: usize,
    /// Rows in the snapshot after merging
    pub total_rows: usize,
    pub min_timestamp: Option<NaiveDateTime>,
    pub max_timestamp: Option<NaiveDateTime>,
    /// False when an incremental cycle found nothing and left the snapshot untouched
    pub snapshot_written: bool,
}

pub struct RefreshPipeline<S> {
    source: Arc<S>,
    cache: CacheProvider,
    clock: Arc<dyn Clock>,
    always_full: bool,
}

impl<S> fmt::Debug for RefreshPipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshPipeline")
            .field("cache", &self.cache)
            .field("always_full", &self.always_full)
            .finish()
    }
}

/// Drop exact duplicates, keeping the first occurrence
pub fn dedup_rows(rows: Vec<LearnerAttempt>) -> Vec<LearnerAttempt> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

impl<S: SourceStore> RefreshPipeline<S> {
    pub fn new(
        source: Arc<S>,
        cache: CacheProvider,
        clock: Arc<dyn Clock>,
        always_full: bool,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            always_full,
        }
    }

    async fn cached_snapshot(&self) -> MetricsResult<Option<Vec<LearnerAttempt>>> {
        let Some(bytes) = self.cache.get(CacheKey::LearnersData.as_str()).await? else {
            return Ok(None);
        };
        match codec::decode_snapshot(&bytes) {
            Ok(rows) => Ok(Some(rows)),
            Err(e) => {
                warn!(error = %e, "Cached snapshot is unreadable, reloading full history");
                Ok(None)
            }
        }
    }

    pub async fn run(&self) -> MetricsResult<RefreshOutcome> {
        let started = Instant::now();
        log_refresh_operation("refresh", None, None, "started", None, None);

        let existing = if self.always_full {
            None
        } else {
            self.cached_snapshot().await?
        };
        let since = existing
            .as_deref()
            .and_then(timestamp_bounds)
            .map(|(_, max)| max);
        let mode = if since.is_some() {
            RefreshMode::Incremental
        } else {
            RefreshMode::Full
        };

        let reference = match self.source.fetch_reference_snapshot().await {
            Ok(reference) => reference.normalize(),
            Err(e) => {
                log_refresh_operation("refresh", Some("reference"), None, "failed", None, Some(&e.to_string()));
                return Err(e);
            }
        };
        let raw = match self.source.fetch_learner_attempts(since).await {
            Ok(raw) => raw,
            Err(e) => {
                log_refresh_operation("refresh", Some(&mode.to_string()), None, "failed", None, Some(&e.to_string()));
                return Err(e);
            }
        };

        let fetched_rows = raw.len();
        let fresh = Denormalizer::new(&reference).apply_all(raw);
        let previous_len = match (&existing, since) {
            (Some(rows), Some(_)) => rows.len(),
            _ => 0,
        };

        let (snapshot, snapshot_changed) = match existing {
            Some(rows) if since.is_some() => {
                if fresh.is_empty() {
                    (rows, false)
                } else {
                    let mut merged = rows;
                    merged.extend(fresh);
                    (dedup_rows(merged), true)
                }
            }
            _ => (fresh, true),
        };

        if snapshot_changed {
            self.write(CacheKey::LearnersData, codec::encode_snapshot(&snapshot)?)
                .await?;
        }
        self.write_reference(&reference).await?;
        self.write(
            CacheKey::LastFetchedTime,
            codec::encode_timestamp(self.clock.now()),
        )
        .await?;

        let new_rows = snapshot.len().saturating_sub(previous_len);
        let bounds = timestamp_bounds(&snapshot);
        let outcome = RefreshOutcome {
            mode,
            fetched_rows,
            new_rows,
            total_rows: snapshot.len(),
            min_timestamp: bounds.map(|(min, _)| min),
            max_timestamp: bounds.map(|(_, max)| max),
            snapshot_written: snapshot_changed,
        };

        log_refresh_operation(
            "refresh",
            Some(&mode.to_string()),
            Some(new_rows),
            "completed",
            Some(started.elapsed().as_millis() as u64),
            None,
        );
        info!(
            mode = %outcome.mode,
            fetched_rows = outcome.fetched_rows,
            new_rows = outcome.new_rows,
            total_rows = outcome.total_rows,
            min_timestamp = ?outcome.min_timestamp,
            max_timestamp = ?outcome.max_timestamp,
            "Refresh cycle finished"
        );
        Ok(outcome)
    }

    async fn write(&self, key: CacheKey, bytes: Vec<u8>) -> MetricsResult<()> {
        self.cache.set(key.as_str(), &bytes).await?;
        log_cache_operation("set", key.as_str(), self.cache.provider_name(), "written", Some(bytes.len()));
        Ok(())
    }

    async fn write_reference(&self, reference: &ReferenceSnapshot) -> MetricsResult<()> {
        for key in CacheKey::REFERENCE {
            let bytes = match key {
                CacheKey::LastQuestionPerQsetGrade => {
                    codec::encode_table(&reference.last_question_per_qset_grade)?
                }
                CacheKey::AllLearners => codec::encode_table(&reference.learners)?,
                CacheKey::AllGrades => codec::encode_table(&reference.grades)?,
                CacheKey::AllSchools => codec::encode_table(&reference.schools)?,
                CacheKey::AllQsetTypes => codec::encode_table(&reference.qset_types)?,
                CacheKey::AllRepositoryNames => codec::encode_table(&reference.repositories)?,
                CacheKey::AllL1Skills => codec::encode_table(&reference.l1_skills)?,
                CacheKey::AllL2Skills => codec::encode_table(&reference.l2_skills)?,
                CacheKey::AllL3Skills => codec::encode_table(&reference.l3_skills)?,
                CacheKey::AllTenants => codec::encode_table(&reference.tenants)?,
                CacheKey::AllLoggedInUsers => codec::encode_table(&reference.logged_in_users)?,
                CacheKey::LearnersData | CacheKey::LastFetchedTime => continue,
            };
            self.write(key, bytes).await?;
        }
        Ok(())
    }
}
