//! Read-through reference cache
//!
//! `ReferenceCache` serves every cached table. A read is answered from the
//! cache store while the shared freshness timestamp is younger than the
//! configured window; otherwise one refresh cycle runs first. Concurrent
//! callers that find the cache stale wait on a single refresh instead of
//! each starting their own.

use super::clock::Clock;
use super::codec;
use super::keys::CacheKey;
use super::provider::CacheProvider;
use super::traits::CacheService;
use crate::config::{CacheConfig, RefreshConfig};
use crate::error::{MetricsError, MetricsResult};
use crate::logging::log_cache_operation;
use crate::models::{
    GradeRecord, LastQuestionRecord, LearnerAttempt, LearnerRecord, LoginEventRecord,
    QsetTypeRecord, RepositoryRecord, SchoolRecord, SkillRecord, TenantRecord,
};
use crate::refresh::{RefreshOutcome, RefreshPipeline, SourceStore};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Decoded value of one cache key
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    LearnerAttempts(Vec<LearnerAttempt>),
    LastFetchedTime(DateTime<Utc>),
    LastQuestions(Vec<LastQuestionRecord>),
    Learners(Vec<LearnerRecord>),
    Grades(Vec<GradeRecord>),
    Schools(Vec<SchoolRecord>),
    QsetTypes(Vec<QsetTypeRecord>),
    Repositories(Vec<RepositoryRecord>),
    L1Skills(Vec<SkillRecord>),
    L2Skills(Vec<SkillRecord>),
    L3Skills(Vec<SkillRecord>),
    Tenants(Vec<TenantRecord>),
    LoggedInUsers(Vec<LoginEventRecord>),
}

pub struct ReferenceCache<S> {
    cache: CacheProvider,
    pipeline: RefreshPipeline<S>,
    clock: Arc<dyn Clock>,
    freshness: chrono::Duration,
    refresh_gate: Mutex<()>,
}

impl<S> std::fmt::Debug for ReferenceCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("cache", &self.cache)
            .field("freshness", &self.freshness)
            .finish()
    }
}

impl<S: SourceStore> ReferenceCache<S> {
    pub fn new(
        cache: CacheProvider,
        source: Arc<S>,
        clock: Arc<dyn Clock>,
        cache_config: &CacheConfig,
        refresh_config: &RefreshConfig,
    ) -> Self {
        let freshness = chrono::Duration::from_std(cache_config.freshness_window())
            .unwrap_or_else(|_| chrono::Duration::seconds(crate::constants::DEFAULT_FRESHNESS_SECONDS as i64));
        let pipeline = RefreshPipeline::new(
            source,
            cache.clone(),
            Arc::clone(&clock),
            refresh_config.always_full,
        );
        Self {
            cache,
            pipeline,
            clock,
            freshness,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn provider(&self) -> &CacheProvider {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Time of the last completed refresh, read without triggering one
    pub async fn last_synced_time(&self) -> MetricsResult<Option<DateTime<Utc>>> {
        let Some(bytes) = self.cache.get(CacheKey::LastFetchedTime.as_str()).await? else {
            return Ok(None);
        };
        Ok(Some(codec::decode_timestamp(&bytes)?))
    }

    /// Whether the shared timestamp is inside the freshness window
    pub async fn is_fresh(&self) -> MetricsResult<bool> {
        let last = match self.last_synced_time().await {
            Ok(last) => last,
            Err(MetricsError::Cache(reason)) => {
                warn!(reason = %reason, "Unreadable freshness timestamp, treating cache as stale");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(last.is_some_and(|at| self.clock.now() - at < self.freshness))
    }

    /// Run a refresh cycle now, regardless of freshness
    pub async fn refresh(&self) -> MetricsResult<RefreshOutcome> {
        let _guard = self.refresh_gate.lock().await;
        self.pipeline.run().await
    }

    async fn fresh_bytes(&self, key: CacheKey) -> MetricsResult<Option<Vec<u8>>> {
        if !self.is_fresh().await? {
            return Ok(None);
        }
        Ok(self.cache.get(key.as_str()).await?)
    }

    /// Raw bytes of `key`, refreshing first when stale or missing
    async fn entry_bytes(&self, key: CacheKey) -> MetricsResult<Vec<u8>> {
        if let Some(bytes) = self.fresh_bytes(key).await? {
            log_cache_operation("get", key.as_str(), self.cache.provider_name(), "hit", Some(bytes.len()));
            return Ok(bytes);
        }

        let _guard = self.refresh_gate.lock().await;
        // Another caller may have finished a refresh while this one waited
        if let Some(bytes) = self.fresh_bytes(key).await? {
            debug!(key = %key, "Served by a concurrent refresh");
            return Ok(bytes);
        }

        log_cache_operation("get", key.as_str(), self.cache.provider_name(), "stale", None);
        self.pipeline.run().await?;

        self.cache
            .get(key.as_str())
            .await?
            .ok_or_else(|| MetricsError::MissingCacheEntry(key.to_string()))
    }

    async fn table<T: DeserializeOwned>(&self, key: CacheKey) -> MetricsResult<Vec<T>> {
        let bytes = self.entry_bytes(key).await?;
        Ok(codec::decode_table(&bytes)?)
    }

    /// Decoded value of any key
    pub async fn get(&self, key: CacheKey) -> MetricsResult<CacheEntry> {
        let entry = match key {
            CacheKey::LearnersData => CacheEntry::LearnerAttempts(self.learner_attempts().await?),
            CacheKey::LastFetchedTime => {
                let bytes = self.entry_bytes(key).await?;
                CacheEntry::LastFetchedTime(codec::decode_timestamp(&bytes)?)
            }
            CacheKey::LastQuestionPerQsetGrade => CacheEntry::LastQuestions(self.table(key).await?),
            CacheKey::AllLearners => CacheEntry::Learners(self.table(key).await?),
            CacheKey::AllGrades => CacheEntry::Grades(self.table(key).await?),
            CacheKey::AllSchools => CacheEntry::Schools(self.table(key).await?),
            CacheKey::AllQsetTypes => CacheEntry::QsetTypes(self.table(key).await?),
            CacheKey::AllRepositoryNames => CacheEntry::Repositories(self.table(key).await?),
            CacheKey::AllL1Skills => CacheEntry::L1Skills(self.table(key).await?),
            CacheKey::AllL2Skills => CacheEntry::L2Skills(self.table(key).await?),
            CacheKey::AllL3Skills => CacheEntry::L3Skills(self.table(key).await?),
            CacheKey::AllTenants => CacheEntry::Tenants(self.table(key).await?),
            CacheKey::AllLoggedInUsers => CacheEntry::LoggedInUsers(self.table(key).await?),
        };
        Ok(entry)
    }

    pub async fn learner_attempts(&self) -> MetricsResult<Vec<LearnerAttempt>> {
        let bytes = self.entry_bytes(CacheKey::LearnersData).await?;
        Ok(codec::decode_snapshot(&bytes)?)
    }

    /// Fact rows excluding the diagnostic question-set purpose
    pub async fn non_diagnostic_attempts(
        &self,
        diagnostic_purpose: &str,
    ) -> MetricsResult<Vec<LearnerAttempt>> {
        let mut rows = self.learner_attempts().await?;
        rows.retain(|row| !row.is_diagnostic(diagnostic_purpose));
        Ok(rows)
    }

    pub async fn last_questions(&self) -> MetricsResult<Vec<LastQuestionRecord>> {
        self.table(CacheKey::LastQuestionPerQsetGrade).await
    }

    pub async fn learners(&self) -> MetricsResult<Vec<LearnerRecord>> {
        self.table(CacheKey::AllLearners).await
    }

    pub async fn grades(&self) -> MetricsResult<Vec<GradeRecord>> {
        self.table(CacheKey::AllGrades).await
    }

    pub async fn schools(&self) -> MetricsResult<Vec<SchoolRecord>> {
        self.table(CacheKey::AllSchools).await
    }

    pub async fn qset_types(&self) -> MetricsResult<Vec<QsetTypeRecord>> {
        self.table(CacheKey::AllQsetTypes).await
    }

    pub async fn repositories(&self) -> MetricsResult<Vec<RepositoryRecord>> {
        self.table(CacheKey::AllRepositoryNames).await
    }

    pub async fn l1_skills(&self) -> MetricsResult<Vec<SkillRecord>> {
        self.table(CacheKey::AllL1Skills).await
    }

    pub async fn l2_skills(&self) -> MetricsResult<Vec<SkillRecord>> {
        self.table(CacheKey::AllL2Skills).await
    }

    pub async fn l3_skills(&self) -> MetricsResult<Vec<SkillRecord>> {
        self.table(CacheKey::AllL3Skills).await
    }

    pub async fn tenants(&self) -> MetricsResult<Vec<TenantRecord>> {
        self.table(CacheKey::AllTenants).await
    }

    pub async fn logged_in_users(&self) -> MetricsResult<Vec<LoginEventRecord>> {
        self.table(CacheKey::AllLoggedInUsers).await
    }

    pub async fn school_names(&self) -> MetricsResult<Vec<String>> {
        let rows = self.schools().await?;
        Ok(sorted_unique(rows.into_iter().filter_map(|r| r.school_name)))
    }

    pub async fn qset_type_names(&self) -> MetricsResult<Vec<String>> {
        let rows = self.qset_types().await?;
        Ok(sorted_unique(rows.into_iter().filter_map(|r| r.purpose)))
    }

    pub async fn repository_names(&self) -> MetricsResult<Vec<String>> {
        let rows = self.repositories().await?;
        Ok(sorted_unique(rows.into_iter().filter_map(|r| r.repo_name)))
    }

    pub async fn l1_skill_names(&self) -> MetricsResult<Vec<String>> {
        Ok(skill_names(self.l1_skills().await?))
    }

    pub async fn l2_skill_names(&self) -> MetricsResult<Vec<String>> {
        Ok(skill_names(self.l2_skills().await?))
    }

    pub async fn l3_skill_names(&self) -> MetricsResult<Vec<String>> {
        Ok(skill_names(self.l3_skills().await?))
    }

    pub async fn tenant_names(&self) -> MetricsResult<Vec<String>> {
        let rows = self.tenants().await?;
        Ok(sorted_unique(rows.into_iter().filter_map(|r| r.tenant_name)))
    }

    /// Canonical grade names in ordinal order
    pub async fn grade_names(&self) -> MetricsResult<Vec<String>> {
        let mut rows = self.grades().await?;
        rows.sort_by_key(|g| g.id);
        let mut names: Vec<String> = Vec::with_capacity(rows.len());
        for name in rows.into_iter().filter_map(|g| g.grade) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Earliest and latest `updated_at` in the fact snapshot
    pub async fn min_max_timestamp(
        &self,
    ) -> MetricsResult<Option<(NaiveDateTime, NaiveDateTime)>> {
        let rows = self.learner_attempts().await?;
        Ok(timestamp_bounds(&rows))
    }
}

pub(crate) fn timestamp_bounds(rows: &[LearnerAttempt]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let min = rows.iter().map(|r| r.updated_at).min()?;
    let max = rows.iter().map(|r| r.updated_at).max()?;
    Some((min, max))
}

fn skill_names(rows: Vec<SkillRecord>) -> Vec<String> {
    sorted_unique(rows.into_iter().filter_map(|r| r.name))
}

fn sorted_unique(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;

    #[test]
    fn sorted_unique_drops_duplicates() {
        let names = sorted_unique(
            ["b", "a", "b", "c"].into_iter().map(str::to_string),
        );
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn bounds_of_empty_snapshot() {
        assert_eq!(timestamp_bounds(&[]), None);

        let rows = vec![
            attempt("L1", "2024-03-05 10:00:00"),
            attempt("L1", "2024-03-04 09:00:00"),
        ];
        let (min, max) = timestamp_bounds(&rows).unwrap();
        assert_eq!(min, rows[1].updated_at);
        assert_eq!(max, rows[0].updated_at);
    }
}
