//! # Dashboard Service
//!
//! One handle that owns the reference cache, the metrics engine and the
//! report source, and answers every dashboard request. Callers hold a
//! `DashboardService` instead of reaching for shared module state.

use crate::cache::{CacheProvider, Clock, ReferenceCache, SystemClock};
use crate::config::{ConfigManager, MetricsConfig};
use crate::database::{DatabaseConnection, PgSourceStore, QueryExecutor};
use crate::error::MetricsResult;
use crate::metrics::{MetricFilter, MetricsEngine, MetricsReport};
use crate::refresh::{RefreshOutcome, SourceStore};
use crate::views::catalogue::distinct_sorted;
use crate::views::{
    grade_performance, learner_detail, learner_progress, learners_list, qset_performance,
    question_performance, GradePerformanceFilter, GradePerformanceRow, LearnerDetail,
    LearnerDetailFilter, LearnerListRow, LearnersListFilter, ProgressRow, QsetPerformanceFilter,
    QsetPerformanceRow, QuestionPerformanceRow, ReportSource,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Option lists for the dashboard filter dropdowns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOptions {
    pub schools: Vec<String>,
    /// Canonical names in ordinal order
    pub grades: Vec<String>,
    pub qset_types: Vec<String>,
    pub repositories: Vec<String>,
    pub l1_skills: Vec<String>,
    pub l2_skills: Vec<String>,
    pub l3_skills: Vec<String>,
    pub tenants: Vec<String>,
}

pub struct DashboardService<S> {
    cache: ReferenceCache<S>,
    source: Arc<S>,
    engine: MetricsEngine,
}

impl<S> std::fmt::Debug for DashboardService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardService")
            .field("cache", &self.cache)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DashboardService<PgSourceStore> {
    /// Connect to Postgres and the configured cache backend
    pub async fn connect(config_manager: &ConfigManager) -> MetricsResult<Self> {
        let config = config_manager.config();
        let db = DatabaseConnection::connect(&config.database).await?;
        let executor = QueryExecutor::new(db.pool().clone(), &config.query);
        let cache = CacheProvider::from_config(&config.cache).await?;

        info!(
            environment = config_manager.environment(),
            cache_provider = cache.provider_name(),
            "Dashboard service connected"
        );

        Ok(Self::new(
            Arc::new(PgSourceStore::new(executor)),
            cache,
            Arc::new(SystemClock),
            config,
        ))
    }
}

impl<S> DashboardService<S>
where
    S: SourceStore + ReportSource + 'static,
{
    pub fn new(source: Arc<S>, cache: CacheProvider, clock: Arc<dyn Clock>, config: &MetricsConfig) -> Self {
        let reference = ReferenceCache::new(
            cache,
            Arc::clone(&source),
            clock,
            &config.cache,
            &config.refresh,
        );
        Self {
            cache: reference,
            source,
            engine: MetricsEngine::new(config.metrics.clone()),
        }
    }

    pub fn cache(&self) -> &ReferenceCache<S> {
        &self.cache
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }

    /// Force one refresh cycle
    pub async fn refresh(&self) -> MetricsResult<RefreshOutcome> {
        self.cache.refresh().await
    }

    pub async fn last_synced_time(&self) -> MetricsResult<Option<DateTime<Utc>>> {
        self.cache.last_synced_time().await
    }

    /// Earliest and latest attempt timestamps, bounding the date pickers
    pub async fn date_bounds(&self) -> MetricsResult<Option<(NaiveDateTime, NaiveDateTime)>> {
        self.cache.min_max_timestamp().await
    }

    /// Master dashboard table; "today" comes from the cache clock
    pub async fn master_metrics(&self, filter: &MetricFilter) -> MetricsResult<MetricsReport> {
        filter.validate()?;
        let rows = self.cache.learner_attempts().await?;
        let today = self.cache.clock().today();
        debug!(rows = rows.len(), %today, "Computing master metrics");
        self.engine.compute(&rows, filter, today)
    }

    pub async fn learner_progress(&self, school: Option<&str>) -> MetricsResult<Vec<ProgressRow>> {
        let purpose = self.engine.settings().diagnostic_purpose.clone();
        let rows = self.cache.non_diagnostic_attempts(&purpose).await?;
        let last_questions = self.cache.last_questions().await?;
        Ok(learner_progress(&rows, &last_questions, school))
    }

    pub async fn grade_performance(
        &self,
        filter: &GradePerformanceFilter,
    ) -> MetricsResult<Vec<GradePerformanceRow>> {
        let scores = self.source.fetch_qset_scores(filter).await?;
        Ok(grade_performance(&scores))
    }

    /// Empty until at least one predicate is chosen
    pub async fn qset_performance(
        &self,
        filter: &QsetPerformanceFilter,
    ) -> MetricsResult<Vec<QsetPerformanceRow>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        let attempts = self.source.fetch_qset_attempts(filter).await?;
        Ok(qset_performance(&attempts, filter))
    }

    pub async fn question_performance(&self, qset_uid: &str) -> MetricsResult<Vec<QuestionPerformanceRow>> {
        let attempts = self.source.fetch_question_attempts(qset_uid).await?;
        Ok(question_performance(&attempts))
    }

    pub async fn qset_catalogue(&self, repository: Option<&str>) -> MetricsResult<Vec<String>> {
        let ids = self.source.fetch_qset_catalogue(repository).await?;
        Ok(distinct_sorted(ids))
    }

    /// Learners behind one active-learner cell of the master table
    pub async fn learners_list(&self, filter: &LearnersListFilter) -> MetricsResult<Vec<LearnerListRow>> {
        let rows = self.cache.learner_attempts().await?;
        Ok(learners_list(&rows, filter))
    }

    pub async fn learner_detail(&self, filter: &LearnerDetailFilter) -> MetricsResult<Option<LearnerDetail>> {
        let rows = self.cache.learner_attempts().await?;
        let sequences = self.source.fetch_question_sequences().await?;
        Ok(learner_detail(
            &rows,
            &sequences,
            filter,
            self.engine.settings().daily_cap_seconds,
        ))
    }

    pub async fn dropdown_options(&self) -> MetricsResult<DropdownOptions> {
        Ok(DropdownOptions {
            schools: self.cache.school_names().await?,
            grades: self.cache.grade_names().await?,
            qset_types: self.cache.qset_type_names().await?,
            repositories: self.cache.repository_names().await?,
            l1_skills: self.cache.l1_skill_names().await?,
            l2_skills: self.cache.l2_skill_names().await?,
            l3_skills: self.cache.l3_skill_names().await?,
            tenants: self.cache.tenant_names().await?,
        })
    }
}
