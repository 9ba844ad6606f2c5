//! PostgreSQL implementation of the source-store and report-source seams

use super::filters::{push_where, Predicate};
use super::query_executor::QueryExecutor;
use crate::error::MetricsResult;
use crate::models::{
    GradeRecord, LastQuestionRecord, LearnerRecord, LocalizedText, LoginEventRecord, QsetTypeRecord,
    QuestionSequenceRecord, RawAttempt, ReferenceSnapshot, RepositoryRecord, RepositoryRef, SchoolRecord,
    SkillRecord, Taxonomy, TenantRecord,
};
use crate::refresh::SourceStore;
use crate::views::{
    GradePerformanceFilter, QsetAttempt, QsetPerformanceFilter, QsetScore, QuestionAttempt, ReportSource,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder};
use tracing::debug;

const LEARNER_ATTEMPTS_SQL: &str = r#"
SELECT
    tn.name->>'en' AS tenant_name,
    sc.name AS school,
    cm.name->>'en' AS learner_grade,
    lr.name AS learner_name,
    lr.username AS learner_username,
    lpd.learner_id,
    lpd.question_id,
    lpd.question_set_id,
    lpd.updated_at::timestamp AS updated_at,
    lpd.attempts_count::int8 AS attempts_count,
    lpd.score::float8 AS score,
    lpd.taxonomy AS attempt_taxonomy,
    qs.taxonomy AS qset_taxonomy,
    qs.title AS qset_title,
    qs.x_id AS qset_uid,
    qs.purpose,
    qs.repository AS qset_repository,
    qs.sequence::int8 AS sequence,
    lj.status
FROM learner_proficiency_question_level_data lpd
LEFT JOIN question_set qs ON lpd.question_set_id = qs.identifier
LEFT JOIN learner lr ON lpd.learner_id = lr.identifier
LEFT JOIN class_master cm ON lr.class_id = cm.identifier
LEFT JOIN school sc ON lr.school_id = sc.identifier
LEFT JOIN learner_journey lj ON lj.question_set_id = lpd.question_set_id AND lj.learner_id = lpd.learner_id
LEFT JOIN tenant tn ON lr.tenant_id = tn.identifier"#;

const LAST_QUESTION_SQL: &str = r#"
WITH ranked_question_sets AS (
    SELECT
        identifier,
        taxonomy->'l1_skill'->'name'->>'en' AS operation,
        taxonomy->'class'->'name'->>'en' AS qset_grade,
        ROW_NUMBER() OVER (
            PARTITION BY taxonomy->'class'->'name'->>'en', taxonomy->'l1_skill'->'name'->>'en'
            ORDER BY sequence DESC
        ) AS rn
    FROM question_set
),
ranked_questions AS (
    SELECT
        question_id,
        question_set_id,
        ROW_NUMBER() OVER (PARTITION BY question_set_id ORDER BY sequence DESC) AS rn
    FROM question_set_question_mapping
)
SELECT rqs.operation, rqs.qset_grade, rq.question_set_id, rq.question_id
FROM ranked_question_sets rqs
LEFT JOIN ranked_questions rq ON rqs.identifier = rq.question_set_id
WHERE rqs.rn = 1 AND rq.rn = 1"#;

const LEARNERS_SQL: &str = "SELECT DISTINCT lr.identifier, lr.username AS user_name, lr.name AS name, \
     sc.name AS school FROM learner lr LEFT JOIN school sc ON lr.school_id = sc.identifier";
const GRADES_SQL: &str = "SELECT identifier, id::int8 AS id, name->>'en' AS grade FROM class_master";
const SCHOOLS_SQL: &str = "SELECT name AS school_name FROM school";
const QSET_TYPES_SQL: &str = "SELECT DISTINCT purpose FROM question_set";
const REPOSITORIES_SQL: &str = "SELECT identifier, name->>'en' AS repo_name FROM repository";
const L1_SKILLS_SQL: &str = "SELECT identifier, name->>'en' AS name FROM skill_master WHERE type = 'l1_skill'";
const L2_SKILLS_SQL: &str = "SELECT identifier, name->>'en' AS name FROM skill_master WHERE type = 'l2_skill'";
const L3_SKILLS_SQL: &str = "SELECT identifier, name->>'en' AS name FROM skill_master WHERE type = 'l3_skill'";
const TENANTS_SQL: &str = "SELECT DISTINCT id::text AS id, name->>'en' AS tenant_name FROM tenant";

const LOGGED_IN_USERS_SQL: &str = r#"
SELECT td.id::text AS id, td.level, td.learner_id, td.created_on::timestamp AS created_on,
    sc.name AS school, cm.name->>'en' AS grade, tn.name->>'en' AS tenant_name
FROM telemetry_data td
LEFT JOIN learner lr ON lr.identifier = td.learner_id
LEFT JOIN school sc ON sc.identifier = lr.school_id
LEFT JOIN class_master cm ON cm.identifier = lr.class_id
LEFT JOIN tenant tn ON tn.identifier = lr.tenant_id
WHERE td.event_type = 'learner_logged_in'"#;

const QSET_SCORES_SQL: &str = r#"
SELECT lj.question_set_id, lpd.taxonomy, qs.title, lpd.score::float8 AS score
FROM learner_journey lj
LEFT JOIN learner_proficiency_question_set_level_data lpd
    ON lj.question_set_id = lpd.question_set_id AND lj.learner_id = lpd.learner_id
LEFT JOIN question_set qs ON qs.identifier = lj.question_set_id
LEFT JOIN repository repo ON repo.identifier = qs.repository->>'identifier'"#;

const QSET_ATTEMPTS_SQL: &str = r#"
SELECT
    lj.question_set_id,
    qs.x_id AS question_set_uid,
    lpd.learner_id,
    qs.taxonomy,
    qs.sequence::int8 AS sequence,
    qs.purpose,
    qs.title,
    lpd.score::float8 AS score,
    lpd.updated_at::timestamp AS updated_at
FROM learner_journey lj
LEFT JOIN learner_proficiency_question_level_data lpd
    ON lj.question_set_id = lpd.question_set_id AND lj.learner_id = lpd.learner_id
LEFT JOIN question_set qs ON qs.identifier = lj.question_set_id"#;

const QUESTION_ATTEMPTS_SQL: &str = r#"
SELECT
    lpd.question_set_id,
    qs.sequence::int8 AS qs_seq,
    lpd.question_id,
    qsqm.sequence::int8 AS q_seq,
    lpd.learner_id,
    lpd.score::float8 AS score,
    lpd.updated_at::timestamp AS updated_at
FROM learner_proficiency_question_level_data lpd
LEFT JOIN question_set_question_mapping qsqm
    ON qsqm.question_set_id = lpd.question_set_id AND qsqm.question_id = lpd.question_id
LEFT JOIN question_set qs ON qs.identifier = lpd.question_set_id"#;

const QSET_CATALOGUE_SQL: &str = "SELECT DISTINCT qs.x_id AS qset_id FROM question_set qs \
     LEFT JOIN repository repo ON repo.identifier = qs.repository->>'identifier'";
const QUESTION_SEQUENCES_SQL: &str =
    "SELECT question_id, question_set_id, sequence::int8 AS sequence FROM question_set_question_mapping";

const COMPLETED: &str = "completed";

#[derive(Debug, FromRow)]
struct AttemptRow {
    tenant_name: Option<String>,
    school: Option<String>,
    learner_grade: Option<String>,
    learner_name: Option<String>,
    learner_username: Option<String>,
    learner_id: String,
    question_id: String,
    question_set_id: String,
    updated_at: NaiveDateTime,
    attempts_count: Option<i64>,
    score: Option<f64>,
    attempt_taxonomy: Option<Json<Taxonomy>>,
    qset_taxonomy: Option<Json<Taxonomy>>,
    qset_title: Option<Json<LocalizedText>>,
    qset_uid: Option<String>,
    purpose: Option<String>,
    qset_repository: Option<Json<RepositoryRef>>,
    sequence: Option<i64>,
    status: Option<String>,
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

impl From<AttemptRow> for RawAttempt {
    fn from(row: AttemptRow) -> Self {
        let attempt = row.attempt_taxonomy.map(|json| json.0).unwrap_or_default();
        let qset = row.qset_taxonomy.map(|json| json.0).unwrap_or_default();
        RawAttempt {
            tenant_name: row.tenant_name,
            school: row.school,
            learner_grade: row.learner_grade,
            learner_name: row.learner_name,
            learner_username: row.learner_username,
            learner_id: row.learner_id,
            question_id: row.question_id,
            question_set_id: row.question_set_id,
            updated_at: row.updated_at,
            attempts_count: row.attempts_count,
            score: row.score,
            qset_grade_identifier: owned(attempt.grade_identifier()),
            operation_identifier: owned(attempt.operation_identifier()),
            qset_name: row.qset_title.and_then(|title| owned(title.0.en())),
            qset_uid: row.qset_uid,
            purpose: row.purpose,
            repository_identifier: row.qset_repository.and_then(|repo| repo.0.identifier),
            l1_skill_identifier: owned(qset.operation_identifier()),
            l2_skill_identifier: owned(qset.l2_identifier()),
            l3_skill_identifier: owned(qset.l3_identifier()),
            sequence: row.sequence,
            status: row.status,
        }
    }
}

#[derive(Debug, FromRow)]
struct QsetScoreRow {
    question_set_id: String,
    taxonomy: Option<Json<Taxonomy>>,
    title: Option<Json<LocalizedText>>,
    score: Option<f64>,
}

impl From<QsetScoreRow> for QsetScore {
    fn from(row: QsetScoreRow) -> Self {
        let taxonomy = row.taxonomy.map(|json| json.0).unwrap_or_default();
        QsetScore {
            operation: owned(taxonomy.operation_name()),
            qset_grade: owned(taxonomy.grade_name()),
            question_set_id: row.question_set_id,
            qset_name: row.title.and_then(|title| owned(title.0.en())),
            score: row.score,
        }
    }
}

#[derive(Debug, FromRow)]
struct QsetAttemptRow {
    question_set_id: String,
    question_set_uid: Option<String>,
    learner_id: Option<String>,
    taxonomy: Option<Json<Taxonomy>>,
    sequence: Option<i64>,
    purpose: Option<String>,
    title: Option<Json<LocalizedText>>,
    score: Option<f64>,
    updated_at: Option<NaiveDateTime>,
}

impl From<QsetAttemptRow> for QsetAttempt {
    fn from(row: QsetAttemptRow) -> Self {
        let taxonomy = row.taxonomy.map(|json| json.0).unwrap_or_default();
        QsetAttempt {
            question_set_id: row.question_set_id,
            question_set_uid: row.question_set_uid,
            learner_id: row.learner_id,
            operation: owned(taxonomy.operation_name()),
            qset_grade: owned(taxonomy.grade_name()),
            sequence: row.sequence,
            purpose: row.purpose,
            qset_name: row.title.and_then(|title| owned(title.0.en())),
            l2_skill: owned(taxonomy.l2_name()),
            l3_skill: owned(taxonomy.l3_name()),
            score: row.score,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct QsetIdRow {
    qset_id: Option<String>,
}

/// Reads the learning platform's relational schema
#[derive(Debug, Clone)]
pub struct PgSourceStore {
    executor: QueryExecutor,
}

impl PgSourceStore {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    async fn fetch_table<T>(&self, operation: &str, sql: &'static str) -> MetricsResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        self.executor
            .fetch_all_batched(operation, || QueryBuilder::new(sql))
            .await
    }

    async fn fetch_filtered<T>(
        &self,
        operation: &str,
        sql: &'static str,
        predicates: &[Predicate],
    ) -> MetricsResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        self.executor
            .fetch_all_batched(operation, || {
                let mut builder = QueryBuilder::new(sql);
                push_where(&mut builder, predicates);
                builder
            })
            .await
    }
}

#[async_trait]
impl SourceStore for PgSourceStore {
    async fn fetch_learner_attempts(&self, since: Option<NaiveDateTime>) -> MetricsResult<Vec<RawAttempt>> {
        let predicates: Vec<Predicate> = since
            .map(|since| Predicate::at_least("lpd.updated_at", since))
            .into_iter()
            .collect();
        let rows: Vec<AttemptRow> = self
            .fetch_filtered("learner_attempts", LEARNER_ATTEMPTS_SQL, &predicates)
            .await?;
        Ok(rows.into_iter().map(RawAttempt::from).collect())
    }

    async fn fetch_reference_snapshot(&self) -> MetricsResult<ReferenceSnapshot> {
        let (last_question_per_qset_grade, learners, grades, schools, qset_types, repositories) = tokio::try_join!(
            self.fetch_table::<LastQuestionRecord>("last_question_per_qset_grade", LAST_QUESTION_SQL),
            self.fetch_table::<LearnerRecord>("all_learners", LEARNERS_SQL),
            self.fetch_table::<GradeRecord>("all_grades", GRADES_SQL),
            self.fetch_table::<SchoolRecord>("all_schools", SCHOOLS_SQL),
            self.fetch_table::<QsetTypeRecord>("all_qset_types", QSET_TYPES_SQL),
            self.fetch_table::<RepositoryRecord>("all_repository_names", REPOSITORIES_SQL),
        )?;
        let (l1_skills, l2_skills, l3_skills, tenants, logged_in_users) = tokio::try_join!(
            self.fetch_table::<SkillRecord>("all_l1_skills", L1_SKILLS_SQL),
            self.fetch_table::<SkillRecord>("all_l2_skills", L2_SKILLS_SQL),
            self.fetch_table::<SkillRecord>("all_l3_skills", L3_SKILLS_SQL),
            self.fetch_table::<TenantRecord>("all_tenants", TENANTS_SQL),
            self.fetch_table::<LoginEventRecord>("all_logged_in_users", LOGGED_IN_USERS_SQL),
        )?;

        debug!(
            learners = learners.len(),
            grades = grades.len(),
            schools = schools.len(),
            login_events = logged_in_users.len(),
            "Fetched reference snapshot"
        );

        Ok(ReferenceSnapshot {
            last_question_per_qset_grade,
            learners,
            grades,
            schools,
            qset_types,
            repositories,
            l1_skills,
            l2_skills,
            l3_skills,
            tenants,
            logged_in_users,
        })
    }
}

#[async_trait]
impl ReportSource for PgSourceStore {
    async fn fetch_qset_scores(&self, filter: &GradePerformanceFilter) -> MetricsResult<Vec<QsetScore>> {
        let mut predicates = vec![Predicate::eq("lj.status", COMPLETED)];
        if let Some(purpose) = &filter.purpose {
            predicates.push(Predicate::eq("qs.purpose", purpose.as_str()));
        }
        if let Some(repository) = &filter.repository {
            predicates.push(Predicate::eq("repo.name->>'en'", repository.as_str()));
        }
        let rows: Vec<QsetScoreRow> = self
            .fetch_filtered("qset_scores", QSET_SCORES_SQL, &predicates)
            .await?;
        Ok(rows.into_iter().map(QsetScore::from).collect())
    }

    async fn fetch_qset_attempts(&self, filter: &QsetPerformanceFilter) -> MetricsResult<Vec<QsetAttempt>> {
        let mut predicates = vec![Predicate::eq("lj.status", COMPLETED)];
        if !filter.qset_ids.is_empty() {
            predicates.push(Predicate::is_in("qs.x_id", filter.qset_ids.iter().cloned()));
        }
        if let Some(purpose) = &filter.purpose {
            predicates.push(Predicate::eq("qs.purpose", purpose.as_str()));
        }
        let rows: Vec<QsetAttemptRow> = self
            .fetch_filtered("qset_attempts", QSET_ATTEMPTS_SQL, &predicates)
            .await?;
        Ok(rows.into_iter().map(QsetAttempt::from).collect())
    }

    async fn fetch_question_attempts(&self, qset_uid: &str) -> MetricsResult<Vec<QuestionAttempt>> {
        let predicates = [Predicate::eq("qs.x_id", qset_uid)];
        self.fetch_filtered("question_attempts", QUESTION_ATTEMPTS_SQL, &predicates)
            .await
    }

    async fn fetch_qset_catalogue(&self, repository: Option<&str>) -> MetricsResult<Vec<String>> {
        let predicates: Vec<Predicate> = repository
            .map(|name| Predicate::eq("repo.name->>'en'", name))
            .into_iter()
            .collect();
        let rows: Vec<QsetIdRow> = self
            .fetch_filtered("qset_catalogue", QSET_CATALOGUE_SQL, &predicates)
            .await?;
        Ok(rows.into_iter().filter_map(|row| row.qset_id).collect())
    }

    async fn fetch_question_sequences(&self) -> MetricsResult<Vec<QuestionSequenceRecord>> {
        self.fetch_table("question_sequences", QUESTION_SEQUENCES_SQL).await
    }
}
