//! Report-side reads that bypass the cached snapshot
//!
//! The question-set and question pages read the relational store directly
//! with the user's filters. `ReportSource` is that seam; the PostgreSQL
//! implementation lives in `database::source`.

use crate::error::MetricsResult;
use crate::models::QuestionSequenceRecord;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradePerformanceFilter {
    pub purpose: Option<String>,
    pub repository: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QsetPerformanceFilter {
    /// Question-set public ids (`x_id`)
    pub qset_ids: Vec<String>,
    pub operation: Option<String>,
    pub l2_skill: Option<String>,
    pub l3_skill: Option<String>,
    pub purpose: Option<String>,
}

impl QsetPerformanceFilter {
    pub fn is_empty(&self) -> bool {
        self.qset_ids.is_empty()
            && self.operation.is_none()
            && self.l2_skill.is_none()
            && self.l3_skill.is_none()
            && self.purpose.is_none()
    }
}

/// Question-set level score of one completed journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QsetScore {
    pub operation: Option<String>,
    pub qset_grade: Option<String>,
    pub question_set_id: String,
    pub qset_name: Option<String>,
    pub score: Option<f64>,
}

/// Question-level answer within a completed journey, with question-set descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QsetAttempt {
    pub question_set_id: String,
    pub question_set_uid: Option<String>,
    pub learner_id: Option<String>,
    pub operation: Option<String>,
    pub qset_grade: Option<String>,
    pub sequence: Option<i64>,
    pub purpose: Option<String>,
    pub qset_name: Option<String>,
    pub l2_skill: Option<String>,
    pub l3_skill: Option<String>,
    pub score: Option<f64>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Question-level answer with question-set and question positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QuestionAttempt {
    pub question_set_id: String,
    pub qs_seq: Option<i64>,
    pub question_id: String,
    pub q_seq: Option<i64>,
    pub learner_id: String,
    pub score: Option<f64>,
    pub updated_at: NaiveDateTime,
}

#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_qset_scores(&self, filter: &GradePerformanceFilter) -> MetricsResult<Vec<QsetScore>>;

    async fn fetch_qset_attempts(&self, filter: &QsetPerformanceFilter) -> MetricsResult<Vec<QsetAttempt>>;

    /// Question-level attempts for one question set public id
    async fn fetch_question_attempts(&self, qset_uid: &str) -> MetricsResult<Vec<QuestionAttempt>>;

    /// Question-set public ids, optionally limited to one repository name
    async fn fetch_qset_catalogue(&self, repository: Option<&str>) -> MetricsResult<Vec<String>>;

    async fn fetch_question_sequences(&self) -> MetricsResult<Vec<QuestionSequenceRecord>>;
}
