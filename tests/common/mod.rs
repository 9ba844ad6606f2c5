//! Shared fixtures for integration tests: an in-memory source store, a
//! reference snapshot whose identifiers match `raw()`, and a service wired
//! to the Moka backend and a manual clock.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use learner_metrics::cache::{CacheProvider, ManualClock};
use learner_metrics::models::{
    GradeRecord, LastQuestionRecord, QsetTypeRecord, QuestionSequenceRecord, RawAttempt,
    ReferenceSnapshot, RepositoryRecord, SchoolRecord, SkillRecord, TenantRecord,
};
use learner_metrics::views::{
    GradePerformanceFilter, QsetAttempt, QsetPerformanceFilter, QsetScore, QuestionAttempt,
};
use learner_metrics::{DashboardService, MetricsConfig, MetricsError, MetricsResult, ReportSource, SourceStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn ts(at: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn utc(at: &str) -> DateTime<Utc> {
    Utc.from_utc_datetime(&ts(at))
}

/// Raw attempt whose identifiers resolve against `reference()`
pub fn raw(learner: &str, at: &str) -> RawAttempt {
    RawAttempt {
        tenant_name: Some("Tenant A".to_string()),
        school: Some("Hill School".to_string()),
        learner_grade: Some("2".to_string()),
        learner_name: Some(format!("{learner} name")),
        learner_username: Some(learner.to_lowercase()),
        learner_id: learner.to_string(),
        question_id: format!("q-{at}"),
        question_set_id: "qs-1".to_string(),
        updated_at: ts(at),
        attempts_count: Some(1),
        score: Some(1.0),
        qset_grade_identifier: Some("grd-1".to_string()),
        operation_identifier: Some("op-add".to_string()),
        qset_name: Some("Add Within Ten".to_string()),
        qset_uid: Some("QS-ADD-1".to_string()),
        purpose: Some("Practice".to_string()),
        repository_identifier: Some("repo-1".to_string()),
        l1_skill_identifier: Some("op-add".to_string()),
        l2_skill_identifier: None,
        l3_skill_identifier: None,
        sequence: Some(1),
        status: Some("completed".to_string()),
    }
}

fn skill(identifier: &str, name: &str) -> SkillRecord {
    SkillRecord {
        identifier: identifier.to_string(),
        name: Some(name.to_string()),
    }
}

pub fn reference() -> ReferenceSnapshot {
    ReferenceSnapshot {
        last_question_per_qset_grade: vec![LastQuestionRecord {
            operation: Some("Addition".to_string()),
            qset_grade: Some("class-five".to_string()),
            question_set_id: Some("qs-last".to_string()),
            question_id: Some("q-last".to_string()),
        }],
        grades: (1..=5)
            .map(|id| GradeRecord {
                identifier: format!("grd-{id}"),
                id,
                grade: Some(id.to_string()),
            })
            .collect(),
        schools: vec![SchoolRecord {
            school_name: Some("Hill School".to_string()),
        }],
        qset_types: vec![
            QsetTypeRecord {
                purpose: Some("Practice".to_string()),
            },
            QsetTypeRecord {
                purpose: Some("Main Diagnostic".to_string()),
            },
        ],
        repositories: vec![RepositoryRecord {
            identifier: "repo-1".to_string(),
            repo_name: Some("Core Maths".to_string()),
        }],
        l1_skills: vec![skill("op-add", "Addition"), skill("op-sub", "Subtraction")],
        tenants: vec![TenantRecord {
            id: "1".to_string(),
            tenant_name: Some("Tenant A".to_string()),
        }],
        ..Default::default()
    }
}

/// Source store over vectors, with a failure switch and call counters
#[derive(Debug, Default)]
pub struct InMemorySource {
    attempts: Mutex<Vec<RawAttempt>>,
    reference: Mutex<ReferenceSnapshot>,
    fail: AtomicBool,
    attempt_calls: AtomicUsize,
    since_seen: Mutex<Vec<Option<NaiveDateTime>>>,
    pub qset_scores: Mutex<Vec<QsetScore>>,
    pub qset_attempts: Mutex<Vec<QsetAttempt>>,
    pub question_attempts: Mutex<Vec<QuestionAttempt>>,
    pub catalogue: Mutex<Vec<String>>,
    pub sequences: Mutex<Vec<QuestionSequenceRecord>>,
    report_calls: AtomicUsize,
}

impl InMemorySource {
    pub fn new(attempts: Vec<RawAttempt>) -> Self {
        Self {
            attempts: Mutex::new(attempts),
            reference: Mutex::new(reference()),
            ..Default::default()
        }
    }

    pub fn push(&self, rows: impl IntoIterator<Item = RawAttempt>) {
        self.attempts.lock().unwrap().extend(rows);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn attempt_calls(&self) -> usize {
        self.attempt_calls.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub fn since_seen(&self) -> Vec<Option<NaiveDateTime>> {
        self.since_seen.lock().unwrap().clone()
    }

    fn check(&self) -> MetricsResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MetricsError::Database("source unavailable".to_string()));
        }
        Ok(())
    }

    fn report<T: Clone>(&self, rows: &Mutex<Vec<T>>) -> MetricsResult<Vec<T>> {
        self.check()?;
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        Ok(rows.lock().unwrap().clone())
    }
}

#[async_trait]
impl SourceStore for InMemorySource {
    async fn fetch_learner_attempts(&self, since: Option<NaiveDateTime>) -> MetricsResult<Vec<RawAttempt>> {
        self.check()?;
        self.attempt_calls.fetch_add(1, Ordering::SeqCst);
        self.since_seen.lock().unwrap().push(since);
        let rows = self.attempts.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| since.is_none_or(|since| row.updated_at >= since))
            .cloned()
            .collect())
    }

    async fn fetch_reference_snapshot(&self) -> MetricsResult<ReferenceSnapshot> {
        self.check()?;
        Ok(self.reference.lock().unwrap().clone())
    }
}

#[async_trait]
impl ReportSource for InMemorySource {
    async fn fetch_qset_scores(&self, _filter: &GradePerformanceFilter) -> MetricsResult<Vec<QsetScore>> {
        self.report(&self.qset_scores)
    }

    async fn fetch_qset_attempts(&self, _filter: &QsetPerformanceFilter) -> MetricsResult<Vec<QsetAttempt>> {
        self.report(&self.qset_attempts)
    }

    async fn fetch_question_attempts(&self, _qset_uid: &str) -> MetricsResult<Vec<QuestionAttempt>> {
        self.report(&self.question_attempts)
    }

    async fn fetch_qset_catalogue(&self, _repository: Option<&str>) -> MetricsResult<Vec<String>> {
        self.report(&self.catalogue)
    }

    async fn fetch_question_sequences(&self) -> MetricsResult<Vec<QuestionSequenceRecord>> {
        self.report(&self.sequences)
    }
}

pub struct Harness {
    pub source: Arc<InMemorySource>,
    pub clock: Arc<ManualClock>,
    pub service: Arc<DashboardService<InMemorySource>>,
}

/// Service over `rows` with the Moka backend and the clock at `now`
pub fn harness(rows: Vec<RawAttempt>, now: &str) -> Harness {
    let source = Arc::new(InMemorySource::new(rows));
    let clock = Arc::new(ManualClock::new(utc(now)));
    let service = DashboardService::new(
        Arc::clone(&source),
        CacheProvider::moka(64),
        clock.clone(),
        &MetricsConfig::default(),
    );
    Harness {
        source,
        clock,
        service: Arc::new(service),
    }
}
