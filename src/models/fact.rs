//! Learner attempt rows: the raw shape read from the source and the
//! denormalised shape kept in the cached snapshot.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// One learner's answer to one question, as read from the source store.
///
/// Taxonomy references are identifiers; names are resolved against the
/// reference tables during denormalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAttempt {
    pub tenant_name: Option<String>,
    pub school: Option<String>,
    /// Learner grade as stored on the learner's class, usually an ordinal string
    pub learner_grade: Option<String>,
    pub learner_name: Option<String>,
    pub learner_username: Option<String>,
    pub learner_id: String,
    pub question_id: String,
    pub question_set_id: String,
    pub updated_at: NaiveDateTime,
    pub attempts_count: Option<i64>,
    pub score: Option<f64>,
    pub qset_grade_identifier: Option<String>,
    pub operation_identifier: Option<String>,
    pub qset_name: Option<String>,
    pub qset_uid: Option<String>,
    pub purpose: Option<String>,
    pub repository_identifier: Option<String>,
    pub l1_skill_identifier: Option<String>,
    pub l2_skill_identifier: Option<String>,
    pub l3_skill_identifier: Option<String>,
    pub sequence: Option<i64>,
    pub status: Option<String>,
}

/// Denormalised attempt row held in the fact snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerAttempt {
    pub tenant_name: Option<String>,
    pub school: String,
    /// Canonical learner grade, e.g. `class-three`
    pub grade: Option<String>,
    pub learner_name: Option<String>,
    pub learner_username: Option<String>,
    pub learner_id: String,
    pub question_id: String,
    pub question_set_id: String,
    pub updated_at: NaiveDateTime,
    pub attempts_count: Option<i64>,
    pub score: Option<f64>,
    pub qset_name: Option<String>,
    pub qset_uid: Option<String>,
    pub purpose: Option<String>,
    pub sequence: Option<i64>,
    pub status: Option<String>,
    pub qset_grade: Option<String>,
    pub operation: Option<String>,
    pub l1_skill: Option<String>,
    pub l2_skill: Option<String>,
    pub l3_skill: Option<String>,
    pub repo_name: Option<String>,
}

impl LearnerAttempt {
    pub fn date(&self) -> NaiveDate {
        self.updated_at.date()
    }

    pub fn is_diagnostic(&self, diagnostic_purpose: &str) -> bool {
        self.purpose.as_deref() == Some(diagnostic_purpose)
    }
}

// Full-row equality; scores compare by bit pattern so rows can be hashed.
impl PartialEq for LearnerAttempt {
    fn eq(&self, other: &Self) -> bool {
        self.tenant_name == other.tenant_name
            && self.school == other.school
            && self.grade == other.grade
            && self.learner_name == other.learner_name
            && self.learner_username == other.learner_username
            && self.learner_id == other.learner_id
            && self.question_id == other.question_id
            && self.question_set_id == other.question_set_id
            && self.updated_at == other.updated_at
            && self.attempts_count == other.attempts_count
            && self.score.map(f64::to_bits) == other.score.map(f64::to_bits)
            && self.qset_name == other.qset_name
            && self.qset_uid == other.qset_uid
            && self.purpose == other.purpose
            && self.sequence == other.sequence
            && self.status == other.status
            && self.qset_grade == other.qset_grade
            && self.operation == other.operation
            && self.l1_skill == other.l1_skill
            && self.l2_skill == other.l2_skill
            && self.l3_skill == other.l3_skill
            && self.repo_name == other.repo_name
    }
}

impl Eq for LearnerAttempt {}

impl Hash for LearnerAttempt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tenant_name.hash(state);
        self.school.hash(state);
        self.grade.hash(state);
        self.learner_name.hash(state);
        self.learner_username.hash(state);
        self.learner_id.hash(state);
        self.question_id.hash(state);
        self.question_set_id.hash(state);
        self.updated_at.hash(state);
        self.attempts_count.hash(state);
        self.score.map(f64::to_bits).hash(state);
        self.qset_name.hash(state);
        self.qset_uid.hash(state);
        self.purpose.hash(state);
        self.sequence.hash(state);
        self.status.hash(state);
        self.qset_grade.hash(state);
        self.operation.hash(state);
        self.l1_skill.hash(state);
        self.l2_skill.hash(state);
        self.l3_skill.hash(state);
        self.repo_name.hash(state);
    }
}

/// Sum and count of the non-null scores in `rows`
pub fn score_totals<'a, I>(rows: I) -> (f64, usize)
where
    I: IntoIterator<Item = &'a LearnerAttempt>,
{
    rows.into_iter()
        .filter_map(|row| row.score)
        .fold((0.0, 0), |(sum, count), score| (sum + score, count + 1))
}


#[cfg(test)]
mod tests {
    use super::fixtures::attempt;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identical_rows_collapse_in_a_set() {
        let a = attempt("L1", "2024-03-04 10:00:00");
        let b = attempt("L1", "2024-03-04 10:00:00");
        let mut c = attempt("L1", "2024-03-04 10:00:00");
        c.score = Some(0.0);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn score_totals_skip_nulls() {
        let mut rows = vec![
            attempt("L1", "2024-03-04 10:00:00"),
            attempt("L1", "2024-03-04 10:01:00"),
        ];
        rows[1].score = None;
        assert_eq!(score_totals(&rows), (1.0, 1));
    }

    #[test]
    fn diagnostic_check_uses_purpose() {
        let mut row = attempt("L1", "2024-03-04 10:00:00");
        assert!(!row.is_diagnostic("Main Diagnostic"));
        row.purpose = Some("Main Diagnostic".to_string());
        assert!(row.is_diagnostic("Main Diagnostic"));
        row.purpose = None;
        assert!(!row.is_diagnostic("Main Diagnostic"));
    }
}
