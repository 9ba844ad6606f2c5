//! Drill-down from an active-learner cell to the learners behind it

use crate::metrics::stats::round2;
use crate::metrics::WeekRange;
use crate::models::LearnerAttempt;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnersListFilter {
    pub operation: String,
    /// Inclusive
    pub from: Option<NaiveDate>,
    /// Inclusive
    pub to: Option<NaiveDate>,
    pub grade: Option<String>,
    /// Question-set purposes; empty keeps all
    pub purposes: Vec<String>,
}

impl LearnersListFilter {
    /// Filter for one week column of the master report
    pub fn for_week(operation: impl Into<String>, week: WeekRange) -> Self {
        Self {
            operation: operation.into(),
            from: Some(week.start()),
            to: Some(week.end()),
            ..Default::default()
        }
    }

    fn matches(&self, row: &LearnerAttempt) -> bool {
        let date = row.date();
        row.operation.as_deref() == Some(self.operation.as_str())
            && self.from.is_none_or(|from| date >= from)
            && self.to.is_none_or(|to| date <= to)
            && self
                .grade
                .as_deref()
                .is_none_or(|grade| row.grade.as_deref() == Some(grade))
            && (self.purposes.is_empty()
                || row
                    .purpose
                    .as_ref()
                    .is_some_and(|purpose| self.purposes.contains(purpose)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerListRow {
    pub learner_id: String,
    pub grade: String,
    /// Questions attempted per qset grade
    pub questions_attempted: BTreeMap<String, u64>,
    /// Accuracy percentage per qset grade
    pub accuracy: BTreeMap<String, f64>,
}

#[derive(Default)]
struct GradeTotals {
    attempted: u64,
    score: f64,
    scored: usize,
}

/// One row per learner, ordered by learner id
pub fn learners_list(rows: &[LearnerAttempt], filter: &LearnersListFilter) -> Vec<LearnerListRow> {
    let mut totals: BTreeMap<&str, (&str, BTreeMap<&str, GradeTotals>)> = BTreeMap::new();
    for row in rows.iter().filter(|row| filter.matches(row)) {
        let (Some(grade), Some(qset_grade)) = (row.grade.as_deref(), row.qset_grade.as_deref()) else {
            continue;
        };
        let (_, per_grade) = totals
            .entry(row.learner_id.as_str())
            .or_insert_with(|| (grade, BTreeMap::new()));
        let entry = per_grade.entry(qset_grade).or_default();
        entry.attempted += u64::from(row.attempts_count.is_some());
        if let Some(score) = row.score {
            entry.score += score;
            entry.scored += 1;
        }
    }

    totals
        .into_iter()
        .map(|(learner, (grade, per_grade))| LearnerListRow {
            learner_id: learner.to_string(),
            grade: grade.to_string(),
            questions_attempted: per_grade
                .iter()
                .map(|(qset_grade, totals)| (qset_grade.to_string(), totals.attempted))
                .collect(),
            accuracy: per_grade
                .iter()
                .filter(|(_, totals)| totals.scored > 0)
                .map(|(qset_grade, totals)| {
                    (
                        qset_grade.to_string(),
                        round2(totals.score / totals.scored as f64 * 100.0),
                    )
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;

    #[test]
    fn groups_by_learner_and_qset_grade() {
        let mut rows = vec![
            attempt("L2", "2024-03-04 10:00:00"),
            attempt("L1", "2024-03-04 10:00:00"),
            attempt("L1", "2024-03-05 10:00:00"),
            attempt("L1", "2024-03-06 10:00:00"),
        ];
        rows[2].score = Some(0.0);
        rows[3].qset_grade = Some("class-two".to_string());
        let filter = LearnersListFilter {
            operation: "Addition".to_string(),
            ..Default::default()
        };

        let result = learners_list(&rows, &filter);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].learner_id, "L1");
        assert_eq!(result[0].grade, "class-two");
        assert_eq!(result[0].questions_attempted["class-one"], 2);
        assert_eq!(result[0].accuracy["class-one"], 50.0);
        assert_eq!(result[0].questions_attempted["class-two"], 1);
        assert_eq!(result[1].learner_id, "L2");
    }

    #[test]
    fn week_bounds_are_inclusive() {
        let rows = vec![
            attempt("L1", "2024-03-10 23:00:00"),
            attempt("L2", "2024-03-11 00:00:00"),
        ];
        let week = WeekRange::containing(rows[0].date());
        let result = learners_list(&rows, &LearnersListFilter::for_week("Addition", week));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].learner_id, "L1");
    }

    #[test]
    fn purpose_and_operation_filters() {
        let mut rows = vec![attempt("L1", "2024-03-04 10:00:00"), attempt("L2", "2024-03-04 10:00:00")];
        rows[1].purpose = Some("Main Diagnostic".to_string());
        let filter = LearnersListFilter {
            operation: "Addition".to_string(),
            purposes: vec!["Main Diagnostic".to_string()],
            ..Default::default()
        };
        let result = learners_list(&rows, &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].learner_id, "L2");

        let filter = LearnersListFilter {
            operation: "Division".to_string(),
            ..Default::default()
        };
        assert!(learners_list(&rows, &filter).is_empty());
    }
}
