//! Per question-set history of a single learner

use crate::metrics::stats::round2;
use crate::models::{LearnerAttempt, QuestionSequenceRecord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerDetailFilter {
    pub learner_id: String,
    pub qset_grade: Option<String>,
    pub operation: Option<String>,
    /// Question-set purposes; empty keeps all
    pub purposes: Vec<String>,
}

/// Last day a question set was worked on; the most recent set is still open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptedDate {
    On(NaiveDate),
    InProgress,
}

impl fmt::Display for AttemptedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptedDate::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            AttemptedDate::InProgress => f.write_str("in progress"),
        }
    }
}

impl Serialize for AttemptedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerQsetRow {
    pub question_set_id: String,
    pub qset_name: Option<String>,
    pub questions_attempted: u64,
    pub accuracy: Option<f64>,
    /// Minutes
    pub time_taken: f64,
    pub attempted_date: AttemptedDate,
    /// Positions of wrongly answered questions, comma separated
    pub incorrect_sequences: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerDetail {
    pub learner_id: String,
    pub grade: Option<String>,
    pub rows: Vec<LearnerQsetRow>,
}

impl LearnerDetail {
    pub fn heading(&self) -> String {
        format!(
            "Learner {} , Grade: {}",
            self.learner_id,
            self.grade.as_deref().unwrap_or("-")
        )
    }
}

struct DayTotals {
    attempted: u64,
    score: f64,
    first: NaiveDateTime,
    last: NaiveDateTime,
    incorrect: BTreeSet<i64>,
}

/// `None` when the learner has no rows at all
pub fn learner_detail(
    rows: &[LearnerAttempt],
    sequences: &[QuestionSequenceRecord],
    filter: &LearnerDetailFilter,
    cap_seconds: i64,
) -> Option<LearnerDetail> {
    let learner_rows: Vec<&LearnerAttempt> = rows
        .iter()
        .filter(|row| row.learner_id == filter.learner_id)
        .collect();
    let grade = learner_rows.first()?.grade.clone();

    let positions: HashMap<(&str, &str), i64> = sequences
        .iter()
        .filter_map(|record| {
            Some((
                (record.question_id.as_str(), record.question_set_id.as_str()),
                record.sequence?,
            ))
        })
        .collect();

    let selected = learner_rows.into_iter().filter(|row| {
        (filter.purposes.is_empty()
            || row
                .purpose
                .as_ref()
                .is_some_and(|purpose| filter.purposes.contains(purpose)))
            && filter.qset_grade.as_ref().is_none_or(|g| row.qset_grade.as_ref() == Some(g))
            && filter.operation.as_ref().is_none_or(|op| row.operation.as_ref() == Some(op))
    });

    let mut days: BTreeMap<(&str, Option<&str>, NaiveDate), DayTotals> = BTreeMap::new();
    for row in selected {
        let key = (row.question_set_id.as_str(), row.qset_name.as_deref(), row.date());
        let totals = days.entry(key).or_insert_with(|| DayTotals {
            attempted: 0,
            score: 0.0,
            first: row.updated_at,
            last: row.updated_at,
            incorrect: BTreeSet::new(),
        });
        totals.attempted += u64::from(row.attempts_count.is_some());
        totals.score += row.score.unwrap_or_default();
        totals.first = totals.first.min(row.updated_at);
        totals.last = totals.last.max(row.updated_at);
        if row.score == Some(0.0) {
            if let Some(position) = positions.get(&(row.question_id.as_str(), row.question_set_id.as_str())) {
                totals.incorrect.insert(*position);
            }
        }
    }

    struct QsetTotals {
        attempted: u64,
        score: f64,
        seconds: f64,
        last_date: NaiveDate,
        last_at: NaiveDateTime,
        incorrect: Vec<String>,
    }
    let mut per_qset: BTreeMap<(&str, Option<&str>), QsetTotals> = BTreeMap::new();
    for ((qset, name, date), day) in days {
        let seconds = (day.last - day.first).num_seconds().min(cap_seconds) as f64;
        let incorrect = day
            .incorrect
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let totals = per_qset.entry((qset, name)).or_insert_with(|| QsetTotals {
            attempted: 0,
            score: 0.0,
            seconds: 0.0,
            last_date: date,
            last_at: day.last,
            incorrect: Vec::new(),
        });
        totals.attempted += day.attempted;
        totals.score += day.score;
        totals.seconds += seconds;
        totals.last_date = totals.last_date.max(date);
        totals.last_at = totals.last_at.max(day.last);
        if !incorrect.is_empty() {
            totals.incorrect.push(incorrect);
        }
    }

    let mut qsets: Vec<(NaiveDateTime, LearnerQsetRow)> = per_qset
        .into_iter()
        .map(|((qset, name), totals)| {
            let accuracy = (totals.attempted > 0)
                .then(|| round2(totals.score / totals.attempted as f64 * 100.0));
            (
                totals.last_at,
                LearnerQsetRow {
                    question_set_id: qset.to_string(),
                    qset_name: name.map(str::to_string),
                    questions_attempted: totals.attempted,
                    accuracy,
                    time_taken: round2(totals.seconds / 60.0),
                    attempted_date: AttemptedDate::On(totals.last_date),
                    incorrect_sequences: totals.incorrect.join(","),
                },
            )
        })
        .collect();
    qsets.sort_by_key(|(last_at, _)| *last_at);

    let mut rows: Vec<LearnerQsetRow> = qsets.into_iter().map(|(_, row)| row).collect();
    if let Some(latest) = rows.last_mut() {
        latest.attempted_date = AttemptedDate::InProgress;
    }

    Some(LearnerDetail {
        learner_id: filter.learner_id.clone(),
        grade,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;

    fn at_qset(qset: &str, question: &str, at: &str, score: f64) -> LearnerAttempt {
        let mut row = attempt("L1", at);
        row.question_set_id = qset.to_string();
        row.qset_name = Some(format!("Set {qset}"));
        row.question_id = question.to_string();
        row.score = Some(score);
        row
    }

    fn position(qset: &str, question: &str, sequence: i64) -> QuestionSequenceRecord {
        QuestionSequenceRecord {
            question_id: question.to_string(),
            question_set_id: qset.to_string(),
            sequence: Some(sequence),
        }
    }

    fn for_learner(learner: &str) -> LearnerDetailFilter {
        LearnerDetailFilter {
            learner_id: learner.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn summarizes_each_question_set() {
        let rows = vec![
            at_qset("qs-1", "q1", "2024-03-04 10:00:00", 1.0),
            at_qset("qs-1", "q2", "2024-03-04 10:03:00", 0.0),
            at_qset("qs-1", "q3", "2024-03-04 11:00:00", 0.0),
            at_qset("qs-2", "q1", "2024-03-05 09:00:00", 1.0),
        ];
        let sequences = vec![
            position("qs-1", "q1", 1),
            position("qs-1", "q2", 2),
            position("qs-1", "q3", 3),
        ];

        let detail = learner_detail(&rows, &sequences, &for_learner("L1"), 2700).unwrap();
        assert_eq!(detail.grade.as_deref(), Some("class-two"));
        assert_eq!(detail.rows.len(), 2);

        let first = &detail.rows[0];
        assert_eq!(first.question_set_id, "qs-1");
        assert_eq!(first.questions_attempted, 3);
        assert_eq!(first.accuracy, Some(33.33));
        assert_eq!(first.time_taken, 45.0);
        assert_eq!(first.incorrect_sequences, "2,3");
        assert_eq!(first.attempted_date.to_string(), "2024-03-04");

        assert_eq!(detail.rows[1].attempted_date, AttemptedDate::InProgress);
        assert_eq!(detail.rows[1].incorrect_sequences, "");
    }

    #[test]
    fn unknown_learner_has_no_detail() {
        let rows = vec![at_qset("qs-1", "q1", "2024-03-04 10:00:00", 1.0)];
        assert!(learner_detail(&rows, &[], &for_learner("nobody"), 2700).is_none());
    }

    #[test]
    fn filters_keep_heading_grade() {
        let rows = vec![at_qset("qs-1", "q1", "2024-03-04 10:00:00", 1.0)];
        let filter = LearnerDetailFilter {
            operation: Some("Division".to_string()),
            ..for_learner("L1")
        };
        let detail = learner_detail(&rows, &[], &filter, 2700).unwrap();
        assert!(detail.rows.is_empty());
        assert_eq!(detail.heading(), "Learner L1 , Grade: class-two");
    }
}
