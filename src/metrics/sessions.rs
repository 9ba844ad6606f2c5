//! Sessions: (school, grade, date) groups with enough distinct learners

use super::report::{MetricRow, MetricValue, SESSIONS};
use super::week::WeekRange;
use crate::models::LearnerAttempt;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

type SessionKey<'a> = (&'a str, &'a str, NaiveDate);

fn learners_per_session<'a>(rows: &[&'a LearnerAttempt]) -> HashMap<SessionKey<'a>, HashSet<&'a str>> {
    let mut groups: HashMap<SessionKey<'a>, HashSet<&'a str>> = HashMap::new();
    for row in rows {
        // rows without a learner grade never form a session
        let Some(grade) = row.grade.as_deref() else {
            continue;
        };
        groups
            .entry((row.school.as_str(), grade, row.date()))
            .or_default()
            .insert(row.learner_id.as_str());
    }
    groups
}

/// Number of sessions reaching `min_learners`
pub fn session_count(rows: &[&LearnerAttempt], min_learners: usize) -> usize {
    learners_per_session(rows)
        .values()
        .filter(|learners| learners.len() >= min_learners)
        .count()
}

pub fn sessions(overall: &[&LearnerAttempt], window: &[&LearnerAttempt], min_learners: usize) -> MetricRow {
    let mut weekly: BTreeMap<WeekRange, MetricValue> = BTreeMap::new();
    for ((_, _, date), learners) in learners_per_session(window) {
        let counted = u64::from(learners.len() >= min_learners);
        let entry = weekly
            .entry(WeekRange::containing(date))
            .or_insert(MetricValue::Count(0));
        if let MetricValue::Count(n) = entry {
            *n += counted;
        }
    }

    MetricRow::new(
        SESSIONS,
        MetricValue::Count(session_count(overall, min_learners) as u64),
    )
    .with_weekly(weekly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;

    #[test]
    fn threshold_is_distinct_learners() {
        let rows: Vec<LearnerAttempt> = vec![
            attempt("L1", "2024-03-04 10:00:00"),
            attempt("L1", "2024-03-04 10:05:00"),
            attempt("L2", "2024-03-04 10:00:00"),
        ];
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        assert_eq!(session_count(&refs, 3), 0);

        let mut rows = rows;
        rows.push(attempt("L3", "2024-03-04 11:00:00"));
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        assert_eq!(session_count(&refs, 3), 1);
    }

    #[test]
    fn schools_form_separate_sessions() {
        let mut rows: Vec<LearnerAttempt> = ["L1", "L2", "L3"]
            .iter()
            .map(|l| attempt(l, "2024-03-04 10:00:00"))
            .collect();
        rows[2].school = "School B".to_string();
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        assert_eq!(session_count(&refs, 3), 0);
    }

    #[test]
    fn weeks_with_activity_but_no_session_report_zero() {
        let rows = [
            attempt("L1", "2024-03-04 10:00:00"),
            attempt("L2", "2024-03-12 10:00:00"),
            attempt("L3", "2024-03-12 10:00:00"),
            attempt("L4", "2024-03-12 10:00:00"),
        ];
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        let row = sessions(&refs, &refs, 3);
        assert_eq!(row.overall, MetricValue::Count(1));
        let first = WeekRange::containing(rows[0].date());
        let second = WeekRange::containing(rows[1].date());
        assert_eq!(row.week(&first), &MetricValue::Count(0));
        assert_eq!(row.week(&second), &MetricValue::Count(1));
    }

    #[test]
    fn missing_grade_is_excluded() {
        let mut rows: Vec<LearnerAttempt> = ["L1", "L2", "L3"]
            .iter()
            .map(|l| attempt(l, "2024-03-04 10:00:00"))
            .collect();
        rows[0].grade = None;
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        assert_eq!(session_count(&refs, 3), 0);
    }
}
