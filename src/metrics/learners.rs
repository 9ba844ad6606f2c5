//! Active and newly added learner counts

use super::report::{MetricRow, MetricValue, ACTIVE_LEARNERS, NEW_LEARNERS_ADDED};
use super::week::{bucket_by_week, WeekRange};
use crate::constants::Operation;
use crate::models::LearnerAttempt;
use std::collections::{BTreeMap, HashSet};

pub fn distinct_learners<'a>(rows: &[&'a LearnerAttempt]) -> HashSet<&'a str> {
    rows.iter().map(|row| row.learner_id.as_str()).collect()
}

fn distinct_for_operation(rows: &[&LearnerAttempt], operation: Operation) -> usize {
    rows.iter()
        .filter(|row| row.operation.as_deref() == Some(operation.as_str()))
        .map(|row| row.learner_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Parent row plus one sub row per operation
pub fn active_learners(overall: &[&LearnerAttempt], window: &[&LearnerAttempt]) -> Vec<MetricRow> {
    let buckets = bucket_by_week(window);

    let weekly: BTreeMap<WeekRange, MetricValue> = buckets
        .iter()
        .map(|(week, rows)| (*week, MetricValue::Count(distinct_learners(rows).len() as u64)))
        .collect();
    let mut result = vec![MetricRow::new(
        ACTIVE_LEARNERS,
        MetricValue::Count(distinct_learners(overall).len() as u64),
    )
    .with_weekly(weekly)];

    for operation in Operation::ALL {
        let weekly = buckets
            .iter()
            .filter_map(|(week, rows)| {
                let value = MetricValue::count_or_null(distinct_for_operation(rows, operation));
                (!value.is_null()).then_some((*week, value))
            })
            .collect();
        result.push(
            MetricRow::sub(
                ACTIVE_LEARNERS,
                operation.as_str(),
                MetricValue::count_or_null(distinct_for_operation(overall, operation)),
            )
            .with_weekly(weekly),
        );
    }
    result
}

/// Learners seen for the first time in each week; `seed` holds everyone
/// active before the window. Only weekly values are reported.
pub fn new_learners_added<'a>(window: &[&'a LearnerAttempt], seed: HashSet<&'a str>) -> MetricRow {
    let mut seen = seed;
    let mut weekly = BTreeMap::new();
    for (week, rows) in bucket_by_week(window) {
        let first_seen: HashSet<&str> = distinct_learners(&rows)
            .into_iter()
            .filter(|learner| !seen.contains(learner))
            .collect();
        weekly.insert(week, MetricValue::Count(first_seen.len() as u64));
        seen.extend(first_seen);
    }
    MetricRow::new(NEW_LEARNERS_ADDED, MetricValue::Null).with_weekly(weekly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;
    use chrono::NaiveDate;

    fn week(s: &str) -> WeekRange {
        WeekRange::containing(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn active_learners_per_operation() {
        let a = attempt("L1", "2024-03-04 10:00:00");
        let b = attempt("L1", "2024-03-05 10:00:00");
        let mut c = attempt("L2", "2024-03-12 10:00:00");
        c.operation = Some("Subtraction".to_string());
        let rows = vec![&a, &b, &c];

        let result = active_learners(&rows, &rows);
        assert_eq!(result.len(), 5);
        assert_eq!(result[0].overall, MetricValue::Count(2));
        assert_eq!(result[0].week(&week("2024-03-04")), &MetricValue::Count(1));
        assert_eq!(result[1].sub_metric.as_deref(), Some("Addition"));
        assert_eq!(result[1].overall, MetricValue::Count(1));
        assert!(result[1].week(&week("2024-03-11")).is_null());
        assert_eq!(result[2].week(&week("2024-03-11")), &MetricValue::Count(1));
        assert!(result[4].overall.is_null());
    }

    #[test]
    fn empty_population_counts_zero() {
        let result = active_learners(&[], &[]);
        assert_eq!(result[0].overall, MetricValue::Count(0));
        assert!(result[0].weekly.is_empty());
    }

    #[test]
    fn new_learners_are_counted_once() {
        let a = attempt("L1", "2024-03-04 10:00:00");
        let b = attempt("L2", "2024-03-05 10:00:00");
        let c = attempt("L2", "2024-03-12 10:00:00");
        let d = attempt("L3", "2024-03-13 10:00:00");
        let rows = vec![&a, &b, &c, &d];

        let seed: HashSet<&str> = ["L1"].into_iter().collect();
        let row = new_learners_added(&rows, seed);
        assert!(row.overall.is_null());
        assert_eq!(row.week(&week("2024-03-04")), &MetricValue::Count(1));
        assert_eq!(row.week(&week("2024-03-11")), &MetricValue::Count(1));
    }
}
