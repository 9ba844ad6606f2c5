//! Work done: attempt row counts, overall and per learner

use super::learners::distinct_learners;
use super::report::{
    MetricRow, MetricValue, MEDIAN_WORK_DONE_PER_LEARNER, WORK_DONE, WORK_DONE_PER_LEARNER,
};
use super::stats::median;
use super::week::bucket_by_week;
use crate::models::LearnerAttempt;
use std::collections::{BTreeMap, HashMap};

fn per_learner(rows: &[&LearnerAttempt]) -> MetricValue {
    let learners = distinct_learners(rows).len();
    if learners == 0 {
        MetricValue::Null
    } else {
        MetricValue::Count((rows.len() / learners) as u64)
    }
}

fn median_per_learner(rows: &[&LearnerAttempt]) -> MetricValue {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.learner_id.as_str()).or_default() += 1;
    }
    let counts: Vec<f64> = counts.into_values().map(|n| n as f64).collect();
    median(&counts).map_or(MetricValue::Null, MetricValue::Number)
}

/// Work done, work done per learner and median work done per learner
pub fn work_done(overall: &[&LearnerAttempt], window: &[&LearnerAttempt]) -> Vec<MetricRow> {
    let buckets = bucket_by_week(window);
    let weekly = |value: fn(&[&LearnerAttempt]) -> MetricValue| -> BTreeMap<_, _> {
        buckets
            .iter()
            .map(|(week, rows)| (*week, value(rows)))
            .collect()
    };

    vec![
        MetricRow::new(WORK_DONE, MetricValue::Count(overall.len() as u64))
            .with_weekly(weekly(|rows| MetricValue::Count(rows.len() as u64))),
        MetricRow::new(WORK_DONE_PER_LEARNER, per_learner(overall)).with_weekly(weekly(per_learner)),
        MetricRow::new(MEDIAN_WORK_DONE_PER_LEARNER, median_per_learner(overall))
            .with_weekly(weekly(median_per_learner)),
    ]
}
