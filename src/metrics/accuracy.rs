//! Median accuracy of learners

use super::report::{MetricRow, MetricValue, MEDIAN_ACCURACY};
use super::stats::{median, round2};
use super::week::bucket_by_week;
use crate::models::LearnerAttempt;
use std::collections::HashMap;

/// Percentage of score earned per learner; learners without scores are absent
pub fn learner_accuracy<'a>(rows: &[&'a LearnerAttempt]) -> HashMap<&'a str, f64> {
    let mut totals: HashMap<&'a str, (f64, usize)> = HashMap::new();
    for row in rows {
        if let Some(score) = row.score {
            let entry = totals.entry(row.learner_id.as_str()).or_default();
            entry.0 += score;
            entry.1 += 1;
        }
    }
    totals
        .into_iter()
        .map(|(learner, (sum, count))| (learner, round2(sum / count as f64 * 100.0)))
        .collect()
}

fn median_accuracy_of(rows: &[&LearnerAttempt]) -> MetricValue {
    let accuracies: Vec<f64> = learner_accuracy(rows).into_values().collect();
    median(&accuracies).map_or(MetricValue::Null, |value| MetricValue::Number(round2(value)))
}

pub fn median_accuracy(overall: &[&LearnerAttempt], window: &[&LearnerAttempt]) -> MetricRow {
    let weekly = bucket_by_week(window)
        .iter()
        .filter_map(|(week, rows)| {
            let value = median_accuracy_of(rows);
            (!value.is_null()).then_some((*week, value))
        })
        .collect();
    MetricRow::new(MEDIAN_ACCURACY, median_accuracy_of(overall)).with_weekly(weekly)
}
