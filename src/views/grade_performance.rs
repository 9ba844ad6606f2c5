//! Question-set scores per (operation, qset grade)

use super::source::QsetScore;
use crate::constants::{self, Operation};
use crate::metrics::stats::{mean, median, percent_label};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const DIFFICULT_BELOW: f64 = 0.2;
const EASY_ABOVE: f64 = 0.9;
const NAME_SEPARATOR: &str = ", \n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradePerformanceRow {
    pub operation: String,
    pub qset_grade: String,
    pub attempts_count: u64,
    pub median_accuracy: Option<String>,
    pub average_accuracy: Option<String>,
    /// Question sets averaging below 20 %
    pub difficult_qsets: String,
    /// Question sets averaging above 90 %
    pub easy_qsets: String,
}

#[derive(Default)]
struct Bucket<'a> {
    attempts: u64,
    scores: Vec<f64>,
    per_qset: BTreeMap<(&'a str, Option<&'a str>), Vec<f64>>,
}

/// Rows without an operation or qset grade carry no proficiency data and are skipped
pub fn grade_performance(scores: &[QsetScore]) -> Vec<GradePerformanceRow> {
    let mut buckets: BTreeMap<(&str, &str), Bucket<'_>> = BTreeMap::new();
    for row in scores {
        let (Some(operation), Some(qset_grade)) = (row.operation.as_deref(), row.qset_grade.as_deref()) else {
            continue;
        };
        let bucket = buckets.entry((operation, qset_grade)).or_default();
        bucket.attempts += 1;
        let per_qset = bucket
            .per_qset
            .entry((row.question_set_id.as_str(), row.qset_name.as_deref()))
            .or_default();
        if let Some(score) = row.score {
            bucket.scores.push(score);
            per_qset.push(score);
        }
    }

    let mut result: Vec<GradePerformanceRow> = buckets
        .into_iter()
        .map(|((operation, qset_grade), bucket)| {
            let mut difficult = BTreeSet::new();
            let mut easy = BTreeSet::new();
            for ((_, name), scores) in &bucket.per_qset {
                let (Some(name), Some(average)) = (name, mean(scores)) else {
                    continue;
                };
                if average < DIFFICULT_BELOW {
                    difficult.insert(*name);
                } else if average > EASY_ABOVE {
                    easy.insert(*name);
                }
            }
            GradePerformanceRow {
                operation: operation.to_string(),
                qset_grade: qset_grade.to_string(),
                attempts_count: bucket.attempts,
                median_accuracy: median(&bucket.scores).map(percent_label),
                average_accuracy: mean(&bucket.scores).map(percent_label),
                difficult_qsets: difficult.into_iter().collect::<Vec<_>>().join(NAME_SEPARATOR),
                easy_qsets: easy.into_iter().collect::<Vec<_>>().join(NAME_SEPARATOR),
            }
        })
        .collect();

    result.sort_by_key(|row| {
        (
            Operation::order_of(&row.operation),
            constants::grade_order(&row.qset_grade),
        )
    });
    result
}
