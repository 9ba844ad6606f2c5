//! Per question-set learner accuracy and time

use super::source::{QsetAttempt, QsetPerformanceFilter};
use crate::constants::{self, Operation};
use crate::metrics::stats::{mean, median, percent_label, round2};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QsetPerformanceRow {
    pub question_set_id: String,
    pub question_set_uid: Option<String>,
    pub operation: Option<String>,
    pub qset_grade: Option<String>,
    pub sequence: Option<i64>,
    pub purpose: Option<String>,
    pub qset_name: Option<String>,
    pub l2_skill: Option<String>,
    pub l3_skill: Option<String>,
    pub learners_count: u64,
    pub median_accuracy: Option<String>,
    pub average_accuracy: Option<String>,
    /// Minutes
    pub median_time: Option<f64>,
    /// Minutes
    pub mean_time: Option<f64>,
}

#[derive(Default)]
struct LearnerTotals {
    seconds: f64,
    score: f64,
    answered: usize,
}

fn matches(filter: &QsetPerformanceFilter, row: &QsetAttempt) -> bool {
    fn same(wanted: &Option<String>, actual: &Option<String>) -> bool {
        wanted.is_none() || wanted == actual
    }
    same(&filter.operation, &row.operation)
        && same(&filter.l2_skill, &row.l2_skill)
        && same(&filter.l3_skill, &row.l3_skill)
        && same(&filter.purpose, &row.purpose)
        && (filter.qset_ids.is_empty()
            || row
                .question_set_uid
                .as_ref()
                .is_some_and(|uid| filter.qset_ids.contains(uid)))
}

/// Rows per question set; an empty filter yields nothing
pub fn qset_performance(attempts: &[QsetAttempt], filter: &QsetPerformanceFilter) -> Vec<QsetPerformanceRow> {
    if filter.is_empty() {
        return Vec::new();
    }

    // (qset, learner, date) -> first, last, score sum, answered
    let mut days: HashMap<(&str, &str, NaiveDate), (NaiveDateTime, NaiveDateTime, f64, usize)> = HashMap::new();
    let mut descriptors: HashMap<&str, &QsetAttempt> = HashMap::new();
    for row in attempts.iter().filter(|row| matches(filter, row)) {
        let (Some(learner), Some(at)) = (row.learner_id.as_deref(), row.updated_at) else {
            continue;
        };
        descriptors.entry(row.question_set_id.as_str()).or_insert(row);
        let (score, answered) = row.score.map_or((0.0, 0), |score| (score, 1));
        days.entry((row.question_set_id.as_str(), learner, at.date()))
            .and_modify(|(first, last, sum, count)| {
                *first = (*first).min(at);
                *last = (*last).max(at);
                *sum += score;
                *count += answered;
            })
            .or_insert((at, at, score, answered));
    }

    let mut per_learner: BTreeMap<&str, HashMap<&str, LearnerTotals>> = BTreeMap::new();
    for ((qset, learner, _), (first, last, score, answered)) in days {
        let totals = per_learner.entry(qset).or_default().entry(learner).or_default();
        totals.seconds += (last - first).num_seconds() as f64;
        totals.score += score;
        totals.answered += answered;
    }

    let mut result: Vec<QsetPerformanceRow> = per_learner
        .into_iter()
        .filter_map(|(qset, learners)| {
            let descriptor = descriptors.get(qset)?;
            let accuracies: Vec<f64> = learners
                .values()
                .filter(|totals| totals.answered > 0)
                .map(|totals| totals.score / totals.answered as f64)
                .collect();
            let times: Vec<f64> = learners.values().map(|totals| totals.seconds).collect();
            Some(QsetPerformanceRow {
                question_set_id: qset.to_string(),
                question_set_uid: descriptor.question_set_uid.clone(),
                operation: descriptor.operation.clone(),
                qset_grade: descriptor.qset_grade.clone(),
                sequence: descriptor.sequence,
                purpose: descriptor.purpose.clone(),
                qset_name: descriptor.qset_name.clone(),
                l2_skill: descriptor.l2_skill.clone(),
                l3_skill: descriptor.l3_skill.clone(),
                learners_count: learners.len() as u64,
                median_accuracy: median(&accuracies).map(percent_label),
                average_accuracy: mean(&accuracies).map(percent_label),
                median_time: median(&times).map(|seconds| round2(seconds / 60.0)),
                mean_time: mean(&times).map(|seconds| round2(seconds / 60.0)),
            })
        })
        .collect();

    result.sort_by_key(|row| {
        (
            row.operation.as_deref().map_or(usize::MAX, Operation::order_of),
            row.qset_grade.as_deref().map_or(i64::MAX, constants::grade_order),
            row.sequence.unwrap_or(i64::MAX),
        )
    });
    result
}
