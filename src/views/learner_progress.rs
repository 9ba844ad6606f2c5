//! Learner progress: how far learners moved from their starting grade
//!
//! A learner's current grade in an operation is read from the last
//! question-set grade they touched. Finishing that grade (answering its
//! final question, or having already moved past it) promotes them one grade,
//! or to `target-achieved` when it was the grade below their own class.

use crate::constants::{self, Operation, TARGET_ACHIEVED};
use crate::metrics::stats::{format_number, round2};
use crate::models::{LastQuestionRecord, LearnerAttempt};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeShare {
    pub current_grade: String,
    /// Share of learners, e.g. `33.0 %`
    pub share: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRow {
    pub operation: String,
    pub starting_grade: String,
    pub target_grade: String,
    pub learners_count: u64,
    /// Learners over every target grade with this operation and starting grade
    pub total_count: u64,
    pub shares: Vec<GradeShare>,
}

impl ProgressRow {
    pub fn share(&self, current_grade: &str) -> Option<&str> {
        self.shares
            .iter()
            .find(|share| share.current_grade == current_grade)
            .map(|share| share.share.as_str())
    }
}

/// Grade a learner of `grade` is expected to complete
pub fn target_grade(grade: &str) -> Option<&'static str> {
    match grade {
        "class-two" => Some("class-one"),
        "class-three" => Some("class-two"),
        "class-four" => Some("class-three"),
        "class-five" => Some("class-four"),
        "class-six" => Some("class-five"),
        _ => None,
    }
}

/// Grade reached after finishing `qset_grade`; only the first five grades promote
fn promoted(qset_grade: &str) -> Option<&'static str> {
    match constants::grade_ordinal(qset_grade) {
        Some(ordinal) if ordinal <= 5 => constants::next_grade(qset_grade),
        _ => None,
    }
}

struct Stage<'a> {
    learner: &'a str,
    grade: &'a str,
    operation: &'a str,
    qset_grade: &'a str,
    is_last: bool,
}

fn sort_key<'a>(stage: &Stage<'a>) -> (&'a str, usize, i64, &'a str, &'a str, &'a str) {
    (
        stage.learner,
        Operation::order_of(stage.operation),
        constants::grade_order(stage.qset_grade),
        stage.grade,
        stage.operation,
        stage.qset_grade,
    )
}

fn stages<'a>(rows: &'a [LearnerAttempt], last_questions: &[LastQuestionRecord], school: Option<&str>) -> Vec<Stage<'a>> {
    let finals: HashSet<(&str, &str, &str, &str)> = last_questions
        .iter()
        .filter_map(|record| {
            Some((
                record.operation.as_deref()?,
                record.qset_grade.as_deref()?,
                record.question_set_id.as_deref()?,
                record.question_id.as_deref()?,
            ))
        })
        .collect();

    let mut groups: HashMap<(&'a str, &'a str, &'a str, &'a str), bool> = HashMap::new();
    for row in rows {
        if school.is_some_and(|school| row.school != school) {
            continue;
        }
        let (Some(grade), Some(operation), Some(qset_grade)) =
            (row.grade.as_deref(), row.operation.as_deref(), row.qset_grade.as_deref())
        else {
            continue;
        };
        let is_final = finals.contains(&(
            operation,
            qset_grade,
            row.question_set_id.as_str(),
            row.question_id.as_str(),
        ));
        *groups
            .entry((row.learner_id.as_str(), grade, operation, qset_grade))
            .or_default() |= is_final;
    }

    let mut stages: Vec<Stage<'a>> = groups
        .into_iter()
        .map(|((learner, grade, operation, qset_grade), is_last)| Stage {
            learner,
            grade,
            operation,
            qset_grade,
            is_last,
        })
        .collect();
    stages.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    stages
}

/// Progress table for the non-diagnostic snapshot, optionally for one school
pub fn learner_progress(
    rows: &[LearnerAttempt],
    last_questions: &[LastQuestionRecord],
    school: Option<&str>,
) -> Vec<ProgressRow> {
    let stages = stages(rows, last_questions, school);

    // (learner, operation, grade, target) -> stage indices in sorted order
    let mut groups: BTreeMap<(&str, &str, &str, &str), Vec<usize>> = BTreeMap::new();
    for (idx, stage) in stages.iter().enumerate() {
        if let Some(target) = target_grade(stage.grade) {
            groups
                .entry((stage.learner, stage.operation, stage.grade, target))
                .or_default()
                .push(idx);
        }
    }

    // cell (operation, starting, target) -> current grade -> learners
    let mut cells: BTreeMap<(&str, &str, &str), BTreeMap<&str, HashSet<&str>>> = BTreeMap::new();
    for ((learner, operation, _, target), indices) in &groups {
        let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
            continue;
        };
        let last_stage = &stages[last];
        let next_grade = stages
            .get(last + 1)
            .filter(|next| next.learner == *learner)
            .map(|next| next.qset_grade);

        let current = if last_stage.is_last || next_grade.is_some() {
            if *target == last_stage.qset_grade {
                TARGET_ACHIEVED
            } else {
                promoted(last_stage.qset_grade).unwrap_or(last_stage.qset_grade)
            }
        } else {
            last_stage.qset_grade
        };
        let starting = stages[first].qset_grade;

        cells
            .entry((*operation, starting, *target))
            .or_default()
            .entry(current)
            .or_default()
            .insert(*learner);
    }

    let mut result: Vec<ProgressRow> = cells
        .iter()
        .map(|((operation, starting, target), by_current)| {
            let learners: HashSet<&str> = by_current.values().flatten().copied().collect();
            let denominator = learners.len() as f64;
            let mut shares: Vec<GradeShare> = by_current
                .iter()
                .map(|(current, learners)| GradeShare {
                    current_grade: current.to_string(),
                    share: format!(
                        "{} %",
                        format_number(round2(round2(learners.len() as f64 / denominator) * 100.0))
                    ),
                })
                .collect();
            shares.sort_by_key(|share| constants::grade_order(&share.current_grade));
            ProgressRow {
                operation: operation.to_string(),
                starting_grade: starting.to_string(),
                target_grade: target.to_string(),
                learners_count: learners.len() as u64,
                total_count: 0,
                shares,
            }
        })
        .collect();

    let mut totals: HashMap<(String, String), u64> = HashMap::new();
    for row in &result {
        *totals
            .entry((row.operation.clone(), row.starting_grade.clone()))
            .or_default() += row.learners_count;
    }
    for row in &mut result {
        row.total_count = totals
            .get(&(row.operation.clone(), row.starting_grade.clone()))
            .copied()
            .unwrap_or_default();
    }

    result.sort_by(|a, b| {
        (
            Operation::order_of(&a.operation),
            constants::grade_order(&a.starting_grade),
            constants::grade_order(&a.target_grade),
        )
            .cmp(&(
                Operation::order_of(&b.operation),
                constants::grade_order(&b.starting_grade),
                constants::grade_order(&b.target_grade),
            ))
    });
    result
}
