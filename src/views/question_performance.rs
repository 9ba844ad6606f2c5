//! Per question accuracy and answer time within one question set

use super::source::QuestionAttempt;
use crate::metrics::stats::{mean, median, percent_label, round_to};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionPerformanceRow {
    pub question_set_id: String,
    pub qs_seq: i64,
    pub question_id: String,
    pub q_seq: i64,
    pub learners_count: u64,
    pub median_accuracy: Option<String>,
    pub average_accuracy: Option<String>,
    /// Seconds since the learner's previous answer that day
    pub average_time_taken: Option<f64>,
}

#[derive(Default)]
struct QuestionBucket<'a> {
    learners: HashSet<&'a str>,
    scores: Vec<f64>,
    seconds: Vec<f64>,
}

/// Answer times follow question order; answers without a question position
/// still count toward the next answer's time but get no row of their own
pub fn question_performance(attempts: &[QuestionAttempt]) -> Vec<QuestionPerformanceRow> {
    let mut ordered: Vec<&QuestionAttempt> = attempts.iter().collect();
    ordered.sort_by(|a, b| {
        (&a.question_set_id, &a.learner_id, a.q_seq.is_none(), a.q_seq, a.updated_at).cmp(&(
            &b.question_set_id,
            &b.learner_id,
            b.q_seq.is_none(),
            b.q_seq,
            b.updated_at,
        ))
    });

    let mut buckets: BTreeMap<(i64, i64, &str, &str), QuestionBucket<'_>> = BTreeMap::new();
    let mut previous: Option<&QuestionAttempt> = None;
    for row in ordered {
        let seconds = match previous {
            Some(prev)
                if prev.question_set_id == row.question_set_id
                    && prev.learner_id == row.learner_id
                    && prev.updated_at.date() == row.updated_at.date() =>
            {
                (row.updated_at - prev.updated_at).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        };
        previous = Some(row);

        let (Some(qs_seq), Some(q_seq)) = (row.qs_seq, row.q_seq) else {
            continue;
        };
        let bucket = buckets
            .entry((qs_seq, q_seq, row.question_set_id.as_str(), row.question_id.as_str()))
            .or_default();
        bucket.learners.insert(row.learner_id.as_str());
        bucket.scores.extend(row.score);
        bucket.seconds.push(seconds);
    }

    buckets
        .into_iter()
        .map(|((qs_seq, q_seq, qset, question), bucket)| QuestionPerformanceRow {
            question_set_id: qset.to_string(),
            qs_seq,
            question_id: question.to_string(),
            q_seq,
            learners_count: bucket.learners.len() as u64,
            median_accuracy: median(&bucket.scores).map(percent_label),
            average_accuracy: mean(&bucket.scores).map(percent_label),
            average_time_taken: mean(&bucket.seconds).map(|seconds| round_to(seconds, 3)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn answer(learner: &str, question: &str, q_seq: Option<i64>, at: &str, score: f64) -> QuestionAttempt {
        QuestionAttempt {
            question_set_id: "qs-1".to_string(),
            qs_seq: Some(4),
            question_id: question.to_string(),
            q_seq,
            learner_id: learner.to_string(),
            score: Some(score),
            updated_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").unwrap(),
        }
    }

    #[test]
    fn time_is_gap_to_previous_answer() {
        let rows = vec![
            answer("L1", "q2", Some(2), "2024-03-04 10:00:30", 0.0),
            answer("L1", "q1", Some(1), "2024-03-04 10:00:00", 1.0),
            answer("L2", "q1", Some(1), "2024-03-04 11:00:00", 1.0),
            answer("L2", "q2", Some(2), "2024-03-05 11:00:00", 1.0),
        ];
        let result = question_performance(&rows);
        assert_eq!(result.len(), 2);

        assert_eq!(result[0].question_id, "q1");
        assert_eq!(result[0].learners_count, 2);
        assert_eq!(result[0].median_accuracy.as_deref(), Some("100 %"));
        assert_eq!(result[0].average_time_taken, Some(0.0));

        assert_eq!(result[1].question_id, "q2");
        assert_eq!(result[1].median_accuracy.as_deref(), Some("50 %"));
        // L1 answered 30 s after q1, L2 answered on a later day
        assert_eq!(result[1].average_time_taken, Some(15.0));
    }

    #[test]
    fn unpositioned_answers_have_no_row() {
        let rows = vec![
            answer("L1", "q1", Some(1), "2024-03-04 10:00:00", 1.0),
            answer("L1", "qx", None, "2024-03-04 10:00:10", 1.0),
        ];
        let result = question_performance(&rows);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].question_id, "q1");
    }
}
