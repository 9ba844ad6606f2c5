//! Time spent, from the first-to-last attempt span of each learner-day

use super::learners::distinct_learners;
use super::report::{AVERAGE_TIME_PER_LEARNER, MetricRow, MetricValue, TOTAL_TIME_SPENT};
use super::stats::round2;
use super::week::WeekRange;
use crate::models::LearnerAttempt;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct DailySpan<'a> {
    pub learner: &'a str,
    pub date: NaiveDate,
    /// Seconds between first and last attempt, capped
    pub seconds: f64,
}

/// One span per (learner, date), capped at `cap_seconds`
pub fn daily_spans<'a>(rows: &[&'a LearnerAttempt], cap_seconds: i64) -> Vec<DailySpan<'a>> {
    let mut bounds: HashMap<(&'a str, NaiveDate), (NaiveDateTime, NaiveDateTime)> = HashMap::new();
    for row in rows {
        bounds
            .entry((row.learner_id.as_str(), row.date()))
            .and_modify(|(min, max)| {
                *min = (*min).min(row.updated_at);
                *max = (*max).max(row.updated_at);
            })
            .or_insert((row.updated_at, row.updated_at));
    }
    bounds
        .into_iter()
        .map(|((learner, date), (min, max))| DailySpan {
            learner,
            date,
            seconds: (max - min).num_seconds().min(cap_seconds) as f64,
        })
        .collect()
}

fn total_minutes(spans: &[DailySpan<'_>]) -> f64 {
    round2(spans.iter().map(|span| span.seconds).sum::<f64>() / 60.0)
}

fn average(total: f64, learners: usize) -> MetricValue {
    if learners == 0 {
        MetricValue::Null
    } else {
        MetricValue::Number(round2(total / learners as f64))
    }
}

/// Total time spent and average time spent per learner, in minutes
pub fn time_spent(
    overall: &[&LearnerAttempt],
    window: &[&LearnerAttempt],
    cap_seconds: i64,
) -> Vec<MetricRow> {
    let total = total_minutes(&daily_spans(overall, cap_seconds));
    let learners = distinct_learners(overall).len();

    let mut per_week: BTreeMap<WeekRange, Vec<DailySpan<'_>>> = BTreeMap::new();
    for span in daily_spans(window, cap_seconds) {
        per_week.entry(WeekRange::containing(span.date)).or_default().push(span);
    }

    let mut weekly_total = BTreeMap::new();
    let mut weekly_average = BTreeMap::new();
    for (week, spans) in &per_week {
        let minutes = total_minutes(spans);
        let learners: HashSet<&str> = spans.iter().map(|span| span.learner).collect();
        weekly_total.insert(*week, MetricValue::Number(minutes));
        weekly_average.insert(*week, average(minutes, learners.len()));
    }

    vec![
        MetricRow::new(TOTAL_TIME_SPENT, MetricValue::Number(total)).with_weekly(weekly_total),
        MetricRow::new(AVERAGE_TIME_PER_LEARNER, average(total, learners)).with_weekly(weekly_average),
    ]
}
