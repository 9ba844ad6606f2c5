//! Median time to move up a grade or on to the next operation
//!
//! Activity is first reduced to per-day spans for each (learner, grade,
//! operation[, qset grade]) group. Spans of one learner-day that together
//! exceed the daily cap are assumed to overlap; every span after the first
//! is then replaced by its difference from the previous one. Jump events
//! pair consecutive stages in grade or operation order: the time spent on
//! the earlier stage, stamped with the first activity on the later one.

use super::filter::{MetricFilter, Window};
use super::report::{MetricRow, MetricValue, GRADE_JUMP, OPERATOR_JUMP};
use super::stats::{format_number, median, round2};
use super::week::WeekRange;
use crate::constants::{self, Operation};
use crate::models::LearnerAttempt;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Grades that have a grade-jump sub row
const JUMP_SOURCE_GRADES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySpan<'a> {
    pub learner: &'a str,
    pub grade: &'a str,
    pub operation: &'a str,
    pub qset_grade: Option<&'a str>,
    pub date: NaiveDate,
    pub first_at: NaiveDateTime,
    pub last_at: NaiveDateTime,
    pub seconds: f64,
}

/// A learner leaving one stage for the next
#[derive(Debug, Clone, PartialEq)]
pub struct JumpEvent<'a> {
    pub learner: &'a str,
    /// Grade or operation left behind
    pub from: &'a str,
    pub minutes: f64,
    pub at: NaiveDateTime,
}

/// Cap each span; when a day's capped spans exceed the cap, keep the first
/// span's raw length and replace the rest with successive differences
pub fn overlap_adjusted(raw: &[f64], cap: f64) -> Vec<f64> {
    let clipped: Vec<f64> = raw.iter().map(|seconds| seconds.min(cap)).collect();
    if clipped.iter().sum::<f64>() <= cap {
        return clipped;
    }
    clipped
        .iter()
        .enumerate()
        .map(|(i, seconds)| {
            if i == 0 {
                raw[0]
            } else {
                (seconds - clipped[i - 1]).abs()
            }
        })
        .collect()
}

type SpanKey<'a> = (&'a str, &'a str, &'a str, Option<&'a str>, NaiveDate);

/// Per-day spans; `by_qset_grade` splits groups by question-set grade and
/// drops rows without one
pub fn activity_spans<'a>(
    rows: &[&'a LearnerAttempt],
    by_qset_grade: bool,
    cap_seconds: i64,
) -> Vec<ActivitySpan<'a>> {
    let mut bounds: HashMap<SpanKey<'a>, (NaiveDateTime, NaiveDateTime)> = HashMap::new();
    for row in rows {
        let (Some(grade), Some(operation)) = (row.grade.as_deref(), row.operation.as_deref()) else {
            continue;
        };
        let qset_grade = if by_qset_grade {
            match row.qset_grade.as_deref() {
                Some(qset_grade) => Some(qset_grade),
                None => continue,
            }
        } else {
            None
        };
        bounds
            .entry((row.learner_id.as_str(), grade, operation, qset_grade, row.date()))
            .and_modify(|(first, last)| {
                *first = (*first).min(row.updated_at);
                *last = (*last).max(row.updated_at);
            })
            .or_insert((row.updated_at, row.updated_at));
    }

    let mut spans: Vec<ActivitySpan<'a>> = bounds
        .into_iter()
        .map(|((learner, grade, operation, qset_grade, date), (first_at, last_at))| ActivitySpan {
            learner,
            grade,
            operation,
            qset_grade,
            date,
            first_at,
            last_at,
            seconds: (last_at - first_at).num_seconds() as f64,
        })
        .collect();
    spans.sort_by(|a, b| {
        (a.learner, a.date, a.first_at, a.operation, a.qset_grade, a.grade).cmp(&(
            b.learner,
            b.date,
            b.first_at,
            b.operation,
            b.qset_grade,
            b.grade,
        ))
    });

    let cap = cap_seconds as f64;
    let mut start = 0;
    while start < spans.len() {
        let day = (spans[start].learner, spans[start].date);
        let end = spans[start..]
            .iter()
            .position(|span| (span.learner, span.date) != day)
            .map_or(spans.len(), |offset| start + offset);
        let raw: Vec<f64> = spans[start..end].iter().map(|span| span.seconds).collect();
        for (span, seconds) in spans[start..end].iter_mut().zip(overlap_adjusted(&raw, cap)) {
            span.seconds = seconds;
        }
        start = end;
    }
    spans
}

struct Stage<'a> {
    learner: &'a str,
    operation: &'a str,
    qset_grade: &'a str,
    seconds: f64,
    first_at: NaiveDateTime,
}

fn sum_stages<'a>(spans: impl Iterator<Item = &'a ActivitySpan<'a>>, by_qset_grade: bool) -> Vec<Stage<'a>> {
    let mut stages: HashMap<(&'a str, &'a str, &'a str), (f64, NaiveDateTime)> = HashMap::new();
    for span in spans {
        let qset_grade = if by_qset_grade { span.qset_grade.unwrap_or_default() } else { "" };
        stages
            .entry((span.learner, span.operation, qset_grade))
            .and_modify(|(seconds, first)| {
                *seconds += span.seconds;
                *first = (*first).min(span.first_at);
            })
            .or_insert((span.seconds, span.first_at));
    }
    let mut stages: Vec<Stage<'a>> = stages
        .into_iter()
        .map(|((learner, operation, qset_grade), (seconds, first_at))| Stage {
            learner,
            operation,
            qset_grade,
            seconds,
            first_at,
        })
        .collect();
    stages.sort_by(|a, b| {
        (
            a.learner,
            Operation::order_of(a.operation),
            a.operation,
            constants::grade_order(a.qset_grade),
            a.qset_grade,
        )
            .cmp(&(
                b.learner,
                Operation::order_of(b.operation),
                b.operation,
                constants::grade_order(b.qset_grade),
                b.qset_grade,
            ))
    });
    stages
}

fn event<'a>(previous: &Stage<'a>, from: &'a str, current: &Stage<'a>) -> JumpEvent<'a> {
    JumpEvent {
        learner: previous.learner,
        from,
        minutes: round2(previous.seconds / 60.0),
        at: current.first_at,
    }
}

/// Question-set grade changes within an operation
pub fn grade_jump_events<'a>(spans: &'a [ActivitySpan<'a>], filter: &MetricFilter) -> Vec<JumpEvent<'a>> {
    let selected = spans.iter().filter(|span| {
        filter.grade.as_deref().is_none_or(|grade| span.grade == grade)
            && filter.operation.as_deref().is_none_or(|op| span.operation == op)
    });
    sum_stages(selected, true)
        .windows(2)
        .filter(|pair| pair[0].learner == pair[1].learner && pair[0].operation == pair[1].operation)
        .map(|pair| event(&pair[0], pair[0].qset_grade, &pair[1]))
        .collect()
}

/// Operation changes; only the grade filter applies
pub fn operator_jump_events<'a>(spans: &'a [ActivitySpan<'a>], filter: &MetricFilter) -> Vec<JumpEvent<'a>> {
    let selected = spans
        .iter()
        .filter(|span| filter.grade.as_deref().is_none_or(|grade| span.grade == grade));
    sum_stages(selected, false)
        .windows(2)
        .filter(|pair| pair[0].learner == pair[1].learner)
        .map(|pair| event(&pair[0], pair[0].operation, &pair[1]))
        .collect()
}

/// "median (learners)", or `None` without events
fn summarize(events: &[&JumpEvent<'_>]) -> Option<String> {
    let minutes: Vec<f64> = events.iter().map(|event| event.minutes).collect();
    let median = median(&minutes)?;
    let learners: HashSet<&str> = events.iter().map(|event| event.learner).collect();
    Some(format!("{} ({})", format_number(round2(median)), learners.len()))
}

fn weekly_summary(events: &[&JumpEvent<'_>]) -> BTreeMap<WeekRange, MetricValue> {
    let mut per_week: BTreeMap<WeekRange, Vec<&JumpEvent<'_>>> = BTreeMap::new();
    for &event in events {
        per_week.entry(WeekRange::containing(event.at.date())).or_default().push(event);
    }
    per_week
        .into_iter()
        .filter_map(|(week, events)| summarize(&events).map(|text| (week, MetricValue::Text(text))))
        .collect()
}

fn jump_rows(label: &str, events: &[JumpEvent<'_>], window: &Window, subs: &[(&str, String)]) -> Vec<MetricRow> {
    let in_window: Vec<&JumpEvent<'_>> = events
        .iter()
        .filter(|event| window.contains(event.at.date()))
        .collect();
    let overall: Vec<&JumpEvent<'_>> = if window.is_explicit() {
        in_window.clone()
    } else {
        events.iter().collect()
    };

    let mut rows = vec![MetricRow::new(
        label,
        MetricValue::Text(summarize(&overall).unwrap_or_default()),
    )
    .with_weekly(weekly_summary(&in_window))];

    for (from, sub_label) in subs {
        let overall_value =
            summarize(&leaving(&overall, from)).map_or(MetricValue::Null, MetricValue::Text);
        rows.push(
            MetricRow::sub(label, sub_label, overall_value)
                .with_weekly(weekly_summary(&leaving(&in_window, from))),
        );
    }
    rows
}

fn leaving<'e, 'a>(events: &[&'e JumpEvent<'a>], from: &str) -> Vec<&'e JumpEvent<'a>> {
    events.iter().copied().filter(|event| event.from == from).collect()
}

/// Grade jump rows from non-diagnostic activity
pub fn grade_jump(
    rows: &[&LearnerAttempt],
    filter: &MetricFilter,
    window: &Window,
    cap_seconds: i64,
) -> Vec<MetricRow> {
    let spans = activity_spans(rows, true, cap_seconds);
    let events = grade_jump_events(&spans, filter);
    let subs: Vec<(&str, String)> = constants::GRADE_NAMES[..JUMP_SOURCE_GRADES]
        .iter()
        .filter_map(|grade| constants::next_grade(grade).map(|next| (*grade, format!("{grade} to {next}"))))
        .collect();
    jump_rows(GRADE_JUMP, &events, window, &subs)
}

/// Operator jump rows from all activity, diagnostics included
pub fn operator_jump(
    rows: &[&LearnerAttempt],
    filter: &MetricFilter,
    window: &Window,
    cap_seconds: i64,
) -> Vec<MetricRow> {
    let spans = activity_spans(rows, false, cap_seconds);
    let events = operator_jump_events(&spans, filter);
    let subs: Vec<(&str, String)> = Operation::ALL
        .iter()
        .filter_map(|op| op.next().map(|next| (op.as_str(), format!("{op} to {next}"))))
        .collect();
    jump_rows(OPERATOR_JUMP, &events, window, &subs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fact::fixtures::attempt;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn default_window() -> Window {
        Window::resolve(&MetricFilter::default(), d("2024-03-13"), 5)
    }

    fn staged(learner: &str, at: &str, operation: &str, qset_grade: &str) -> LearnerAttempt {
        let mut row = attempt(learner, at);
        row.operation = Some(operation.to_string());
        row.qset_grade = Some(qset_grade.to_string());
        row
    }

    #[test]
    fn overlapping_spans_become_differences() {
        assert_eq!(overlap_adjusted(&[600.0, 300.0], 2700.0), vec![600.0, 300.0]);
        assert_eq!(
            overlap_adjusted(&[2000.0, 1500.0, 100.0], 2700.0),
            vec![2000.0, 500.0, 1400.0]
        );
        assert_eq!(overlap_adjusted(&[3000.0, 100.0], 2700.0), vec![3000.0, 2600.0]);
    }

    #[test]
    fn grade_jump_uses_time_on_previous_grade() {
        let rows = [
            staged("L1", "2024-03-04 10:00:00", "Addition", "class-one"),
            staged("L1", "2024-03-04 10:10:00", "Addition", "class-one"),
            staged("L1", "2024-03-05 09:00:00", "Addition", "class-two"),
            staged("L1", "2024-03-05 09:01:00", "Addition", "class-two"),
        ];
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();

        let spans = activity_spans(&refs, true, 2700);
        let events = grade_jump_events(&spans, &MetricFilter::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, "class-one");
        assert_eq!(events[0].minutes, 10.0);
        assert_eq!(events[0].at, rows[2].updated_at);

        let result = grade_jump(&refs, &MetricFilter::default(), &default_window(), 2700);
        assert_eq!(result.len(), 6);
        assert_eq!(result[0].overall, MetricValue::Text("10.0 (1)".to_string()));
        assert_eq!(result[1].sub_metric.as_deref(), Some("class-one to class-two"));
        assert_eq!(result[1].overall, MetricValue::Text("10.0 (1)".to_string()));
        assert!(result[2].overall.is_null());
        let week = WeekRange::containing(d("2024-03-05"));
        assert_eq!(result[0].week(&week), &MetricValue::Text("10.0 (1)".to_string()));
    }

    #[test]
    fn grade_jumps_do_not_cross_operations() {
        let rows = [
            staged("L1", "2024-03-04 10:00:00", "Addition", "class-one"),
            staged("L1", "2024-03-05 10:00:00", "Subtraction", "class-two"),
        ];
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        let spans = activity_spans(&refs, true, 2700);
        assert!(grade_jump_events(&spans, &MetricFilter::default()).is_empty());

        let result = grade_jump(&refs, &MetricFilter::default(), &default_window(), 2700);
        assert_eq!(result[0].overall, MetricValue::Text(String::new()));
    }

    #[test]
    fn operator_jump_follows_operation_order() {
        let rows = [
            staged("L1", "2024-03-05 09:00:00", "Subtraction", "class-one"),
            staged("L1", "2024-03-04 10:00:00", "Addition", "class-one"),
            staged("L1", "2024-03-04 10:05:00", "Addition", "class-one"),
        ];
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        let result = operator_jump(&refs, &MetricFilter::default(), &default_window(), 2700);
        assert_eq!(result.len(), 4);
        assert_eq!(result[0].overall, MetricValue::Text("5.0 (1)".to_string()));
        assert_eq!(result[1].sub_metric.as_deref(), Some("Addition to Subtraction"));
        assert_eq!(result[1].overall, MetricValue::Text("5.0 (1)".to_string()));
        assert!(result[3].overall.is_null());
    }

    #[test]
    fn explicit_range_bounds_jump_dates() {
        let rows = [
            staged("L1", "2024-03-04 10:00:00", "Addition", "class-one"),
            staged("L1", "2024-03-04 10:10:00", "Addition", "class-one"),
            staged("L1", "2024-03-20 09:00:00", "Addition", "class-two"),
        ];
        let refs: Vec<&LearnerAttempt> = rows.iter().collect();
        let filter = MetricFilter {
            from: Some(d("2024-03-01")),
            to: Some(d("2024-03-10")),
            ..Default::default()
        };
        let window = Window::resolve(&filter, d("2024-06-01"), 5);
        let result = grade_jump(&refs, &filter, &window, 2700);
        assert_eq!(result[0].overall, MetricValue::Text(String::new()));
        assert!(result[0].weekly.is_empty());
    }
}
