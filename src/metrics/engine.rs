//! Master dashboard computation over the cached fact snapshot

use super::accuracy::median_accuracy;
use super::filter::{select, DateScope, MetricFilter, Window};
use super::jumps::{grade_jump, operator_jump};
use super::learners::{active_learners, new_learners_added};
use super::report::MetricsReport;
use super::sessions::sessions;
use super::time_taken::time_spent;
use super::week::{weeks_between, WeekRange};
use super::work_done::work_done;
use crate::config::MetricsSettings;
use crate::error::MetricsResult;
use crate::models::LearnerAttempt;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    settings: MetricsSettings,
}

impl MetricsEngine {
    pub fn new(settings: MetricsSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MetricsSettings {
        &self.settings
    }

    /// Every master metric row, overall and per week of the window
    pub fn compute(
        &self,
        rows: &[LearnerAttempt],
        filter: &MetricFilter,
        today: NaiveDate,
    ) -> MetricsResult<MetricsReport> {
        filter.validate()?;
        let settings = &self.settings;
        let window = Window::resolve(filter, today, settings.trailing_weeks);
        let cap = settings.daily_cap_seconds;

        let scoped: Vec<&LearnerAttempt> = rows.iter().filter(|row| filter.matches_school(row)).collect();
        let overall = select(&scoped, filter, DateScope::Overall, true);
        let overall_any_operation = select(&scoped, filter, DateScope::Overall, false);
        let weekly = select(&scoped, filter, DateScope::Weekly(&window), true);
        let weekly_any_operation = select(&scoped, filter, DateScope::Weekly(&window), false);

        // Anyone seen in the school before the window, whatever grade or operation
        let seed: HashSet<&str> = scoped
            .iter()
            .filter(|row| row.date() < window.start)
            .map(|row| row.learner_id.as_str())
            .collect();
        let non_diagnostic: Vec<&LearnerAttempt> = scoped
            .iter()
            .copied()
            .filter(|row| !row.is_diagnostic(&settings.diagnostic_purpose))
            .collect();

        let mut metric_rows = active_learners(&overall, &weekly);
        metric_rows.push(new_learners_added(&weekly, seed));
        metric_rows.push(sessions(
            &overall_any_operation,
            &weekly_any_operation,
            settings.session_min_learners,
        ));
        metric_rows.extend(time_spent(&overall, &weekly, cap));
        metric_rows.extend(grade_jump(&non_diagnostic, filter, &window, cap));
        metric_rows.extend(operator_jump(&scoped, filter, &window, cap));
        metric_rows.extend(work_done(&overall, &weekly));
        metric_rows.push(median_accuracy(&overall, &weekly));

        let weeks = weeks_between(window.start, window.last_day);
        let shown: HashSet<WeekRange> = weeks.iter().copied().collect();
        for row in &mut metric_rows {
            row.weekly.retain(|week, _| shown.contains(week));
        }

        debug!(
            rows = rows.len(),
            overall_rows = overall.len(),
            weekly_rows = weekly.len(),
            weeks = weeks.len(),
            window_start = %window.start,
            explicit_range = window.is_explicit(),
            "Computed master metrics"
        );

        Ok(MetricsReport {
            weeks,
            rows: metric_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use crate::metrics::report::{self, MetricValue};
    use crate::models::fact::fixtures::attempt;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn report_has_every_row_in_order() {
        let rows = vec![attempt("L1", "2024-03-12 10:00:00")];
        let report = MetricsEngine::default()
            .compute(&rows, &MetricFilter::default(), d("2024-03-13"))
            .unwrap();

        let labels: Vec<(&str, Option<&str>)> = report
            .rows
            .iter()
            .map(|row| (row.metric.as_str(), row.sub_metric.as_deref()))
            .collect();
        assert_eq!(labels.len(), 23);
        assert_eq!(labels[0], (report::ACTIVE_LEARNERS, None));
        assert_eq!(labels[5], (report::NEW_LEARNERS_ADDED, None));
        assert_eq!(labels[6], (report::SESSIONS, None));
        assert_eq!(labels[9], (report::GRADE_JUMP, None));
        assert_eq!(labels[15], (report::OPERATOR_JUMP, None));
        assert_eq!(labels[22], (report::MEDIAN_ACCURACY, None));
        assert_eq!(report.weeks.len(), 6);
        assert_eq!(report.weeks[0].id(), "2024-03-11,2024-03-17");
    }

    #[test]
    fn school_filter_scopes_every_metric() {
        let mut other = attempt("L2", "2024-03-12 10:00:00");
        other.school = "School B".to_string();
        let rows = vec![attempt("L1", "2024-03-12 10:00:00"), other];
        let filter = MetricFilter {
            school: Some("School B".to_string()),
            ..Default::default()
        };
        let report = MetricsEngine::default().compute(&rows, &filter, d("2024-03-13")).unwrap();
        let active = report.row(report::ACTIVE_LEARNERS, None).unwrap();
        assert_eq!(active.overall, MetricValue::Count(1));
    }

    fn new_learners_in_week(report: &MetricsReport, day: &str) -> MetricValue {
        report
            .row(report::NEW_LEARNERS_ADDED, None)
            .unwrap()
            .week(&WeekRange::containing(d(day)))
            .clone()
    }

    #[test]
    fn earlier_work_on_another_operation_is_not_new() {
        let mut before = attempt("L1", "2024-01-08 10:00:00");
        before.operation = Some("Addition".to_string());
        let mut inside = attempt("L1", "2024-03-12 10:00:00");
        inside.operation = Some("Subtraction".to_string());
        let mut newcomer = attempt("L2", "2024-03-12 10:00:00");
        newcomer.operation = Some("Subtraction".to_string());

        let filter = MetricFilter {
            operation: Some("Subtraction".to_string()),
            ..Default::default()
        };
        let report = MetricsEngine::default()
            .compute(&[before, inside, newcomer], &filter, d("2024-03-13"))
            .unwrap();

        assert_eq!(new_learners_in_week(&report, "2024-03-12"), MetricValue::Count(1));
    }

    #[test]
    fn earlier_work_in_another_grade_is_not_new() {
        let mut before = attempt("L1", "2024-01-08 10:00:00");
        before.grade = Some("class-one".to_string());
        let inside = attempt("L1", "2024-03-12 10:00:00");

        let filter = MetricFilter {
            grade: Some("class-two".to_string()),
            ..Default::default()
        };
        let report = MetricsEngine::default()
            .compute(&[before, inside], &filter, d("2024-03-13"))
            .unwrap();

        assert_eq!(new_learners_in_week(&report, "2024-03-12"), MetricValue::Count(0));
        let active = report.row(report::ACTIVE_LEARNERS, None).unwrap();
        assert_eq!(active.overall, MetricValue::Count(1));
    }

    #[test]
    fn inverted_range_fails() {
        let filter = MetricFilter {
            from: Some(d("2024-03-10")),
            to: Some(d("2024-03-01")),
            ..Default::default()
        };
        let err = MetricsEngine::default().compute(&[], &filter, d("2024-03-13")).unwrap_err();
        assert!(matches!(err, MetricsError::Validation(_)));
    }
}
