//! Filter parameters and the date scopes derived from them

use crate::error::{MetricsError, MetricsResult};
use crate::models::LearnerAttempt;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub operation: Option<String>,
}

impl MetricFilter {
    /// The date range, only when both ends are given
    pub fn explicit_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.from?, self.to?))
    }

    pub fn validate(&self) -> MetricsResult<()> {
        if let Some((from, to)) = self.explicit_range() {
            if from > to {
                return Err(MetricsError::Validation(format!(
                    "date range starts after it ends: {from} > {to}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches_school(&self, row: &LearnerAttempt) -> bool {
        self.school.as_deref().is_none_or(|school| row.school == school)
    }

    pub fn matches_grade(&self, row: &LearnerAttempt) -> bool {
        self.grade
            .as_deref()
            .is_none_or(|grade| row.grade.as_deref() == Some(grade))
    }

    pub fn matches_operation(&self, row: &LearnerAttempt) -> bool {
        self.operation
            .as_deref()
            .is_none_or(|op| row.operation.as_deref() == Some(op))
    }
}

/// Dates covered by the weekly breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    /// Upper bound on row dates; only an explicit range has one
    pub end: Option<NaiveDate>,
    /// Last day shown as a week column
    pub last_day: NaiveDate,
}

impl Window {
    /// The explicit range, or `trailing_weeks` weeks before this Monday up to today
    pub fn resolve(filter: &MetricFilter, today: NaiveDate, trailing_weeks: i64) -> Self {
        match filter.explicit_range() {
            Some((from, to)) => Self {
                start: from,
                end: Some(to),
                last_day: to,
            },
            None => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Self {
                    start: monday - Duration::weeks(trailing_weeks),
                    end: None,
                    last_day: today,
                }
            }
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.end.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }
}

/// Which dates a population keeps
#[derive(Debug, Clone, Copy)]
pub enum DateScope<'w> {
    /// Explicit range when given, otherwise all history
    Overall,
    Weekly(&'w Window),
}

/// Rows matching the school and grade filters, the date scope, and the
/// operation filter when `with_operation` is set
pub fn select<'a>(
    rows: &[&'a LearnerAttempt],
    filter: &MetricFilter,
    dates: DateScope<'_>,
    with_operation: bool,
) -> Vec<&'a LearnerAttempt> {
    let range = filter.explicit_range();
    rows.iter()
        .copied()
        .filter(|row| match dates {
            DateScope::Overall => {
                range.is_none_or(|(from, to)| (from..=to).contains(&row.date()))
            }
            DateScope::Weekly(window) => window.contains(row.date()),
        })
        .filter(|row| filter.matches_school(row) && filter.matches_grade(row))
        .filter(|row| !with_operation || filter.matches_operation(row))
        .collect()
}
