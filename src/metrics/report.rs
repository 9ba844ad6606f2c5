//! Metric rows and the assembled report

use super::stats::format_number;
use super::week::WeekRange;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const ACTIVE_LEARNERS: &str = "Active Learners";
pub const NEW_LEARNERS_ADDED: &str = "New Learners Added";
pub const SESSIONS: &str = "Sessions";
pub const TOTAL_TIME_SPENT: &str = "Total Time Spent (In Min)";
pub const AVERAGE_TIME_PER_LEARNER: &str = "Average Time Spent Per Learner (In Min)";
pub const GRADE_JUMP: &str = "Median Time (In Min) For A Grade Jump";
pub const OPERATOR_JUMP: &str = "Median Time (In Min) For An Operator Jump";
pub const WORK_DONE: &str = "Work Done";
pub const WORK_DONE_PER_LEARNER: &str = "Work Done Per Learner";
pub const MEDIAN_WORK_DONE_PER_LEARNER: &str = "Median Work Done Per Learner";
pub const MEDIAN_ACCURACY: &str = "Median Accuracy Of Learners";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Number(f64),
    Text(String),
    Null,
}

impl MetricValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetricValue::Null)
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            MetricValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(x) => Some(*x),
            MetricValue::Count(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Count for non-zero values, `Null` otherwise
    pub fn count_or_null(n: usize) -> Self {
        if n == 0 {
            MetricValue::Null
        } else {
            MetricValue::Count(n as u64)
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Number(x) => f.write_str(&format_number(*x)),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::Null => Ok(()),
        }
    }
}

static NULL_VALUE: MetricValue = MetricValue::Null;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub sub_metric: Option<String>,
    pub overall: MetricValue,
    pub weekly: BTreeMap<WeekRange, MetricValue>,
}

impl MetricRow {
    pub fn new(metric: &str, overall: MetricValue) -> Self {
        Self {
            metric: metric.to_string(),
            sub_metric: None,
            overall,
            weekly: BTreeMap::new(),
        }
    }

    pub fn sub(metric: &str, sub_metric: &str, overall: MetricValue) -> Self {
        Self {
            sub_metric: Some(sub_metric.to_string()),
            ..Self::new(metric, overall)
        }
    }

    pub fn with_weekly(mut self, weekly: BTreeMap<WeekRange, MetricValue>) -> Self {
        self.weekly = weekly;
        self
    }

    /// Value for `week`; weeks without data are `Null`
    pub fn week(&self, week: &WeekRange) -> &MetricValue {
        self.weekly.get(week).unwrap_or(&NULL_VALUE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekColumn {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    /// Window weeks, newest first
    pub weeks: Vec<WeekRange>,
    pub rows: Vec<MetricRow>,
}

impl MetricsReport {
    pub fn week_columns(&self) -> Vec<WeekColumn> {
        self.weeks
            .iter()
            .map(|week| WeekColumn {
                id: week.id(),
                name: week.name(),
            })
            .collect()
    }

    pub fn row(&self, metric: &str, sub_metric: Option<&str>) -> Option<&MetricRow> {
        self.rows
            .iter()
            .find(|row| row.metric == metric && row.sub_metric.as_deref() == sub_metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_display() {
        assert_eq!(MetricValue::Count(7).to_string(), "7");
        assert_eq!(MetricValue::Number(4.0).to_string(), "4.0");
        assert_eq!(MetricValue::Text("1.5 (2)".into()).to_string(), "1.5 (2)");
        assert_eq!(MetricValue::Null.to_string(), "");
        assert_eq!(MetricValue::count_or_null(0), MetricValue::Null);
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_string(&vec![
            MetricValue::Count(3),
            MetricValue::Number(1.5),
            MetricValue::Text("x".into()),
            MetricValue::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[3,1.5,"x",null]"#);
    }

    #[test]
    fn missing_week_reads_null() {
        let week = WeekRange::containing(chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        let row = MetricRow::new(SESSIONS, MetricValue::Count(0));
        assert!(row.week(&week).is_null());
    }
}
