//! Monday-to-Sunday week buckets

use crate::models::LearnerAttempt;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekRange {
    start: NaiveDate,
}

impl WeekRange {
    /// The week holding `date`
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Self {
            start: date - Duration::days(offset),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
        }
    }

    /// Column id, e.g. `2024-03-04,2024-03-10`
    pub fn id(&self) -> String {
        format!(
            "{},{}",
            self.start.format("%Y-%m-%d"),
            self.end().format("%Y-%m-%d")
        )
    }

    /// Display name, e.g. `04 Mar to 10 Mar 2024`
    pub fn name(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%d %b"),
            self.end().format("%d %b %Y")
        )
    }
}

impl fmt::Display for WeekRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl Serialize for WeekRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Every week touching `[from, to]`, newest first
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> Vec<WeekRange> {
    let last = WeekRange::containing(to);
    let mut week = WeekRange::containing(from);
    let mut weeks = Vec::new();
    while week <= last {
        weeks.push(week);
        week = week.next();
    }
    weeks.reverse();
    weeks
}

/// Rows grouped by the week of their attempt date; empty weeks are absent
pub fn bucket_by_week<'a>(rows: &[&'a LearnerAttempt]) -> BTreeMap<WeekRange, Vec<&'a LearnerAttempt>> {
    let mut buckets: BTreeMap<WeekRange, Vec<&'a LearnerAttempt>> = BTreeMap::new();
    for &row in rows {
        buckets
            .entry(WeekRange::containing(row.date()))
            .or_default()
            .push(row);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn week_bucket_starts_on_monday() {
        let week = WeekRange::containing(d("2024-03-10"));
        assert_eq!(week.start(), d("2024-03-04"));
        assert_eq!(week.end(), d("2024-03-10"));
        assert_eq!(WeekRange::containing(d("2024-03-04")), week);
        assert_eq!(week.id(), "2024-03-04,2024-03-10");
        assert_eq!(week.name(), "04 Mar to 10 Mar 2024");
    }

    #[test]
    fn name_spans_year_boundary() {
        let week = WeekRange::containing(d("2024-12-31"));
        assert_eq!(week.name(), "30 Dec to 05 Jan 2025");
    }

    #[test]
    fn weeks_newest_first() {
        let weeks = weeks_between(d("2024-03-06"), d("2024-03-20"));
        let ids: Vec<_> = weeks.iter().map(WeekRange::id).collect();
        assert_eq!(
            ids,
            vec![
                "2024-03-18,2024-03-24",
                "2024-03-11,2024-03-17",
                "2024-03-04,2024-03-10",
            ]
        );
        assert!(weeks_between(d("2024-03-20"), d("2024-03-06")).is_empty());
    }

    #[test]
    fn rows_bucket_by_week() {
        use crate::models::fact::fixtures::attempt;
        let a = attempt("L1", "2024-03-04 10:00:00");
        let b = attempt("L1", "2024-03-10 23:59:00");
        let c = attempt("L2", "2024-03-11 00:00:00");
        let buckets = bucket_by_week(&[&a, &b, &c]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&WeekRange::containing(d("2024-03-04"))].len(), 2);
    }
}
