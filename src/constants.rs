//! # System Constants
//!
//! Fixed orderings and operational limits shared by the refresh pipeline and
//! the metric engine: the grade ordinal map, the arithmetic operation sequence,
//! and the default freshness, retry and metric thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_FRESHNESS_SECONDS: u64 = 3600;
pub const DEFAULT_QUERY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Distinct learners needed for a (school, grade, date) triple to count as a session
pub const SESSION_MIN_LEARNERS: usize = 3;

/// Per-day activity cap, 45 minutes
pub const DAILY_CAP_SECONDS: i64 = 2700;

/// Weeks before the current Monday covered by the default weekly window
pub const TRAILING_WEEKS: i64 = 5;

pub const DIAGNOSTIC_PURPOSE: &str = "Main Diagnostic";

/// School assigned to learners without one
pub const NO_SCHOOL: &str = "No School";

/// Current-grade bucket for learners who reached their target grade
pub const TARGET_ACHIEVED: &str = "target-achieved";

/// Canonical grade names indexed by ordinal minus one
pub const GRADE_NAMES: [&str; 10] = [
    "class-one",
    "class-two",
    "class-three",
    "class-four",
    "class-five",
    "class-six",
    "class-seven",
    "class-eight",
    "class-nine",
    "class-ten",
];

/// Canonical grade name for a 1-based ordinal
pub fn grade_name(ordinal: i64) -> Option<&'static str> {
    if (1..=GRADE_NAMES.len() as i64).contains(&ordinal) {
        Some(GRADE_NAMES[(ordinal - 1) as usize])
    } else {
        None
    }
}

/// 1-based ordinal for a canonical grade name
pub fn grade_ordinal(name: &str) -> Option<i64> {
    GRADE_NAMES
        .iter()
        .position(|g| *g == name)
        .map(|idx| idx as i64 + 1)
}

/// The grade following `name`, if any
pub fn next_grade(name: &str) -> Option<&'static str> {
    grade_ordinal(name).and_then(|ordinal| grade_name(ordinal + 1))
}

/// Arithmetic operations in their fixed progression order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "Addition",
            Operation::Subtraction => "Subtraction",
            Operation::Multiplication => "Multiplication",
            Operation::Division => "Division",
        }
    }

    pub fn order(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<Operation> {
        Self::ALL.get(self.order() + 1).copied()
    }

    /// Sort position of an operation name; unknown names sort last
    pub fn order_of(name: &str) -> usize {
        name.parse::<Operation>()
            .map(|op| op.order())
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|op| op.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// Sort position of a grade name; unknown names sort last
pub fn grade_order(name: &str) -> i64 {
    grade_ordinal(name).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_priority_map() {
        assert_eq!(grade_name(1), Some("class-one"));
        assert_eq!(grade_name(10), Some("class-ten"));
        assert_eq!(grade_name(0), None);
        assert_eq!(grade_name(11), None);
        assert_eq!(grade_ordinal("class-three"), Some(3));
        assert_eq!(next_grade("class-five"), Some("class-six"));
        assert_eq!(next_grade("class-ten"), None);
    }

    #[test]
    fn operation_order() {
        assert!(Operation::Addition < Operation::Division);
        assert_eq!(Operation::Subtraction.next(), Some(Operation::Multiplication));
        assert_eq!(Operation::Division.next(), None);
        assert_eq!(Operation::order_of("Multiplication"), 2);
        assert_eq!(Operation::order_of("Fractions"), 4);
        assert_eq!("Division".parse::<Operation>(), Ok(Operation::Division));
    }
}
