//! # Dashboard Views
//!
//! Data functions behind the dashboard pages. Each returns plain rows ready
//! for a table; layout and styling belong to the presentation layer.

pub mod catalogue;
pub mod grade_performance;
pub mod learner_detail;
pub mod learner_progress;
pub mod learners_list;
pub mod qset_performance;
pub mod question_performance;
pub mod source;

pub use grade_performance::{grade_performance, GradePerformanceRow};
pub use learner_detail::{learner_detail, AttemptedDate, LearnerDetail, LearnerDetailFilter, LearnerQsetRow};
pub use learner_progress::{learner_progress, GradeShare, ProgressRow};
pub use learners_list::{learners_list, LearnerListRow, LearnersListFilter};
pub use qset_performance::{qset_performance, QsetPerformanceRow};
pub use question_performance::{question_performance, QuestionPerformanceRow};
pub use source::{
    GradePerformanceFilter, QsetAttempt, QsetPerformanceFilter, QsetScore, QuestionAttempt, ReportSource,
};
