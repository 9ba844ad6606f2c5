//! # Metric Engine
//!
//! Pure computation of the master dashboard over the cached fact snapshot.
//! Every metric yields an overall value and one value per Monday-to-Sunday
//! week of the reporting window.

pub mod accuracy;
pub mod engine;
pub mod filter;
pub mod jumps;
pub mod learners;
pub mod report;
pub mod sessions;
pub mod stats;
pub mod time_taken;
pub mod week;
pub mod work_done;

pub use engine::MetricsEngine;
pub use filter::{MetricFilter, Window};
pub use report::{MetricRow, MetricValue, MetricsReport, WeekColumn};
pub use week::WeekRange;
