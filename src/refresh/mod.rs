//! # Incremental Refresh
//!
//! Pulls reference tables and new attempt rows from the source store,
//! denormalises them and writes the cache entries.

pub mod denormalize;
pub mod pipeline;
pub mod source;

pub use denormalize::{canonical_learner_grade, Denormalizer};
pub use pipeline::{dedup_rows, RefreshMode, RefreshOutcome, RefreshPipeline};
pub use source::SourceStore;
