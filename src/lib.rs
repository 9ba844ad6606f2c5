#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Learner Metrics Core
//!
//! Cached learner-attempt snapshots and the derived metrics behind the
//! learning-platform dashboards.
//!
//! ## Overview
//!
//! Attempt rows and reference tables are read from the platform's PostgreSQL
//! schema, denormalised, and kept in a cache store (Redis or in-process Moka)
//! behind a freshness window. Dashboard requests are answered from the cached
//! snapshot; a stale cache triggers one incremental refresh first.
//!
//! ## Module Organization
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`database`] - Connection pool, retrying batched queries, source queries
//! - [`models`] - Attempt rows, reference tables, typed JSON columns
//! - [`cache`] - Cache backends and the read-through reference cache
//! - [`refresh`] - Incremental refresh pipeline and denormalisation
//! - [`metrics`] - Master dashboard metrics over the cached snapshot
//! - [`views`] - Progress and performance tables
//! - [`service`] - `DashboardService`, the request-facing handle
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use learner_metrics::config::ConfigManager;
//! use learner_metrics::metrics::MetricFilter;
//! use learner_metrics::service::DashboardService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! learner_metrics::logging::init_structured_logging();
//! let config = ConfigManager::load()?;
//! let service = DashboardService::connect(&config).await?;
//!
//! let report = service.master_metrics(&MetricFilter::default()).await?;
//! for row in &report.rows {
//!     println!("{} {:?} {}", row.metric, row.sub_metric, row.overall);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Integration tests run against an in-memory source store and the Moka
//! backend, so no database or Redis server is needed:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod refresh;
pub mod service;
pub mod views;

pub use cache::{CacheKey, CacheProvider, Clock, ReferenceCache, SystemClock};
pub use config::{ConfigManager, MetricsConfig, MetricsSettings};
pub use constants::Operation;
pub use database::PgSourceStore;
pub use error::{MetricsError, MetricsResult};
pub use metrics::{MetricFilter, MetricRow, MetricValue, MetricsEngine, MetricsReport};
pub use models::{LearnerAttempt, RawAttempt, ReferenceSnapshot};
pub use refresh::{RefreshOutcome, SourceStore};
pub use service::{DashboardService, DropdownOptions};
pub use views::ReportSource;
