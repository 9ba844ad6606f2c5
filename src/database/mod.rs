//! # Database Operations
//!
//! Read-only access to the learning platform's PostgreSQL schema.
//!
//! ## Key Components
//!
//! - [`connection`] - Pool construction and health checks
//! - [`filters`] - Typed predicates rendered as bound parameters
//! - [`query_executor`] - Batched fetches with bounded retry
//! - [`source`] - The source-store and report-source queries
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use learner_metrics::config::DatabaseConfig;
//! use learner_metrics::database::{DatabaseConnection, PgSourceStore, QueryExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect(&DatabaseConfig::default()).await?;
//! let executor = QueryExecutor::new(db.pool().clone(), &Default::default());
//! let store = PgSourceStore::new(executor);
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod filters;
pub mod query_executor;
pub mod retry;
pub mod source;

pub use connection::DatabaseConnection;
pub use filters::{push_where, Predicate, SqlValue};
pub use query_executor::QueryExecutor;
pub use retry::RetryPolicy;
pub use source::PgSourceStore;
