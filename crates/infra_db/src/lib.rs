//! Infrastructure Database Layer
//!
//! PostgreSQL implementations of the domain ports, plus pool construction
//! and embedded migrations.
//!
//! # Architecture
//!
//! Each domain port gets one adapter that owns its SQL. Rows travel as
//! plain structs; enumerations are stored under their wire spelling and
//! parsed back on read. Invariants the services pre-check (one active
//! coverage plan per slot, one non-cancelled visit per MR-doctor-day, one
//! beat plan per MR-day) are backed by unique indexes here, so a race that
//! slips past a service check still surfaces as a conflict.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool_from_url, run_migrations};
//! use infra_db::adapters::PostgresVisitAdapter;
//!
//! let pool = create_pool_from_url("postgres://localhost/fieldforce").await?;
//! run_migrations(&pool).await?;
//! let ledger = PostgresVisitAdapter::new(pool, timezone);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;

pub use adapters::{
    PostgresBeatAdapter, PostgresCoverageAdapter, PostgresDirectoryAdapter, PostgresVisitAdapter,
};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
