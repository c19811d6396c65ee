//! PostgreSQL Port Adapters
//!
//! One adapter per domain port. Each adapter owns the SQL for its tables,
//! translates between row types and domain models, and funnels database
//! errors through [`DatabaseError`](crate::error::DatabaseError) into
//! `PortError`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresDirectoryAdapter;
//! use domain_directory::DirectoryPort;
//!
//! let adapter = PostgresDirectoryAdapter::new(pool);
//! let user = adapter.get_user(user_id).await?;
//! ```

use chrono::Utc;
use sqlx::{PgPool, QueryBuilder};

use core_kernel::{AdapterHealth, HealthCheckResult};

pub mod beat;
pub mod coverage;
pub mod directory;
pub mod visit;

pub use beat::PostgresBeatAdapter;
pub use coverage::PostgresCoverageAdapter;
pub use directory::PostgresDirectoryAdapter;
pub use visit::PostgresVisitAdapter;

/// Probes the pool with `SELECT 1` and reports latency
pub(crate) async fn check_pool(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(format!("Database error: {}", e)),
            checked_at: Utc::now(),
        },
    }
}

/// Appends LIMIT/OFFSET clauses when the query asks for them
pub(crate) fn push_page(
    builder: &mut QueryBuilder<'_, sqlx::Postgres>,
    limit: Option<u32>,
    offset: Option<u32>,
) {
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }
    if let Some(offset) = offset {
        builder.push(" OFFSET ").push_bind(i64::from(offset));
    }
}
