//! Database error types
//!
//! Maps SQLx failures onto meaningful variants, in particular turning
//! PostgreSQL constraint violations into errors the domain layer can treat
//! as conflicts.

use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Stored data that cannot be mapped back onto a domain value
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    /// Creates a corrupt-row error naming the offending column
    pub fn corrupt(column: &str, detail: impl std::fmt::Display) -> Self {
        DatabaseError::CorruptRow(format!("column '{}': {}", column, detail))
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Checks if this error is a uniqueness conflict
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DatabaseError::DuplicateEntry(_))
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps SQLx errors to DatabaseError variants by PostgreSQL error code
///
/// https://www.postgresql.org/docs/current/errcodes-appendix.html
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                        "23503" => {
                            DatabaseError::ForeignKeyViolation(db_err.message().to_string())
                        }
                        "23514" => {
                            DatabaseError::ConstraintViolation(db_err.message().to_string())
                        }
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

/// Translates database errors into the port error vocabulary
///
/// Unique violations become Conflict so the doorstep checks in the services
/// and the index backstop here produce the same caller-visible outcome.
impl From<DatabaseError> for core_kernel::PortError {
    fn from(error: DatabaseError) -> Self {
        use core_kernel::PortError;
        match &error {
            DatabaseError::NotFound(msg) => PortError::NotFound {
                entity_type: "Record".to_string(),
                id: msg.clone(),
            },
            DatabaseError::DuplicateEntry(msg) => PortError::conflict(msg.clone()),
            DatabaseError::ForeignKeyViolation(msg) | DatabaseError::ConstraintViolation(msg) => {
                PortError::validation(msg.clone())
            }
            DatabaseError::ConnectionFailed(msg) => PortError::connection(msg.clone()),
            DatabaseError::PoolExhausted => PortError::connection("Connection pool exhausted"),
            _ => PortError::internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PortError;

    #[test]
    fn test_not_found_helper() {
        let error = DatabaseError::not_found("Doctor", "DOC-123");
        assert!(error.is_not_found());
        assert!(error.to_string().contains("Doctor"));
    }

    #[test]
    fn test_duplicate_maps_to_port_conflict() {
        let error = DatabaseError::DuplicateEntry("uq_visits_mr_doctor_day".to_string());
        let port: PortError = error.into();
        assert!(port.is_conflict());
    }

    #[test]
    fn test_pool_exhaustion_maps_to_connection() {
        let port: PortError = DatabaseError::PoolExhausted.into();
        assert!(matches!(port, PortError::Connection { .. }));
    }
}
