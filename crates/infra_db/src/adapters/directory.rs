//! PostgreSQL Directory Adapter
//!
//! Implements `DirectoryPort` against the `users` and `doctors` tables.
//! Enumerations are stored as their wire spelling (TEXT with CHECK), so a
//! value that fails to parse on the way back out is reported as a corrupt
//! row rather than silently defaulted.

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use chrono::{DateTime, Utc};
use core_kernel::{
    DomainPort, DoctorId, HealthCheckResult, HealthCheckable, PortError, UserId,
};
use domain_directory::{Doctor, DoctorQuery, DirectoryPort, Role, User, UserQuery};

use crate::error::DatabaseError;

const USER_COLUMNS: &str =
    "id, name, email, phone, role, manager_id, is_active, created_at, updated_at";
const DOCTOR_COLUMNS: &str = "id, name, specialization, clinic_name, city, phone, assigned_mr, \
     is_approved, is_active, created_by, created_at, updated_at";

/// PostgreSQL-backed implementation of the DirectoryPort trait
#[derive(Debug, Clone)]
pub struct PostgresDirectoryAdapter {
    pool: PgPool,
}

impl PostgresDirectoryAdapter {
    /// Creates a new PostgreSQL directory adapter
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresDirectoryAdapter {}

#[async_trait]
impl HealthCheckable for PostgresDirectoryAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::check_pool(&self.pool, "postgres-directory-adapter").await
    }
}

#[async_trait]
impl DirectoryPort for PostgresDirectoryAdapter {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        debug!("Fetching user by ID");

        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found("User", id))?;

        Ok(row_to_user(row)?)
    }

    #[instrument(skip(self, query))]
    async fn find_users(&self, query: UserQuery) -> Result<Vec<User>, PortError> {
        debug!("Finding users with query: {:?}", query);

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        if let Some(role) = query.role {
            builder.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(manager_id) = query.manager_id {
            builder.push(" AND manager_id = ").push_bind(*manager_id.as_uuid());
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        builder.push(" ORDER BY created_at, id");
        super::push_page(&mut builder, query.limit, query.offset);

        let rows: Vec<UserRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| row_to_user(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> Result<(), PortError> {
        debug!("Inserting user");

        sqlx::query(
            "INSERT INTO users \
             (id, name, email, phone, role, manager_id, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.manager_id.map(Uuid::from))
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> Result<(), PortError> {
        debug!("Updating user");

        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, phone = $4, role = $5, \
             manager_id = $6, is_active = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.manager_id.map(Uuid::from))
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("User", user.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(doctor_id = %id))]
    async fn get_doctor(&self, id: DoctorId) -> Result<Doctor, PortError> {
        debug!("Fetching doctor by ID");

        let sql = format!("SELECT {} FROM doctors WHERE id = $1", DOCTOR_COLUMNS);
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found("Doctor", id))?;

        Ok(row_to_doctor(row))
    }

    #[instrument(skip(self, query))]
    async fn find_doctors(&self, query: DoctorQuery) -> Result<Vec<Doctor>, PortError> {
        debug!("Finding doctors with query: {:?}", query);

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM doctors WHERE TRUE", DOCTOR_COLUMNS));
        if let Some(ref mrs) = query.assigned_mrs {
            let ids: Vec<Uuid> = mrs.iter().map(|id| *id.as_uuid()).collect();
            builder.push(" AND assigned_mr = ANY(").push_bind(ids).push(")");
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(is_approved) = query.is_approved {
            builder.push(" AND is_approved = ").push_bind(is_approved);
        }
        if let Some(ref city) = query.city {
            builder.push(" AND city = ").push_bind(city.clone());
        }
        builder.push(" ORDER BY created_at, id");
        super::push_page(&mut builder, query.limit, query.offset);

        let rows: Vec<DoctorRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(row_to_doctor).collect())
    }

    #[instrument(skip(self, doctor), fields(doctor_id = %doctor.id))]
    async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), PortError> {
        debug!("Inserting doctor");

        sqlx::query(
            "INSERT INTO doctors \
             (id, name, specialization, clinic_name, city, phone, assigned_mr, \
              is_approved, is_active, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(*doctor.id.as_uuid())
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.clinic_name)
        .bind(&doctor.city)
        .bind(&doctor.phone)
        .bind(doctor.assigned_mr.map(Uuid::from))
        .bind(doctor.is_approved)
        .bind(doctor.is_active)
        .bind(*doctor.created_by.as_uuid())
        .bind(doctor.created_at)
        .bind(doctor.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    #[instrument(skip(self, doctor), fields(doctor_id = %doctor.id))]
    async fn update_doctor(&self, doctor: &Doctor) -> Result<(), PortError> {
        debug!("Updating doctor");

        let result = sqlx::query(
            "UPDATE doctors SET name = $2, specialization = $3, clinic_name = $4, \
             city = $5, phone = $6, assigned_mr = $7, is_approved = $8, is_active = $9, \
             updated_at = $10 WHERE id = $1",
        )
        .bind(*doctor.id.as_uuid())
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.clinic_name)
        .bind(&doctor.city)
        .bind(&doctor.phone)
        .bind(doctor.assigned_mr.map(Uuid::from))
        .bind(doctor.is_approved)
        .bind(doctor.is_active)
        .bind(doctor.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Doctor", doctor.id));
        }
        Ok(())
    }
}

// =============================================================================
// Row Types and Conversions
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    role: String,
    manager_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DoctorRow {
    id: Uuid,
    name: String,
    specialization: Option<String>,
    clinic_name: Option<String>,
    city: Option<String>,
    phone: Option<String>,
    assigned_mr: Option<Uuid>,
    is_approved: bool,
    is_active: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_user(row: UserRow) -> Result<User, DatabaseError> {
    let role: Role = row.role.parse().map_err(|_| {
        DatabaseError::corrupt("users.role", format!("'{}' on user {}", row.role, row.id))
    })?;

    Ok(User {
        id: UserId::from(row.id),
        name: row.name,
        email: row.email,
        phone: row.phone,
        role,
        manager_id: row.manager_id.map(UserId::from),
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_doctor(row: DoctorRow) -> Doctor {
    Doctor {
        id: DoctorId::from(row.id),
        name: row.name,
        specialization: row.specialization,
        clinic_name: row.clinic_name,
        city: row.city,
        phone: row.phone,
        assigned_mr: row.assigned_mr.map(UserId::from),
        is_approved: row.is_approved,
        is_active: row.is_active,
        created_by: UserId::from(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
