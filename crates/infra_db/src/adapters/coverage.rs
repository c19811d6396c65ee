//! PostgreSQL Coverage Plan Adapter
//!
//! Implements `CoveragePlanStore` against the `coverage_plans` table. Months
//! are stored as their `YYYY-MM` spelling, which sorts chronologically as
//! text. The one-active-plan-per-slot invariant is enforced here by a
//! partial unique index; a racing insert comes back as a Conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    CoveragePlanId, DoctorId, DomainPort, HealthCheckResult, HealthCheckable, MonthKey, PortError,
    UserId,
};
use domain_coverage::{ComplianceStatus, CoveragePlan, CoveragePlanStore, PlanQuery};

use crate::error::DatabaseError;

const PLAN_COLUMNS: &str = "id, doctor_id, assigned_mr, month, planned_visits, actual_visits, \
     compliance_percentage, status, is_active, created_by, created_at, updated_at";

/// PostgreSQL-backed implementation of the CoveragePlanStore trait
#[derive(Debug, Clone)]
pub struct PostgresCoverageAdapter {
    pool: PgPool,
}

impl PostgresCoverageAdapter {
    /// Creates a new PostgreSQL coverage adapter
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresCoverageAdapter {}

#[async_trait]
impl HealthCheckable for PostgresCoverageAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::check_pool(&self.pool, "postgres-coverage-adapter").await
    }
}

#[async_trait]
impl CoveragePlanStore for PostgresCoverageAdapter {
    #[instrument(skip(self), fields(plan_id = %id))]
    async fn get_plan(&self, id: CoveragePlanId) -> Result<CoveragePlan, PortError> {
        debug!("Fetching coverage plan by ID");

        let sql = format!("SELECT {} FROM coverage_plans WHERE id = $1", PLAN_COLUMNS);
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found("CoveragePlan", id))?;

        Ok(row_to_plan(row)?)
    }

    #[instrument(skip(self, query))]
    async fn find_plans(&self, query: PlanQuery) -> Result<Vec<CoveragePlan>, PortError> {
        debug!("Finding coverage plans with query: {:?}", query);

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM coverage_plans WHERE TRUE",
            PLAN_COLUMNS
        ));
        if let Some(month) = query.month {
            builder.push(" AND month = ").push_bind(month.to_string());
        }
        if let Some(doctor_id) = query.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(*doctor_id.as_uuid());
        }
        if let Some(ref mrs) = query.mr_ids {
            let ids: Vec<Uuid> = mrs.iter().map(|id| *id.as_uuid()).collect();
            builder.push(" AND assigned_mr = ANY(").push_bind(ids).push(")");
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        builder.push(" ORDER BY month, created_at, id");
        super::push_page(&mut builder, query.limit, query.offset);

        let rows: Vec<PlanRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| row_to_plan(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self), fields(doctor_id = %doctor_id, month = %month))]
    async fn find_active_plan(
        &self,
        doctor_id: DoctorId,
        month: MonthKey,
    ) -> Result<Option<CoveragePlan>, PortError> {
        debug!("Looking up the active plan for the slot");

        let sql = format!(
            "SELECT {} FROM coverage_plans \
             WHERE doctor_id = $1 AND month = $2 AND is_active",
            PLAN_COLUMNS
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(*doctor_id.as_uuid())
            .bind(month.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        row.map(|row| row_to_plan(row).map_err(PortError::from))
            .transpose()
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id, doctor_id = %plan.doctor_id, month = %plan.month))]
    async fn insert_plan(&self, plan: &CoveragePlan) -> Result<(), PortError> {
        debug!("Inserting coverage plan");

        sqlx::query(
            "INSERT INTO coverage_plans \
             (id, doctor_id, assigned_mr, month, planned_visits, actual_visits, \
              compliance_percentage, status, is_active, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(*plan.id.as_uuid())
        .bind(*plan.doctor_id.as_uuid())
        .bind(*plan.assigned_mr.as_uuid())
        .bind(plan.month.to_string())
        .bind(plan.planned_visits as i32)
        .bind(plan.actual_visits as i32)
        .bind(plan.compliance_percentage)
        .bind(plan.status.as_str())
        .bind(plan.is_active)
        .bind(*plan.created_by.as_uuid())
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    async fn update_plan(&self, plan: &CoveragePlan) -> Result<(), PortError> {
        debug!("Updating coverage plan");

        let result = sqlx::query(
            "UPDATE coverage_plans SET assigned_mr = $2, planned_visits = $3, \
             actual_visits = $4, compliance_percentage = $5, status = $6, is_active = $7, \
             updated_at = $8 WHERE id = $1",
        )
        .bind(*plan.id.as_uuid())
        .bind(*plan.assigned_mr.as_uuid())
        .bind(plan.planned_visits as i32)
        .bind(plan.actual_visits as i32)
        .bind(plan.compliance_percentage)
        .bind(plan.status.as_str())
        .bind(plan.is_active)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("CoveragePlan", plan.id));
        }
        Ok(())
    }
}

// =============================================================================
// Row Types and Conversions
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    doctor_id: Uuid,
    assigned_mr: Uuid,
    month: String,
    planned_visits: i32,
    actual_visits: i32,
    compliance_percentage: Decimal,
    status: String,
    is_active: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_plan(row: PlanRow) -> Result<CoveragePlan, DatabaseError> {
    let month: MonthKey = row.month.parse().map_err(|_| {
        DatabaseError::corrupt(
            "coverage_plans.month",
            format!("'{}' on plan {}", row.month, row.id),
        )
    })?;
    let status: ComplianceStatus = row.status.parse().map_err(|_| {
        DatabaseError::corrupt(
            "coverage_plans.status",
            format!("'{}' on plan {}", row.status, row.id),
        )
    })?;
    let planned_visits = u32::try_from(row.planned_visits).map_err(|_| {
        DatabaseError::corrupt(
            "coverage_plans.planned_visits",
            format!("{} on plan {}", row.planned_visits, row.id),
        )
    })?;
    let actual_visits = u32::try_from(row.actual_visits).map_err(|_| {
        DatabaseError::corrupt(
            "coverage_plans.actual_visits",
            format!("{} on plan {}", row.actual_visits, row.id),
        )
    })?;

    Ok(CoveragePlan {
        id: CoveragePlanId::from(row.id),
        doctor_id: DoctorId::from(row.doctor_id),
        assigned_mr: UserId::from(row.assigned_mr),
        month,
        planned_visits,
        actual_visits,
        compliance_percentage: row.compliance_percentage,
        status,
        is_active: row.is_active,
        created_by: UserId::from(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
