//! PostgreSQL Beat Plan Adapter
//!
//! Implements `BeatPlanStore` against the `beat_plans` and
//! `beat_plan_entries` tables. Entries keep their itinerary order through
//! the `position` column. The one-plan-per-(MR, day) invariant is enforced
//! by a unique constraint; a racing insert comes back as a Conflict.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    BeatPlanId, DoctorId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId,
};
use domain_beat::{BeatEntry, BeatEntryStatus, BeatPlan, BeatPlanQuery, BeatPlanStore};

use crate::error::DatabaseError;

const PLAN_COLUMNS: &str = "id, mr_id, plan_date, created_by, created_at, updated_at";

/// PostgreSQL-backed implementation of the BeatPlanStore trait
#[derive(Debug, Clone)]
pub struct PostgresBeatAdapter {
    pool: PgPool,
}

impl PostgresBeatAdapter {
    /// Creates a new PostgreSQL beat adapter
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_entries(
        &self,
        plan_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<BeatEntry>>, DatabaseError> {
        if plan_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT plan_id, doctor_id, status FROM beat_plan_entries \
             WHERE plan_id = ANY($1) ORDER BY plan_id, position",
        )
        .bind(plan_ids)
        .fetch_all(&self.pool)
        .await?;

        group_entries(rows)
    }
}

impl DomainPort for PostgresBeatAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBeatAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::check_pool(&self.pool, "postgres-beat-adapter").await
    }
}

#[async_trait]
impl BeatPlanStore for PostgresBeatAdapter {
    #[instrument(skip(self), fields(plan_id = %id))]
    async fn get_plan(&self, id: BeatPlanId) -> Result<BeatPlan, PortError> {
        debug!("Fetching beat plan by ID");

        let sql = format!("SELECT {} FROM beat_plans WHERE id = $1", PLAN_COLUMNS);
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found("BeatPlan", id))?;

        let mut entries = self.load_entries(&[row.id]).await.map_err(PortError::from)?;
        let plan_entries = entries.remove(&row.id).unwrap_or_default();

        Ok(row_to_plan(row, plan_entries))
    }

    #[instrument(skip(self, query))]
    async fn find_plans(&self, query: BeatPlanQuery) -> Result<Vec<BeatPlan>, PortError> {
        debug!("Finding beat plans with query: {:?}", query);

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM beat_plans WHERE TRUE", PLAN_COLUMNS));
        if let Some(ref mrs) = query.mr_ids {
            let ids: Vec<Uuid> = mrs.iter().map(|id| *id.as_uuid()).collect();
            builder.push(" AND mr_id = ANY(").push_bind(ids).push(")");
        }
        if let Some(date) = query.date {
            builder.push(" AND plan_date = ").push_bind(date);
        }
        builder.push(" ORDER BY plan_date DESC, created_at DESC, id");
        super::push_page(&mut builder, query.limit, query.offset);

        let rows: Vec<PlanRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut entries = self.load_entries(&ids).await.map_err(PortError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let plan_entries = entries.remove(&row.id).unwrap_or_default();
                row_to_plan(row, plan_entries)
            })
            .collect())
    }

    #[instrument(skip(self), fields(mr_id = %mr_id, date = %date))]
    async fn find_by_mr_and_date(
        &self,
        mr_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<BeatPlan>, PortError> {
        debug!("Looking up the beat plan for the day");

        let sql = format!(
            "SELECT {} FROM beat_plans WHERE mr_id = $1 AND plan_date = $2",
            PLAN_COLUMNS
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(*mr_id.as_uuid())
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut entries = self.load_entries(&[row.id]).await.map_err(PortError::from)?;
        let plan_entries = entries.remove(&row.id).unwrap_or_default();

        Ok(Some(row_to_plan(row, plan_entries)))
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id, mr_id = %plan.mr_id, date = %plan.plan_date))]
    async fn insert_plan(&self, plan: &BeatPlan) -> Result<(), PortError> {
        debug!("Inserting beat plan");

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        sqlx::query(
            "INSERT INTO beat_plans (id, mr_id, plan_date, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(*plan.id.as_uuid())
        .bind(*plan.mr_id.as_uuid())
        .bind(plan.plan_date)
        .bind(*plan.created_by.as_uuid())
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        insert_entries(&mut tx, plan).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    async fn update_plan(&self, plan: &BeatPlan) -> Result<(), PortError> {
        debug!("Updating beat plan");

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let result = sqlx::query("UPDATE beat_plans SET updated_at = $2 WHERE id = $1")
            .bind(*plan.id.as_uuid())
            .bind(plan.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("BeatPlan", plan.id));
        }

        sqlx::query("DELETE FROM beat_plan_entries WHERE plan_id = $1")
            .bind(*plan.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        insert_entries(&mut tx, plan).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}

async fn insert_entries(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    plan: &BeatPlan,
) -> Result<(), PortError> {
    for (position, entry) in plan.entries.iter().enumerate() {
        sqlx::query(
            "INSERT INTO beat_plan_entries (plan_id, doctor_id, position, status) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(*plan.id.as_uuid())
        .bind(*entry.doctor_id.as_uuid())
        .bind(position as i32)
        .bind(entry.status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;
    }
    Ok(())
}

// =============================================================================
// Row Types and Conversions
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    mr_id: Uuid,
    plan_date: NaiveDate,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    plan_id: Uuid,
    doctor_id: Uuid,
    status: String,
}

fn row_to_plan(row: PlanRow, entries: Vec<BeatEntry>) -> BeatPlan {
    BeatPlan {
        id: BeatPlanId::from(row.id),
        mr_id: UserId::from(row.mr_id),
        plan_date: row.plan_date,
        entries,
        created_by: UserId::from(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn group_entries(rows: Vec<EntryRow>) -> Result<HashMap<Uuid, Vec<BeatEntry>>, DatabaseError> {
    let mut grouped: HashMap<Uuid, Vec<BeatEntry>> = HashMap::new();
    for row in rows {
        let status: BeatEntryStatus = row.status.parse().map_err(|_| {
            DatabaseError::corrupt(
                "beat_plan_entries.status",
                format!("'{}' on plan {}", row.status, row.plan_id),
            )
        })?;
        grouped.entry(row.plan_id).or_default().push(BeatEntry {
            doctor_id: DoctorId::from(row.doctor_id),
            status,
        });
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_group_by_plan_with_status() {
        let plan_a = Uuid::new_v4();
        let plan_b = Uuid::new_v4();
        let rows = vec![
            EntryRow {
                plan_id: plan_a,
                doctor_id: Uuid::new_v4(),
                status: "VISITED".to_string(),
            },
            EntryRow {
                plan_id: plan_a,
                doctor_id: Uuid::new_v4(),
                status: "PLANNED".to_string(),
            },
            EntryRow {
                plan_id: plan_b,
                doctor_id: Uuid::new_v4(),
                status: "SKIPPED".to_string(),
            },
        ];

        let grouped = group_entries(rows).unwrap();
        assert_eq!(grouped[&plan_a].len(), 2);
        assert_eq!(grouped[&plan_a][0].status, BeatEntryStatus::Visited);
        assert_eq!(grouped[&plan_b][0].status, BeatEntryStatus::Skipped);
    }

    #[test]
    fn test_unknown_entry_status_is_a_corrupt_row() {
        let rows = vec![EntryRow {
            plan_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            status: "LOST".to_string(),
        }];
        assert!(matches!(
            group_entries(rows).unwrap_err(),
            DatabaseError::CorruptRow(_)
        ));
    }
}
