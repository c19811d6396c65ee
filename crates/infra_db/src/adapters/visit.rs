//! PostgreSQL Visit Ledger Adapter
//!
//! Implements `VisitLedgerPort` against the `visits` and `visit_order_lines`
//! tables. The adapter maintains the `visit_day` column as the calendar date
//! of `visit_date` in the reporting timezone; the per-day uniqueness index
//! and the day-conflict lookup are both defined against it, so the adapter
//! must be constructed with the same timezone the services use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    Currency, DayWindow, DoctorId, DomainPort, HealthCheckResult, HealthCheckable, Money,
    MonthWindow, OrderLineId, PortError, Timezone, UserId, VisitId,
};
use domain_visit::{GeoPoint, OrderLine, Visit, VisitLedgerPort, VisitOutcome, VisitQuery, VisitStatus};

use crate::error::DatabaseError;

const VISIT_COLUMNS: &str = "id, mr_id, doctor_id, visit_date, status, outcome, not_met_reason, \
     check_in, check_out, latitude, longitude, notes, created_by, created_at, updated_at";

/// PostgreSQL-backed implementation of the VisitLedgerPort trait
#[derive(Debug, Clone)]
pub struct PostgresVisitAdapter {
    pool: PgPool,
    timezone: Timezone,
}

impl PostgresVisitAdapter {
    /// Creates a new PostgreSQL visit adapter bound to the reporting timezone
    pub fn new(pool: PgPool, timezone: Timezone) -> Self {
        Self { pool, timezone }
    }

    async fn load_order_lines(
        &self,
        visit_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderLine>>, DatabaseError> {
        if visit_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT visit_id, id, product, quantity, amount, currency \
             FROM visit_order_lines WHERE visit_id = ANY($1) ORDER BY visit_id, position",
        )
        .bind(visit_ids)
        .fetch_all(&self.pool)
        .await?;

        group_order_lines(rows)
    }
}

impl DomainPort for PostgresVisitAdapter {}

#[async_trait]
impl HealthCheckable for PostgresVisitAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::check_pool(&self.pool, "postgres-visit-adapter").await
    }
}

#[async_trait]
impl VisitLedgerPort for PostgresVisitAdapter {
    #[instrument(skip(self), fields(visit_id = %id))]
    async fn get_visit(&self, id: VisitId) -> Result<Visit, PortError> {
        debug!("Fetching visit by ID");

        let sql = format!("SELECT {} FROM visits WHERE id = $1", VISIT_COLUMNS);
        let row = sqlx::query_as::<_, VisitRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found("Visit", id))?;

        let mut lines = self
            .load_order_lines(&[row.id])
            .await
            .map_err(PortError::from)?;
        let orders = lines.remove(&row.id).unwrap_or_default();

        Ok(row_to_visit(row, orders)?)
    }

    #[instrument(skip(self, query))]
    async fn find_visits(&self, query: VisitQuery) -> Result<Vec<Visit>, PortError> {
        debug!("Finding visits with query: {:?}", query);

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM visits WHERE TRUE", VISIT_COLUMNS));
        if let Some(ref mrs) = query.mr_ids {
            let ids: Vec<Uuid> = mrs.iter().map(|id| *id.as_uuid()).collect();
            builder.push(" AND mr_id = ANY(").push_bind(ids).push(")");
        }
        if let Some(doctor_id) = query.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(*doctor_id.as_uuid());
        }
        if let Some(ref statuses) = query.statuses {
            let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder.push(" AND status = ANY(").push_bind(names).push(")");
        }
        if let Some(from) = query.from {
            builder.push(" AND visit_date >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND visit_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY visit_date DESC, id DESC");
        super::push_page(&mut builder, query.limit, query.offset);

        let rows: Vec<VisitRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.load_order_lines(&ids).await.map_err(PortError::from)?;

        rows.into_iter()
            .map(|row| {
                let orders = lines.remove(&row.id).unwrap_or_default();
                row_to_visit(row, orders).map_err(PortError::from)
            })
            .collect()
    }

    #[instrument(skip(self, visit), fields(visit_id = %visit.id))]
    async fn insert_visit(&self, visit: &Visit) -> Result<(), PortError> {
        debug!("Inserting visit");

        let visit_day = self.timezone.local_date(visit.visit_date);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        sqlx::query(
            "INSERT INTO visits \
             (id, mr_id, doctor_id, visit_date, visit_day, status, outcome, not_met_reason, \
              check_in, check_out, latitude, longitude, notes, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(*visit.id.as_uuid())
        .bind(*visit.mr_id.as_uuid())
        .bind(*visit.doctor_id.as_uuid())
        .bind(visit.visit_date)
        .bind(visit_day)
        .bind(visit.status.as_str())
        .bind(visit.outcome.map(|o| o.as_str()))
        .bind(&visit.not_met_reason)
        .bind(visit.check_in)
        .bind(visit.check_out)
        .bind(visit.location.map(|p| p.latitude))
        .bind(visit.location.map(|p| p.longitude))
        .bind(&visit.notes)
        .bind(*visit.created_by.as_uuid())
        .bind(visit.created_at)
        .bind(visit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        insert_order_lines(&mut tx, visit).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, visit), fields(visit_id = %visit.id))]
    async fn update_visit(&self, visit: &Visit) -> Result<(), PortError> {
        debug!("Updating visit");

        // Rescheduling moves the instant, so the day column is recomputed
        let visit_day = self.timezone.local_date(visit.visit_date);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let result = sqlx::query(
            "UPDATE visits SET visit_date = $2, visit_day = $3, status = $4, outcome = $5, \
             not_met_reason = $6, check_in = $7, check_out = $8, latitude = $9, longitude = $10, \
             notes = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(*visit.id.as_uuid())
        .bind(visit.visit_date)
        .bind(visit_day)
        .bind(visit.status.as_str())
        .bind(visit.outcome.map(|o| o.as_str()))
        .bind(&visit.not_met_reason)
        .bind(visit.check_in)
        .bind(visit.check_out)
        .bind(visit.location.map(|p| p.latitude))
        .bind(visit.location.map(|p| p.longitude))
        .bind(&visit.notes)
        .bind(visit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Visit", visit.id));
        }

        sqlx::query("DELETE FROM visit_order_lines WHERE visit_id = $1")
            .bind(*visit.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        insert_order_lines(&mut tx, visit).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, window), fields(doctor_id = %doctor_id, mr_id = %mr_id, month = %window.key))]
    async fn count_met_in_window(
        &self,
        doctor_id: DoctorId,
        mr_id: UserId,
        window: &MonthWindow,
    ) -> Result<u64, PortError> {
        debug!("Counting met visits in month window");

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM visits \
             WHERE doctor_id = $1 AND mr_id = $2 \
               AND status <> 'CANCELLED' \
               AND (outcome IS NULL OR outcome = 'MET_DOCTOR') \
               AND visit_date >= $3 AND visit_date <= $4",
        )
        .bind(*doctor_id.as_uuid())
        .bind(*mr_id.as_uuid())
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(count as u64)
    }

    #[instrument(skip(self, day, exclude), fields(mr_id = %mr_id, doctor_id = %doctor_id, day = %day.date))]
    async fn find_day_conflict(
        &self,
        mr_id: UserId,
        doctor_id: DoctorId,
        day: &DayWindow,
        exclude: Option<VisitId>,
    ) -> Result<Option<Visit>, PortError> {
        debug!("Checking for a same-day visit");

        let sql = format!(
            "SELECT {} FROM visits \
             WHERE mr_id = $1 AND doctor_id = $2 AND visit_day = $3 \
               AND status <> 'CANCELLED' \
               AND ($4::uuid IS NULL OR id <> $4) \
             LIMIT 1",
            VISIT_COLUMNS
        );
        let row = sqlx::query_as::<_, VisitRow>(&sql)
            .bind(*mr_id.as_uuid())
            .bind(*doctor_id.as_uuid())
            .bind(day.date)
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut lines = self
            .load_order_lines(&[row.id])
            .await
            .map_err(PortError::from)?;
        let orders = lines.remove(&row.id).unwrap_or_default();

        Ok(Some(row_to_visit(row, orders)?))
    }
}

async fn insert_order_lines(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    visit: &Visit,
) -> Result<(), PortError> {
    for (position, line) in visit.orders.iter().enumerate() {
        let quantity = i32::try_from(line.quantity).map_err(|_| {
            PortError::validation(format!("Order quantity {} is out of range", line.quantity))
        })?;
        sqlx::query(
            "INSERT INTO visit_order_lines \
             (id, visit_id, position, product, quantity, amount, currency) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*line.id.as_uuid())
        .bind(*visit.id.as_uuid())
        .bind(position as i32)
        .bind(&line.product)
        .bind(quantity)
        .bind(line.amount.amount())
        .bind(line.amount.currency().code())
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
struct VisitRow {
    id: Uuid,
    mr_id: Uuid,
    doctor_id: Uuid,
    visit_date: DateTime<Utc>,
    status: String,
    outcome: Option<String>,
    not_met_reason: Option<String>,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    visit_id: Uuid,
    id: Uuid,
    product: String,
    quantity: i32,
    amount: Decimal,
    currency: String,
}

fn row_to_visit(row: VisitRow, orders: Vec<OrderLine>) -> Result<Visit, DatabaseError> {
    let status: VisitStatus = row.status.parse().map_err(|_| {
        DatabaseError::corrupt("visits.status", format!("'{}' on visit {}", row.status, row.id))
    })?;
    let outcome = row
        .outcome
        .as_deref()
        .map(|text| {
            text.parse::<VisitOutcome>().map_err(|_| {
                DatabaseError::corrupt("visits.outcome", format!("'{}' on visit {}", text, row.id))
            })
        })
        .transpose()?;
    // The schema forbids one coordinate without the other
    let location = match (row.latitude, row.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    };

    Ok(Visit {
        id: VisitId::from(row.id),
        mr_id: UserId::from(row.mr_id),
        doctor_id: DoctorId::from(row.doctor_id),
        visit_date: row.visit_date,
        status,
        outcome,
        not_met_reason: row.not_met_reason,
        check_in: row.check_in,
        check_out: row.check_out,
        location,
        notes: row.notes,
        orders,
        created_by: UserId::from(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn group_order_lines(
    rows: Vec<OrderLineRow>,
) -> Result<HashMap<Uuid, Vec<OrderLine>>, DatabaseError> {
    let mut grouped: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for row in rows {
        let currency: Currency = row.currency.parse().map_err(|_| {
            DatabaseError::corrupt(
                "visit_order_lines.currency",
                format!("'{}' on line {}", row.currency, row.id),
            )
        })?;
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            DatabaseError::corrupt(
                "visit_order_lines.quantity",
                format!("{} on line {}", row.quantity, row.id),
            )
        })?;
        grouped.entry(row.visit_id).or_default().push(OrderLine {
            id: OrderLineId::from(row.id),
            product: row.product,
            quantity,
            amount: Money::new(row.amount, currency),
        });
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_row() -> VisitRow {
        VisitRow {
            id: Uuid::new_v4(),
            mr_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            visit_date: Utc::now(),
            status: "COMPLETED".to_string(),
            outcome: Some("MET_DOCTOR".to_string()),
            not_met_reason: None,
            check_in: None,
            check_out: None,
            latitude: None,
            longitude: None,
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_and_outcome_text_map_back() {
        let visit = row_to_visit(sample_row(), Vec::new()).unwrap();
        assert_eq!(visit.status, VisitStatus::Completed);
        assert!(visit.counts_for_coverage());
    }

    #[test]
    fn test_unknown_outcome_text_is_a_corrupt_row() {
        let mut row = sample_row();
        row.outcome = Some("WAVED_FROM_CAR".to_string());
        let err = row_to_visit(row, Vec::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow(_)));
    }

    #[test]
    fn test_order_lines_group_by_visit_in_position_order() {
        let visit_a = Uuid::new_v4();
        let visit_b = Uuid::new_v4();
        let line = |visit_id, product: &str, amount| OrderLineRow {
            visit_id,
            id: Uuid::new_v4(),
            product: product.to_string(),
            quantity: 2,
            amount,
            currency: "INR".to_string(),
        };

        let grouped = group_order_lines(vec![
            line(visit_a, "Amoxicillin 500mg", dec!(1200)),
            line(visit_a, "Vitamin D3", dec!(450.50)),
            line(visit_b, "Cough syrup", dec!(90)),
        ])
        .unwrap();

        assert_eq!(grouped[&visit_a].len(), 2);
        assert_eq!(grouped[&visit_a][0].product, "Amoxicillin 500mg");
        assert_eq!(grouped[&visit_b][0].amount.amount(), dec!(90));
    }
}
