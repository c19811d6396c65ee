//! Visit Ledger Ports
//!
//! Port interface for the visit ledger, the authoritative record coverage is
//! recomputed from. Adapters: PostgreSQL (infra_db) and the in-memory mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{
    DayWindow, DoctorId, DomainPort, HealthCheckResult, HealthCheckable, MonthWindow, PortError,
    UserId, VisitId,
};

use crate::visit::{Visit, VisitStatus};

/// Query parameters for finding visits
#[derive(Debug, Clone, Default)]
pub struct VisitQuery {
    /// Restrict to visits by any of these MRs
    pub mr_ids: Option<Vec<UserId>>,
    /// Filter by doctor
    pub doctor_id: Option<DoctorId>,
    /// Filter by status
    pub statuses: Option<Vec<VisitStatus>>,
    /// Visits at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Visits at or before this instant
    pub to: Option<DateTime<Utc>>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl VisitQuery {
    /// Creates a query restricted to a set of MRs
    pub fn for_mrs(mr_ids: Vec<UserId>) -> Self {
        Self {
            mr_ids: Some(mr_ids),
            ..Default::default()
        }
    }

    /// Restricts the query to one doctor
    pub fn for_doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }

    /// Restricts the query to a closed instant range
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// The main port trait for visit ledger operations
///
/// The two window-shaped reads exist because coverage and the duplicate guard
/// both key on the reporting-timezone calendar, not on UTC dates.
#[async_trait]
pub trait VisitLedgerPort: DomainPort + HealthCheckable {
    /// Retrieves a visit by ID, or `PortError::NotFound`
    async fn get_visit(&self, id: VisitId) -> Result<Visit, PortError>;

    /// Finds visits matching the query criteria, most recent first
    async fn find_visits(&self, query: VisitQuery) -> Result<Vec<Visit>, PortError>;

    /// Inserts a new visit
    async fn insert_visit(&self, visit: &Visit) -> Result<(), PortError>;

    /// Persists changes to an existing visit
    async fn update_visit(&self, visit: &Visit) -> Result<(), PortError>;

    /// Counts the visits in the window that count toward coverage for
    /// (doctor, MR): non-cancelled with outcome MetDoctor or none
    async fn count_met_in_window(
        &self,
        doctor_id: DoctorId,
        mr_id: UserId,
        window: &MonthWindow,
    ) -> Result<u64, PortError>;

    /// Finds a non-cancelled visit for (MR, doctor) inside the day window,
    /// skipping `exclude` so updates don't collide with themselves
    async fn find_day_conflict(
        &self,
        mr_id: UserId,
        doctor_id: DoctorId,
        day: &DayWindow,
        exclude: Option<VisitId>,
    ) -> Result<Option<Visit>, PortError>;
}

/// Mock implementation of VisitLedgerPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of VisitLedgerPort
    #[derive(Debug, Default)]
    pub struct MockVisitLedger {
        visits: Arc<RwLock<HashMap<VisitId, Visit>>>,
    }

    impl MockVisitLedger {
        /// Creates a new mock ledger
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with visits for testing
        pub async fn with_visits(self, visits: Vec<Visit>) -> Self {
            {
                let mut map = self.visits.write().await;
                for visit in visits {
                    map.insert(visit.id, visit);
                }
            }
            self
        }
    }

    impl DomainPort for MockVisitLedger {}

    #[async_trait]
    impl HealthCheckable for MockVisitLedger {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-visit-ledger".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: chrono::Utc::now(),
            }
        }
    }

    #[async_trait]
    impl VisitLedgerPort for MockVisitLedger {
        async fn get_visit(&self, id: VisitId) -> Result<Visit, PortError> {
            self.visits
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Visit", id))
        }

        async fn find_visits(&self, query: VisitQuery) -> Result<Vec<Visit>, PortError> {
            let visits = self.visits.read().await;
            let mut results: Vec<_> = visits
                .values()
                .filter(|v| {
                    if let Some(ref mrs) = query.mr_ids {
                        if !mrs.contains(&v.mr_id) {
                            return false;
                        }
                    }
                    if let Some(doctor_id) = query.doctor_id {
                        if v.doctor_id != doctor_id {
                            return false;
                        }
                    }
                    if let Some(ref statuses) = query.statuses {
                        if !statuses.contains(&v.status) {
                            return false;
                        }
                    }
                    if let Some(from) = query.from {
                        if v.visit_date < from {
                            return false;
                        }
                    }
                    if let Some(to) = query.to {
                        if v.visit_date > to {
                            return false;
                        }
                    }
                    true
                })
                .cloned()
                .collect();
            results.sort_by_key(|v| std::cmp::Reverse(v.visit_date));

            if let Some(offset) = query.offset {
                results = results.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = query.limit {
                results.truncate(limit as usize);
            }
            Ok(results)
        }

        async fn insert_visit(&self, visit: &Visit) -> Result<(), PortError> {
            let mut visits = self.visits.write().await;
            if visits.contains_key(&visit.id) {
                return Err(PortError::conflict(format!(
                    "Visit {} already exists",
                    visit.id
                )));
            }
            visits.insert(visit.id, visit.clone());
            Ok(())
        }

        async fn update_visit(&self, visit: &Visit) -> Result<(), PortError> {
            let mut visits = self.visits.write().await;
            if !visits.contains_key(&visit.id) {
                return Err(PortError::not_found("Visit", visit.id));
            }
            visits.insert(visit.id, visit.clone());
            Ok(())
        }

        async fn count_met_in_window(
            &self,
            doctor_id: DoctorId,
            mr_id: UserId,
            window: &MonthWindow,
        ) -> Result<u64, PortError> {
            let visits = self.visits.read().await;
            let count = visits
                .values()
                .filter(|v| {
                    v.doctor_id == doctor_id
                        && v.mr_id == mr_id
                        && v.counts_for_coverage()
                        && window.contains(v.visit_date)
                })
                .count();
            Ok(count as u64)
        }

        async fn find_day_conflict(
            &self,
            mr_id: UserId,
            doctor_id: DoctorId,
            day: &DayWindow,
            exclude: Option<VisitId>,
        ) -> Result<Option<Visit>, PortError> {
            let visits = self.visits.read().await;
            Ok(visits
                .values()
                .find(|v| {
                    v.mr_id == mr_id
                        && v.doctor_id == doctor_id
                        && v.occupies_day()
                        && day.contains(v.visit_date)
                        && Some(v.id) != exclude
                })
                .cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockVisitLedger;
    use super::*;
    use crate::visit::{VisitBuilder, VisitOutcome};
    use core_kernel::{MonthKey, Timezone};

    fn visit_at(
        mr_id: UserId,
        doctor_id: DoctorId,
        when: DateTime<Utc>,
        outcome: Option<VisitOutcome>,
    ) -> Visit {
        let mut builder = VisitBuilder::new()
            .mr(mr_id)
            .doctor(doctor_id)
            .visit_date(when)
            .recorded_by(mr_id);
        if let Some(outcome) = outcome {
            builder = builder.outcome(outcome);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let ledger = MockVisitLedger::new();
        let visit = visit_at(UserId::new_v7(), DoctorId::new_v7(), Utc::now(), None);

        ledger.insert_visit(&visit).await.unwrap();
        let retrieved = ledger.get_visit(visit.id).await.unwrap();
        assert_eq!(retrieved.id, visit.id);
    }

    #[tokio::test]
    async fn test_count_met_in_window_applies_counting_rule() {
        use chrono::TimeZone;

        let tz = Timezone::default();
        let window = MonthKey::new(2024, 6).unwrap().window(&tz);
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let in_june = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();

        let met = visit_at(mr, doctor, in_june, Some(VisitOutcome::MetDoctor));
        let no_outcome = visit_at(mr, doctor, in_june + chrono::Duration::days(1), None);
        let mut not_available = visit_at(
            mr,
            doctor,
            in_june + chrono::Duration::days(2),
            Some(VisitOutcome::DoctorNotAvailable),
        );
        not_available.not_met_reason = Some("On leave".to_string());
        let mut cancelled = visit_at(
            mr,
            doctor,
            in_june + chrono::Duration::days(3),
            Some(VisitOutcome::MetDoctor),
        );
        cancelled.cancel().unwrap();
        let july = visit_at(
            mr,
            doctor,
            Utc.with_ymd_and_hms(2024, 7, 2, 9, 0, 0).unwrap(),
            Some(VisitOutcome::MetDoctor),
        );
        let other_mr = visit_at(
            UserId::new_v7(),
            doctor,
            in_june,
            Some(VisitOutcome::MetDoctor),
        );

        let ledger = MockVisitLedger::new()
            .with_visits(vec![met, no_outcome, not_available, cancelled, july, other_mr])
            .await;

        let count = ledger.count_met_in_window(doctor, mr, &window).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_day_conflict_skips_cancelled_and_excluded() {
        let tz = Timezone::default();
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let when = Utc::now();
        let day = tz.day_window(tz.local_date(when));

        let visit = visit_at(mr, doctor, when, None);
        let ledger = MockVisitLedger::new().with_visits(vec![visit.clone()]).await;

        let conflict = ledger
            .find_day_conflict(mr, doctor, &day, None)
            .await
            .unwrap();
        assert_eq!(conflict.map(|v| v.id), Some(visit.id));

        // The visit itself is not its own conflict
        let excluded = ledger
            .find_day_conflict(mr, doctor, &day, Some(visit.id))
            .await
            .unwrap();
        assert!(excluded.is_none());

        let mut cancelled = visit.clone();
        cancelled.cancel().unwrap();
        ledger.update_visit(&cancelled).await.unwrap();
        let after_cancel = ledger
            .find_day_conflict(mr, doctor, &day, None)
            .await
            .unwrap();
        assert!(after_cancel.is_none());
    }

    #[tokio::test]
    async fn test_find_visits_most_recent_first() {
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let now = Utc::now();

        let older = visit_at(mr, doctor, now - chrono::Duration::days(2), None);
        let newer = visit_at(mr, doctor, now, None);
        let ledger = MockVisitLedger::new()
            .with_visits(vec![older.clone(), newer.clone()])
            .await;

        let found = ledger.find_visits(VisitQuery::for_mrs(vec![mr])).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, newer.id);
        assert_eq!(found[1].id, older.id);
    }
}
