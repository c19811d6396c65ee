//! Visit-to-Coverage Synchronizer
//!
//! Bridges the visit ledger and the plan store: when a counting visit lands,
//! the matching month's plan gets its derived fields refreshed. Runs inside
//! the recording request through the visit service's hook seam, which
//! contains any failure here; a missed refresh is healed by the next
//! recompute because plans never count incrementally.

use std::sync::Arc;

use async_trait::async_trait;

use core_kernel::{MonthKey, PortError};
use domain_visit::{Visit, VisitRecordedHook};

use crate::engine::ComplianceEngine;
use crate::ports::CoveragePlanStore;

/// Refreshes the affected coverage plan after a visit is recorded
pub struct CoverageSynchronizer {
    store: Arc<dyn CoveragePlanStore>,
    engine: Arc<ComplianceEngine>,
}

impl CoverageSynchronizer {
    pub fn new(store: Arc<dyn CoveragePlanStore>, engine: Arc<ComplianceEngine>) -> Self {
        Self { store, engine }
    }
}

#[async_trait]
impl VisitRecordedHook for CoverageSynchronizer {
    fn name(&self) -> &'static str {
        "coverage-sync"
    }

    async fn on_visit_recorded(&self, visit: &Visit) -> Result<(), PortError> {
        let month = MonthKey::from_datetime(visit.visit_date, self.engine.timezone());

        let Some(mut plan) = self.store.find_active_plan(visit.doctor_id, month).await? else {
            // The visit simply is not tracked against a target
            tracing::debug!(
                doctor_id = %visit.doctor_id,
                month = %month,
                "No active coverage plan for visit; skipping sync"
            );
            return Ok(());
        };
        if plan.assigned_mr != visit.mr_id {
            tracing::debug!(
                plan_id = %plan.id,
                visit_mr = %visit.mr_id,
                plan_mr = %plan.assigned_mr,
                "Visit MR does not match plan MR; skipping sync"
            );
            return Ok(());
        }

        let stats = self
            .engine
            .compute(plan.doctor_id, plan.assigned_mr, plan.month, plan.planned_visits)
            .await?;
        plan.apply_stats(stats);
        self.store.update_plan(&plan).await?;

        tracing::info!(
            plan_id = %plan.id,
            actual_visits = plan.actual_visits,
            compliance = %plan.compliance_percentage,
            status = %plan.status,
            "Coverage plan refreshed from ledger"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ComplianceStatus, CoveragePlan};
    use crate::ports::mock::MockCoveragePlanStore;
    use chrono::{TimeZone, Utc};
    use core_kernel::{DoctorId, Timezone, UserId};
    use domain_visit::{MockVisitLedger, VisitBuilder, VisitLedgerPort, VisitOutcome};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MockCoveragePlanStore>,
        ledger: Arc<MockVisitLedger>,
        sync: CoverageSynchronizer,
        mr: UserId,
        doctor: DoctorId,
    }

    async fn fixture_with_plan(planned_visits: u32) -> Fixture {
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let june = MonthKey::new(2024, 6).unwrap();

        let plan = CoveragePlan::new(doctor, mr, june, planned_visits, UserId::new_v7());
        let store = Arc::new(MockCoveragePlanStore::new().with_plans(vec![plan]).await);
        let ledger = Arc::new(MockVisitLedger::new());
        let engine = Arc::new(ComplianceEngine::new(
            ledger.clone() as Arc<dyn domain_visit::VisitLedgerPort>,
            Timezone::default(),
        ));
        let sync = CoverageSynchronizer::new(
            store.clone() as Arc<dyn CoveragePlanStore>,
            engine,
        );

        Fixture {
            store,
            ledger,
            sync,
            mr,
            doctor,
        }
    }

    async fn record_met_visit(fx: &Fixture, day: u32) -> domain_visit::Visit {
        let visit = VisitBuilder::new()
            .mr(fx.mr)
            .doctor(fx.doctor)
            .visit_date(Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap())
            .outcome(VisitOutcome::MetDoctor)
            .recorded_by(fx.mr)
            .build()
            .unwrap();
        fx.ledger.insert_visit(&visit).await.unwrap();
        visit
    }

    #[tokio::test]
    async fn test_sync_refreshes_matching_plan() {
        let fx = fixture_with_plan(10).await;
        let visit = record_met_visit(&fx, 5).await;

        fx.sync.on_visit_recorded(&visit).await.unwrap();

        let plan = fx
            .store
            .find_active_plan(fx.doctor, MonthKey::new(2024, 6).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.actual_visits, 1);
        assert_eq!(plan.compliance_percentage, dec!(10.00));
        assert_eq!(plan.status, ComplianceStatus::Missed);
    }

    #[tokio::test]
    async fn test_sync_without_plan_is_a_noop() {
        let fx = fixture_with_plan(10).await;
        let mut visit = record_met_visit(&fx, 5).await;
        // July has no plan
        visit.visit_date = Utc.with_ymd_and_hms(2024, 7, 5, 9, 0, 0).unwrap();

        assert!(fx.sync.on_visit_recorded(&visit).await.is_ok());
    }

    #[tokio::test]
    async fn test_sync_skips_other_mrs_visits() {
        let fx = fixture_with_plan(10).await;
        let other_mr = UserId::new_v7();
        let visit = VisitBuilder::new()
            .mr(other_mr)
            .doctor(fx.doctor)
            .visit_date(Utc.with_ymd_and_hms(2024, 6, 5, 9, 0, 0).unwrap())
            .outcome(VisitOutcome::MetDoctor)
            .recorded_by(other_mr)
            .build()
            .unwrap();
        fx.ledger.insert_visit(&visit).await.unwrap();

        fx.sync.on_visit_recorded(&visit).await.unwrap();

        let plan = fx
            .store
            .find_active_plan(fx.doctor, MonthKey::new(2024, 6).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.actual_visits, 0);
    }

    #[tokio::test]
    async fn test_sync_recomputes_rather_than_increments() {
        let fx = fixture_with_plan(10).await;
        for day in 1..=5 {
            record_met_visit(&fx, day).await;
        }
        let last = record_met_visit(&fx, 6).await;

        // One sync after six inserts still lands on the full count
        fx.sync.on_visit_recorded(&last).await.unwrap();

        let plan = fx
            .store
            .find_active_plan(fx.doctor, MonthKey::new(2024, 6).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.actual_visits, 6);
        assert_eq!(plan.compliance_percentage, dec!(60.00));
    }

    #[tokio::test]
    async fn test_sync_propagates_store_failure_to_the_seam() {
        let fx = fixture_with_plan(10).await;
        let visit = record_met_visit(&fx, 5).await;

        fx.store.fail_writes(true);
        // The hook reports the failure; the visit service contains it
        assert!(fx.sync.on_visit_recorded(&visit).await.is_err());
    }
}
