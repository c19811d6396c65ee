//! Compliance Engine
//!
//! The one place actual-visit counts come from. Expands a month key into the
//! reporting-timezone calendar window, counts the ledger entries that satisfy
//! the counting rule, and derives the compliance triple. Always recomputes
//! from scratch; nothing in the workspace increments a visit counter, which
//! is what keeps edits, cancellations and backfilled dates from drifting the
//! derived fields.

use std::sync::Arc;

use core_kernel::{DoctorId, MonthKey, PortError, Timezone, UserId};
use domain_visit::VisitLedgerPort;

use crate::plan::CoverageStats;

/// Recomputes coverage stats from the visit ledger
pub struct ComplianceEngine {
    ledger: Arc<dyn VisitLedgerPort>,
    timezone: Timezone,
}

impl ComplianceEngine {
    pub fn new(ledger: Arc<dyn VisitLedgerPort>, timezone: Timezone) -> Self {
        Self { ledger, timezone }
    }

    pub fn timezone(&self) -> &Timezone {
        &self.timezone
    }

    /// Computes the derived triple for (doctor, MR, month).
    ///
    /// Idempotent and side-effect-free: identical ledger state yields an
    /// identical result, so callers recompute freely instead of caching.
    pub async fn compute(
        &self,
        doctor_id: DoctorId,
        mr_id: UserId,
        month: MonthKey,
        planned_visits: u32,
    ) -> Result<CoverageStats, PortError> {
        let window = month.window(&self.timezone);
        let actual = self
            .ledger
            .count_met_in_window(doctor_id, mr_id, &window)
            .await?;
        Ok(CoverageStats::derive(planned_visits, actual as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ComplianceStatus;
    use chrono::{TimeZone, Utc};
    use domain_visit::{MockVisitLedger, Visit, VisitBuilder, VisitOutcome};
    use rust_decimal_macros::dec;

    fn met_visit(mr: UserId, doctor: DoctorId, day: u32) -> Visit {
        VisitBuilder::new()
            .mr(mr)
            .doctor(doctor)
            .visit_date(Utc.with_ymd_and_hms(2024, 6, day, 10, 0, 0).unwrap())
            .outcome(VisitOutcome::MetDoctor)
            .recorded_by(mr)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_compute_counts_only_matching_visits() {
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let june = MonthKey::new(2024, 6).unwrap();

        let mut cancelled = met_visit(mr, doctor, 3);
        cancelled.cancel().unwrap();
        let mut not_met = met_visit(mr, doctor, 4);
        not_met.outcome = Some(VisitOutcome::DoctorNotAvailable);
        not_met.not_met_reason = Some("On rounds".to_string());

        let ledger = MockVisitLedger::new()
            .with_visits(vec![
                met_visit(mr, doctor, 1),
                met_visit(mr, doctor, 2),
                cancelled,
                not_met,
                met_visit(UserId::new_v7(), doctor, 5),
            ])
            .await;

        let engine = ComplianceEngine::new(Arc::new(ledger), Timezone::default());
        let stats = engine.compute(doctor, mr, june, 4).await.unwrap();

        assert_eq!(stats.actual_visits, 2);
        assert_eq!(stats.compliance_percentage, dec!(50.00));
        assert_eq!(stats.status, ComplianceStatus::AtRisk);
    }

    #[tokio::test]
    async fn test_compute_is_idempotent() {
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let june = MonthKey::new(2024, 6).unwrap();

        let ledger = MockVisitLedger::new()
            .with_visits((1..=7).map(|d| met_visit(mr, doctor, d)).collect())
            .await;
        let engine = ComplianceEngine::new(Arc::new(ledger), Timezone::default());

        let first = engine.compute(doctor, mr, june, 10).await.unwrap();
        let second = engine.compute(doctor, mr, june, 10).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.actual_visits, 7);
    }

    #[tokio::test]
    async fn test_compute_respects_month_window() {
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();

        let in_may = VisitBuilder::new()
            .mr(mr)
            .doctor(doctor)
            .visit_date(Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap())
            .outcome(VisitOutcome::MetDoctor)
            .recorded_by(mr)
            .build()
            .unwrap();
        let ledger = MockVisitLedger::new()
            .with_visits(vec![in_may, met_visit(mr, doctor, 1)])
            .await;

        let engine = ComplianceEngine::new(Arc::new(ledger), Timezone::default());
        let june = engine
            .compute(doctor, mr, MonthKey::new(2024, 6).unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(june.actual_visits, 1);

        let may = engine
            .compute(doctor, mr, MonthKey::new(2024, 5).unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(may.actual_visits, 1);
    }
}
