//! Coverage summary aggregation
//!
//! Groups plans by MR, doctor or month for the dashboard. The group-level
//! compliance is recomputed from the summed totals with the same boundary
//! rule the plans use; averaging the member percentages would let a few
//! small plans mask a large failing one, so the mean is reported separately
//! and never classified.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{DoctorId, MonthKey, UserId};

use crate::error::CoverageError;
use crate::plan::{ComplianceStatus, CoveragePlan, CoverageStats};

/// Grouping axis for summary rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Mr,
    Doctor,
    Month,
}

impl FromStr for GroupBy {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mr" => Ok(Self::Mr),
            "doctor" => Ok(Self::Doctor),
            "month" => Ok(Self::Month),
            other => Err(CoverageError::invalid(format!(
                "Unknown groupBy value: {} (expected mr, doctor or month)",
                other
            ))),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mr => f.write_str("mr"),
            Self::Doctor => f.write_str("doctor"),
            Self::Month => f.write_str("month"),
        }
    }
}

/// The key of one summary row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Mr(UserId),
    Doctor(DoctorId),
    Month(MonthKey),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mr(id) => write!(f, "{}", id),
            Self::Doctor(id) => write!(f, "{}", id),
            Self::Month(key) => write!(f, "{}", key),
        }
    }
}

/// One aggregated row of the coverage summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub plan_count: u32,
    pub total_planned: u32,
    pub total_actual: u32,
    /// Mean of the member plans' percentages, informational only
    pub average_compliance: Decimal,
    /// Recomputed from the summed totals; this is what gets classified
    pub compliance_percentage: Decimal,
    pub status: ComplianceStatus,
}

/// Aggregates plans into summary rows.
///
/// Rows keep the first-appearance order of their group in `plans`, so a
/// month-sorted input yields month-sorted rows.
pub fn summarize(plans: &[CoveragePlan], group_by: GroupBy) -> Vec<SummaryRow> {
    struct Acc {
        key: GroupKey,
        plan_count: u32,
        total_planned: u32,
        total_actual: u32,
        compliance_sum: Decimal,
    }

    let mut groups: Vec<Acc> = Vec::new();
    for plan in plans {
        let key = match group_by {
            GroupBy::Mr => GroupKey::Mr(plan.assigned_mr),
            GroupBy::Doctor => GroupKey::Doctor(plan.doctor_id),
            GroupBy::Month => GroupKey::Month(plan.month),
        };
        let idx = match groups.iter().position(|g| g.key == key) {
            Some(idx) => idx,
            None => {
                groups.push(Acc {
                    key,
                    plan_count: 0,
                    total_planned: 0,
                    total_actual: 0,
                    compliance_sum: Decimal::ZERO,
                });
                groups.len() - 1
            }
        };
        let acc = &mut groups[idx];
        acc.plan_count += 1;
        acc.total_planned += plan.planned_visits;
        acc.total_actual += plan.actual_visits;
        acc.compliance_sum += plan.compliance_percentage;
    }

    groups
        .into_iter()
        .map(|acc| {
            let stats = CoverageStats::derive(acc.total_planned, acc.total_actual);
            let average_compliance = (acc.compliance_sum / Decimal::from(acc.plan_count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            SummaryRow {
                key: acc.key,
                plan_count: acc.plan_count,
                total_planned: acc.total_planned,
                total_actual: acc.total_actual,
                average_compliance,
                compliance_percentage: stats.compliance_percentage,
                status: stats.status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan(
        doctor: DoctorId,
        mr: UserId,
        month: MonthKey,
        planned: u32,
        actual: u32,
    ) -> CoveragePlan {
        let mut plan = CoveragePlan::new(doctor, mr, month, planned, UserId::new_v7());
        plan.apply_stats(CoverageStats::derive(planned, actual));
        plan
    }

    #[test]
    fn test_groups_by_mr() {
        let june = MonthKey::new(2024, 6).unwrap();
        let mr_a = UserId::new_v7();
        let mr_b = UserId::new_v7();

        let rows = summarize(
            &[
                plan(DoctorId::new_v7(), mr_a, june, 10, 5),
                plan(DoctorId::new_v7(), mr_a, june, 10, 10),
                plan(DoctorId::new_v7(), mr_b, june, 10, 2),
            ],
            GroupBy::Mr,
        );

        assert_eq!(rows.len(), 2);
        let row_a = rows.iter().find(|r| r.key == GroupKey::Mr(mr_a)).unwrap();
        assert_eq!(row_a.plan_count, 2);
        assert_eq!(row_a.total_planned, 20);
        assert_eq!(row_a.total_actual, 15);
    }

    #[test]
    fn test_group_compliance_uses_totals_not_average() {
        let june = MonthKey::new(2024, 6).unwrap();
        let mr = UserId::new_v7();

        // 1/2 = 50% and 9/10 = 90%: the mean says 70 (AT_RISK) while the
        // totals say 10/12 = 83.33 (ON_TRACK)
        let rows = summarize(
            &[
                plan(DoctorId::new_v7(), mr, june, 2, 1),
                plan(DoctorId::new_v7(), mr, june, 10, 9),
            ],
            GroupBy::Mr,
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].average_compliance, dec!(70.00));
        assert_eq!(rows[0].compliance_percentage, dec!(83.33));
        assert_eq!(rows[0].status, ComplianceStatus::OnTrack);
    }

    #[test]
    fn test_group_totals_follow_boundary_rule() {
        let june = MonthKey::new(2024, 6).unwrap();
        let mr = UserId::new_v7();

        let rows = summarize(
            &[
                plan(DoctorId::new_v7(), mr, june, 5, 4),
                plan(DoctorId::new_v7(), mr, june, 5, 4),
            ],
            GroupBy::Mr,
        );

        // Totals 8/10 sit exactly on the 80 boundary
        assert_eq!(rows[0].compliance_percentage, dec!(80.00));
        assert_eq!(rows[0].status, ComplianceStatus::AtRisk);
    }

    #[test]
    fn test_groups_by_month_keep_input_order() {
        let mr = UserId::new_v7();
        let doctor = DoctorId::new_v7();
        let may = MonthKey::new(2024, 5).unwrap();
        let june = MonthKey::new(2024, 6).unwrap();

        let rows = summarize(
            &[
                plan(doctor, mr, may, 10, 8),
                plan(DoctorId::new_v7(), mr, june, 10, 8),
                plan(DoctorId::new_v7(), mr, may, 10, 2),
            ],
            GroupBy::Month,
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, GroupKey::Month(may));
        assert_eq!(rows[0].plan_count, 2);
        assert_eq!(rows[1].key, GroupKey::Month(june));
    }

    #[test]
    fn test_zero_planned_group_is_missed() {
        let june = MonthKey::new(2024, 6).unwrap();
        let rows = summarize(
            &[plan(DoctorId::new_v7(), UserId::new_v7(), june, 0, 3)],
            GroupBy::Doctor,
        );

        assert_eq!(rows[0].compliance_percentage, Decimal::ZERO);
        assert_eq!(rows[0].status, ComplianceStatus::Missed);
    }

    #[test]
    fn test_group_by_parses_case_insensitively() {
        assert_eq!("MR".parse::<GroupBy>().unwrap(), GroupBy::Mr);
        assert_eq!("doctor".parse::<GroupBy>().unwrap(), GroupBy::Doctor);
        assert!("week".parse::<GroupBy>().is_err());
    }
}
