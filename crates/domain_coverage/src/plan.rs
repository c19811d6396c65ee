//! Coverage Plan Aggregate
//!
//! One plan per (doctor, month): a planned-visit target plus three derived
//! fields recomputed from the visit ledger. The derived fields are cache-like
//! and never hand-set; every recompute overwrites them wholesale.
//!
//! # Invariants
//!
//! - Exactly one active plan per (doctor, month); deactivated plans keep
//!   history and never block a replacement
//! - `actual_visits`, `compliance_percentage` and `status` are a pure
//!   function of `planned_visits` and the ledger
//! - Classification boundaries are asymmetric: strictly above 80 is
//!   ON_TRACK, 50 through 80 inclusive is AT_RISK, below 50 is MISSED
//! - A zero target derives 0% and MISSED regardless of actual visits

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoveragePlanId, DoctorId, MonthKey, UserId};

use crate::error::CoverageError;

/// Compliance classification for a plan or an aggregate row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    OnTrack,
    AtRisk,
    Missed,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "ON_TRACK",
            Self::AtRisk => "AT_RISK",
            Self::Missed => "MISSED",
        }
    }

    /// Classifies a compliance percentage.
    ///
    /// The 80 boundary is exclusive and the 50 boundary inclusive, so a plan
    /// sitting exactly at 80.00 is still AT_RISK while exactly 50.00 already
    /// is. This asymmetry is a product rule, not an accident.
    pub fn classify(compliance: Decimal) -> Self {
        if compliance > dec!(80) {
            Self::OnTrack
        } else if compliance >= dec!(50) {
            Self::AtRisk
        } else {
            Self::Missed
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON_TRACK" => Ok(Self::OnTrack),
            "AT_RISK" => Ok(Self::AtRisk),
            "MISSED" => Ok(Self::Missed),
            other => Err(CoverageError::invalid(format!(
                "Unknown compliance status: {}",
                other
            ))),
        }
    }
}

/// The derived triple for one plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub actual_visits: u32,
    pub compliance_percentage: Decimal,
    pub status: ComplianceStatus,
}

impl CoverageStats {
    /// Derives compliance from a target and a ledger count.
    ///
    /// ```text
    /// compliance = planned > 0 ? round2(actual / planned * 100) : 0
    /// status     = compliance > 80 ? ON_TRACK : compliance >= 50 ? AT_RISK : MISSED
    /// ```
    ///
    /// Rounding is half-up to two decimals. The percentage is not capped, so
    /// overshooting the target reads as more than 100.
    pub fn derive(planned_visits: u32, actual_visits: u32) -> Self {
        let compliance_percentage = if planned_visits > 0 {
            (Decimal::from(actual_visits) * dec!(100) / Decimal::from(planned_visits))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };
        Self {
            actual_visits,
            compliance_percentage,
            status: ComplianceStatus::classify(compliance_percentage),
        }
    }
}

/// The coverage plan entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveragePlan {
    pub id: CoveragePlanId,
    pub doctor_id: DoctorId,
    /// The MR the target belongs to; visits by other MRs never count here
    pub assigned_mr: UserId,
    pub month: MonthKey,
    pub planned_visits: u32,
    pub actual_visits: u32,
    pub compliance_percentage: Decimal,
    pub status: ComplianceStatus,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CoveragePlan {
    /// Creates a plan with derived fields at their empty-ledger values
    pub fn new(
        doctor_id: DoctorId,
        assigned_mr: UserId,
        month: MonthKey,
        planned_visits: u32,
        created_by: UserId,
    ) -> Self {
        let stats = CoverageStats::derive(planned_visits, 0);
        let now = Utc::now();
        Self {
            id: CoveragePlanId::new_v7(),
            doctor_id,
            assigned_mr,
            month,
            planned_visits,
            actual_visits: stats.actual_visits,
            compliance_percentage: stats.compliance_percentage,
            status: stats.status,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the derived triple with a fresh computation
    pub fn apply_stats(&mut self, stats: CoverageStats) {
        self.actual_visits = stats.actual_visits;
        self.compliance_percentage = stats.compliance_percentage;
        self.status = stats.status;
        self.updated_at = Utc::now();
    }

    /// Soft-deletes the plan; history is never hard-deleted
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}
