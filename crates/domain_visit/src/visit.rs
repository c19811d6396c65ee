//! Visit Aggregate Root
//!
//! A visit is one MR-doctor interaction attempt on a calendar day. It is the
//! source of truth for coverage: plans never count visits themselves, they are
//! recomputed from this ledger.
//!
//! # Invariants
//!
//! - At most one non-cancelled visit per (MR, doctor, reporting calendar day)
//! - A not-met outcome always carries a reason
//! - Check-in precedes check-out when both are present
//! - Only non-cancelled visits with outcome MetDoctor (or no outcome at all)
//!   count toward coverage

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{DoctorId, Money, OrderLineId, UserId, VisitId};

use crate::error::VisitError;

/// Visit lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    /// The visit took place (whether or not the doctor was met)
    Completed,
    /// The visit was voided; it never counts toward coverage
    Cancelled,
    /// The visit was moved to another day
    Rescheduled,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Rescheduled => "RESCHEDULED",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = VisitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "RESCHEDULED" => Ok(Self::Rescheduled),
            other => Err(VisitError::invalid(format!(
                "Unknown visit status: {}",
                other
            ))),
        }
    }
}

/// What happened when the MR arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitOutcome {
    /// The doctor was seen; the visit counts toward coverage
    MetDoctor,
    DoctorNotAvailable,
    ClinicClosed,
    DoctorBusy,
    Other,
}

impl VisitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetDoctor => "MET_DOCTOR",
            Self::DoctorNotAvailable => "DOCTOR_NOT_AVAILABLE",
            Self::ClinicClosed => "CLINIC_CLOSED",
            Self::DoctorBusy => "DOCTOR_BUSY",
            Self::Other => "OTHER",
        }
    }

    /// Whether this outcome counts as actually meeting the doctor
    pub fn is_met(&self) -> bool {
        matches!(self, Self::MetDoctor)
    }
}

impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitOutcome {
    type Err = VisitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MET_DOCTOR" => Ok(Self::MetDoctor),
            "DOCTOR_NOT_AVAILABLE" => Ok(Self::DoctorNotAvailable),
            "CLINIC_CLOSED" => Ok(Self::ClinicClosed),
            "DOCTOR_BUSY" => Ok(Self::DoctorBusy),
            "OTHER" => Ok(Self::Other),
            other => Err(VisitError::invalid(format!(
                "Unknown visit outcome: {}",
                other
            ))),
        }
    }
}

/// GPS coordinates captured at check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GeoPoint {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A product line attributed to a visit for sales reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub product: String,
    pub quantity: u32,
    pub amount: Money,
}

impl OrderLine {
    pub fn new(product: impl Into<String>, quantity: u32, amount: Money) -> Self {
        Self {
            id: OrderLineId::new_v7(),
            product: product.into(),
            quantity,
            amount,
        }
    }
}

/// The Visit aggregate root
///
/// `visit_date` is a UTC instant; its calendar-day identity (used by the
/// duplicate guard and by month attribution) is derived in the configured
/// reporting timezone, never from the UTC date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub mr_id: UserId,
    pub doctor_id: DoctorId,
    /// When the interaction happened (or was attempted)
    pub visit_date: DateTime<Utc>,
    pub status: VisitStatus,
    pub outcome: Option<VisitOutcome>,
    /// Required whenever `outcome` is present and not `MetDoctor`
    pub not_met_reason: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
    pub orders: Vec<OrderLine>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visit {
    /// Whether this visit counts toward coverage compliance.
    ///
    /// Cancelled visits never count. A recorded outcome must be `MetDoctor`;
    /// a visit with no outcome at all is treated as met.
    pub fn counts_for_coverage(&self) -> bool {
        self.status != VisitStatus::Cancelled && self.outcome.map_or(true, |o| o.is_met())
    }

    /// Whether the duplicate guard considers this visit occupying its day
    pub fn occupies_day(&self) -> bool {
        self.status != VisitStatus::Cancelled
    }

    /// Total order value across all lines, if any lines exist
    pub fn order_value(&self) -> Option<Money> {
        let mut lines = self.orders.iter();
        let first = lines.next()?.amount;
        Some(lines.fold(first, |total, line| total + line.amount))
    }

    /// Cancels the visit
    ///
    /// # Errors
    ///
    /// Returns an error if the visit is already cancelled.
    pub fn cancel(&mut self) -> Result<(), VisitError> {
        if self.status == VisitStatus::Cancelled {
            return Err(VisitError::invalid("Visit is already cancelled"));
        }
        self.status = VisitStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the visit to a new instant and marks it rescheduled
    ///
    /// # Errors
    ///
    /// Returns an error if the visit is cancelled. The caller re-runs the
    /// duplicate guard against the new day before persisting.
    pub fn reschedule(&mut self, new_date: DateTime<Utc>) -> Result<(), VisitError> {
        if self.status == VisitStatus::Cancelled {
            return Err(VisitError::invalid("Cancelled visits cannot be rescheduled"));
        }
        self.visit_date = new_date;
        self.status = VisitStatus::Rescheduled;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Builder for recording new visits
///
/// # Example
///
/// ```rust,ignore
/// let visit = VisitBuilder::new()
///     .doctor(doctor_id)
///     .mr(mr_id)
///     .visit_date(when)
///     .outcome(VisitOutcome::MetDoctor)
///     .recorded_by(actor_id)
///     .build()?;
/// ```
pub struct VisitBuilder {
    mr_id: Option<UserId>,
    doctor_id: Option<DoctorId>,
    visit_date: Option<DateTime<Utc>>,
    status: VisitStatus,
    outcome: Option<VisitOutcome>,
    not_met_reason: Option<String>,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    location: Option<GeoPoint>,
    notes: Option<String>,
    orders: Vec<OrderLine>,
    created_by: Option<UserId>,
}

impl VisitBuilder {
    pub fn new() -> Self {
        Self {
            mr_id: None,
            doctor_id: None,
            visit_date: None,
            status: VisitStatus::Completed,
            outcome: None,
            not_met_reason: None,
            check_in: None,
            check_out: None,
            location: None,
            notes: None,
            orders: Vec::new(),
            created_by: None,
        }
    }

    pub fn mr(mut self, mr_id: UserId) -> Self {
        self.mr_id = Some(mr_id);
        self
    }

    pub fn doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }

    /// Sets the visit instant; defaults to now when omitted
    pub fn visit_date(mut self, when: DateTime<Utc>) -> Self {
        self.visit_date = Some(when);
        self
    }

    pub fn status(mut self, status: VisitStatus) -> Self {
        self.status = status;
        self
    }

    pub fn outcome(mut self, outcome: VisitOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn not_met_reason(mut self, reason: impl Into<String>) -> Self {
        self.not_met_reason = Some(reason.into());
        self
    }

    pub fn check_in(mut self, when: DateTime<Utc>) -> Self {
        self.check_in = Some(when);
        self
    }

    pub fn check_out(mut self, when: DateTime<Utc>) -> Self {
        self.check_out = Some(when);
        self
    }

    pub fn location(mut self, point: GeoPoint) -> Self {
        self.location = Some(point);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn add_order(mut self, line: OrderLine) -> Self {
        self.orders.push(line);
        self
    }

    pub fn orders(mut self, lines: Vec<OrderLine>) -> Self {
        self.orders = lines;
        self
    }

    pub fn recorded_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// Builds the visit
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing.
    pub fn build(self) -> Result<Visit, VisitError> {
        let mr_id = self
            .mr_id
            .ok_or_else(|| VisitError::invalid("mr_id is required"))?;
        let doctor_id = self
            .doctor_id
            .ok_or_else(|| VisitError::invalid("doctor_id is required"))?;
        let created_by = self
            .created_by
            .ok_or_else(|| VisitError::invalid("created_by is required"))?;

        let now = Utc::now();
        Ok(Visit {
            id: VisitId::new_v7(),
            mr_id,
            doctor_id,
            visit_date: self.visit_date.unwrap_or(now),
            status: self.status,
            outcome: self.outcome,
            not_met_reason: self.not_met_reason,
            check_in: self.check_in,
            check_out: self.check_out,
            location: self.location,
            notes: self.notes,
            orders: self.orders,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Default for VisitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn sample_visit() -> Visit {
        VisitBuilder::new()
            .mr(UserId::new_v7())
            .doctor(DoctorId::new_v7())
            .recorded_by(UserId::new_v7())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_mr_and_doctor() {
        let missing_mr = VisitBuilder::new()
            .doctor(DoctorId::new_v7())
            .recorded_by(UserId::new_v7())
            .build();
        assert!(missing_mr.is_err());

        let missing_doctor = VisitBuilder::new()
            .mr(UserId::new_v7())
            .recorded_by(UserId::new_v7())
            .build();
        assert!(missing_doctor.is_err());
    }

    #[test]
    fn test_visit_without_outcome_counts() {
        let visit = sample_visit();
        assert!(visit.counts_for_coverage());
    }

    #[test]
    fn test_met_doctor_counts_other_outcomes_do_not() {
        let mut visit = sample_visit();

        visit.outcome = Some(VisitOutcome::MetDoctor);
        assert!(visit.counts_for_coverage());

        for outcome in [
            VisitOutcome::DoctorNotAvailable,
            VisitOutcome::ClinicClosed,
            VisitOutcome::DoctorBusy,
            VisitOutcome::Other,
        ] {
            visit.outcome = Some(outcome);
            assert!(!visit.counts_for_coverage(), "{} should not count", outcome);
        }
    }

    #[test]
    fn test_cancelled_visit_never_counts() {
        let mut visit = sample_visit();
        visit.outcome = Some(VisitOutcome::MetDoctor);
        visit.cancel().unwrap();

        assert!(!visit.counts_for_coverage());
        assert!(!visit.occupies_day());
    }

    #[test]
    fn test_cancel_is_not_repeatable() {
        let mut visit = sample_visit();
        visit.cancel().unwrap();
        assert!(visit.cancel().is_err());
    }

    #[test]
    fn test_reschedule_moves_date_and_flags_status() {
        let mut visit = sample_visit();
        let new_date = visit.visit_date + chrono::Duration::days(1);

        visit.reschedule(new_date).unwrap();
        assert_eq!(visit.visit_date, new_date);
        assert_eq!(visit.status, VisitStatus::Rescheduled);
        // Rescheduled visits still hold their (new) day
        assert!(visit.occupies_day());
    }

    #[test]
    fn test_reschedule_rejected_after_cancel() {
        let mut visit = sample_visit();
        visit.cancel().unwrap();
        assert!(visit.reschedule(Utc::now()).is_err());
    }

    #[test]
    fn test_order_value_sums_lines() {
        let mut visit = sample_visit();
        assert!(visit.order_value().is_none());

        visit.orders.push(OrderLine::new(
            "Amoxicillin 500mg",
            10,
            Money::new(dec!(1200), Currency::INR),
        ));
        visit.orders.push(OrderLine::new(
            "Vitamin D3",
            5,
            Money::new(dec!(450.50), Currency::INR),
        ));

        let total = visit.order_value().unwrap();
        assert_eq!(total.amount(), dec!(1650.50));
    }

    #[test]
    fn test_status_serde_wire_format() {
        let json = serde_json::to_string(&VisitOutcome::MetDoctor).unwrap();
        assert_eq!(json, "\"MET_DOCTOR\"");

        let parsed: VisitStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, VisitStatus::Cancelled);
    }
}
