//! Visit field validation
//!
//! Validates the facts an MR reports from the field before they enter the
//! ledger. Rules are configuration-driven where the deployment varies:
//! the back-date window and the geo bounding box come from `VisitRules`.
//!
//! # Validation Rules
//!
//! - `visit_date` must not be in the future (a small clock-skew allowance
//!   is tolerated) and must not be older than the back-date window
//! - An outcome other than `MetDoctor` requires a not-met reason
//! - Check-in must precede check-out when both are given
//! - GPS coordinates, when present, must fall inside the bounding box
//! - Order lines need a product name, a positive quantity and a
//!   non-negative amount

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::Timezone;

use crate::visit::Visit;

/// Clock-skew allowance for "not in the future"
const FUTURE_SKEW_MINUTES: i64 = 5;

/// Result of visit validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the visit is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Adds a warning to the result
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Merges another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// First error message, for collapsing into a single-message error type
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Rectangular geo fence for plausibility checks on reported coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoBounds {
    pub min_latitude: Decimal,
    pub max_latitude: Decimal,
    pub min_longitude: Decimal,
    pub max_longitude: Decimal,
}

impl GeoBounds {
    /// Bounding box covering India, the default deployment territory
    pub fn india() -> Self {
        Self {
            min_latitude: dec!(6.0),
            max_latitude: dec!(37.6),
            min_longitude: dec!(68.0),
            max_longitude: dec!(97.5),
        }
    }

    pub fn contains(&self, latitude: Decimal, longitude: Decimal) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::india()
    }
}

/// Deployment-configurable validation rules for visits
#[derive(Debug, Clone)]
pub struct VisitRules {
    /// How far back a visit may be recorded, in days
    pub backdate_window_days: u32,
    /// Plausibility fence for reported GPS coordinates
    pub geo_bounds: GeoBounds,
    /// Reporting timezone used for calendar-day and month attribution
    pub timezone: Timezone,
}

impl Default for VisitRules {
    fn default() -> Self {
        Self {
            backdate_window_days: 90,
            geo_bounds: GeoBounds::default(),
            timezone: Timezone::default(),
        }
    }
}

impl VisitRules {
    /// Validates a visit against all field rules
    pub fn validate(&self, visit: &Visit) -> ValidationResult {
        self.validate_at(visit, Utc::now())
    }

    /// Validates with an explicit "now", so the window checks are testable
    pub fn validate_at(&self, visit: &Visit, now: DateTime<Utc>) -> ValidationResult {
        let mut result = self.validate_timing(visit.visit_date, now);
        result.merge(self.validate_fields(visit));
        result
    }

    /// Checks the visit instant against the future and back-date windows.
    ///
    /// Kept separate so updates that leave `visit_date` untouched don't
    /// reject a record that has simply aged past the window.
    pub fn validate_timing(&self, visit_date: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if visit_date > now + Duration::minutes(FUTURE_SKEW_MINUTES) {
            result.add_error("Visit date cannot be in the future");
        }
        let window_start = now - Duration::days(i64::from(self.backdate_window_days));
        if visit_date < window_start {
            result.add_error(format!(
                "Visit date is older than the {}-day back-date window",
                self.backdate_window_days
            ));
        }

        result
    }

    /// Validates everything except the visit instant
    pub fn validate_fields(&self, visit: &Visit) -> ValidationResult {
        let mut result = ValidationResult::ok();

        match visit.outcome {
            Some(outcome) if !outcome.is_met() => {
                if visit
                    .not_met_reason
                    .as_deref()
                    .map_or(true, |r| r.trim().is_empty())
                {
                    result.add_error(format!("Outcome {} requires a not-met reason", outcome));
                }
            }
            Some(_) => {
                if visit.not_met_reason.is_some() {
                    result.add_warning("Not-met reason is ignored when the doctor was met");
                }
            }
            None => {}
        }

        if let (Some(check_in), Some(check_out)) = (visit.check_in, visit.check_out) {
            if check_out <= check_in {
                result.add_error("Check-out must be after check-in");
            }
        }

        if let Some(location) = visit.location {
            if !self
                .geo_bounds
                .contains(location.latitude, location.longitude)
            {
                result.add_error(format!(
                    "Location ({}, {}) is outside the service territory",
                    location.latitude, location.longitude
                ));
            }
        }

        for line in &visit.orders {
            if line.product.trim().is_empty() {
                result.add_error("Order line product name is required");
            }
            if line.quantity == 0 {
                result.add_error(format!(
                    "Order line quantity must be positive for {}",
                    line.product
                ));
            }
            if line.amount.is_negative() {
                result.add_error(format!(
                    "Order line amount cannot be negative for {}",
                    line.product
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::{GeoPoint, OrderLine, VisitBuilder, VisitOutcome};
    use core_kernel::{Currency, DoctorId, Money, UserId};

    fn visit_at(when: DateTime<Utc>) -> Visit {
        VisitBuilder::new()
            .mr(UserId::new_v7())
            .doctor(DoctorId::new_v7())
            .visit_date(when)
            .recorded_by(UserId::new_v7())
            .build()
            .unwrap()
    }

    #[test]
    fn test_current_visit_passes() {
        let now = Utc::now();
        let result = VisitRules::default().validate_at(&visit_at(now), now);
        assert!(result.is_valid, "Errors: {:?}", result.errors);
    }

    #[test]
    fn test_future_visit_rejected() {
        let now = Utc::now();
        let visit = visit_at(now + Duration::hours(2));
        let result = VisitRules::default().validate_at(&visit, now);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("future")));
    }

    #[test]
    fn test_small_clock_skew_tolerated() {
        let now = Utc::now();
        let visit = visit_at(now + Duration::minutes(3));
        let result = VisitRules::default().validate_at(&visit, now);
        assert!(result.is_valid);
    }

    #[test]
    fn test_backdate_window_enforced() {
        let now = Utc::now();
        let inside = visit_at(now - Duration::days(89));
        assert!(VisitRules::default().validate_at(&inside, now).is_valid);

        let outside = visit_at(now - Duration::days(91));
        let result = VisitRules::default().validate_at(&outside, now);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("back-date")));
    }

    #[test]
    fn test_not_met_outcome_requires_reason() {
        let now = Utc::now();
        let mut visit = visit_at(now);
        visit.outcome = Some(VisitOutcome::ClinicClosed);

        let result = VisitRules::default().validate_at(&visit, now);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("reason")));

        visit.not_met_reason = Some("Shutters down at 2pm".to_string());
        assert!(VisitRules::default().validate_at(&visit, now).is_valid);
    }

    #[test]
    fn test_met_outcome_with_reason_warns() {
        let now = Utc::now();
        let mut visit = visit_at(now);
        visit.outcome = Some(VisitOutcome::MetDoctor);
        visit.not_met_reason = Some("n/a".to_string());

        let result = VisitRules::default().validate_at(&visit, now);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_check_out_before_check_in_rejected() {
        let now = Utc::now();
        let mut visit = visit_at(now);
        visit.check_in = Some(now);
        visit.check_out = Some(now - Duration::minutes(30));

        let result = VisitRules::default().validate_at(&visit, now);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("Check-out")));
    }

    #[test]
    fn test_location_outside_territory_rejected() {
        let now = Utc::now();
        let mut visit = visit_at(now);
        // London
        visit.location = Some(GeoPoint::new(dec!(51.5), dec!(-0.12)));

        let result = VisitRules::default().validate_at(&visit, now);
        assert!(!result.is_valid);

        // Pune
        visit.location = Some(GeoPoint::new(dec!(18.52), dec!(73.85)));
        assert!(VisitRules::default().validate_at(&visit, now).is_valid);
    }

    #[test]
    fn test_field_validation_skips_timing() {
        let old = visit_at(Utc::now() - Duration::days(400));
        let result = VisitRules::default().validate_fields(&old);
        assert!(result.is_valid);
    }

    #[test]
    fn test_order_line_rules() {
        let now = Utc::now();
        let mut visit = visit_at(now);
        visit.orders.push(OrderLine::new(
            "",
            0,
            Money::new(dec!(-10), Currency::INR),
        ));

        let result = VisitRules::default().validate_at(&visit, now);
        assert_eq!(result.errors.len(), 3);
    }
}
