//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for the values that appear in almost every test:
//! money amounts, reporting-calendar instants, identifiers and the strings a
//! field team would actually enter. Fixtures are deterministic so assertions
//! can compare against exact values.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{
    BeatPlanId, CoveragePlanId, Currency, DoctorId, Money, MonthKey, MonthWindow, Timezone,
    UserId, VisitId,
};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Reporting timezone shared by the whole suite
static REPORTING_TZ: Lazy<Timezone> =
    Lazy::new(|| Timezone::parse("Asia/Kolkata").expect("valid IANA name"));

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard INR amount for testing
    pub fn inr_100() -> Money {
        Money::new(dec!(100.00), Currency::INR)
    }

    /// A typical order line value
    pub fn inr_order() -> Money {
        Money::new(dec!(1200.00), Currency::INR)
    }

    /// Creates a zero amount
    pub fn inr_zero() -> Money {
        Money::zero(Currency::INR)
    }

    /// Creates a USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Creates a negative amount for stock-return scenarios
    pub fn inr_return() -> Money {
        Money::new(dec!(-50.00), Currency::INR)
    }
}

/// Fixture for temporal test data
///
/// The suite standardises on June 2024 in Asia/Kolkata. UTC instants are
/// chosen mid-morning IST so they never straddle a local day boundary.
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The reporting timezone (Asia/Kolkata, UTC+05:30)
    pub fn reporting_timezone() -> Timezone {
        *REPORTING_TZ
    }

    /// The standard coverage month
    pub fn june_2024() -> MonthKey {
        MonthKey::new(2024, 6).expect("valid month")
    }

    /// The UTC window June 2024 expands to in the reporting timezone
    pub fn june_window() -> MonthWindow {
        Self::june_2024().window(&Self::reporting_timezone())
    }

    /// Morning of a June day: 10:30 IST, safely inside the local date
    pub fn june_morning(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 5, 0, 0).single().expect("valid day")
    }

    /// First visit instant of the month
    pub fn month_start() -> DateTime<Utc> {
        Self::june_morning(1)
    }

    /// Mid-month instant for containment tests
    pub fn mid_month() -> DateTime<Utc> {
        Self::june_morning(15)
    }

    /// Last visit instant of the month
    pub fn month_end() -> DateTime<Utc> {
        Self::june_morning(30)
    }

    /// An instant attributed to May 2024
    pub fn before_month() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 28, 5, 0, 0).unwrap()
    }

    /// An instant attributed to July 2024
    pub fn after_month() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 2, 5, 0, 0).unwrap()
    }

    /// The standard beat plan date
    pub fn plan_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date")
    }

    /// A UTC instant that belongs to the NEXT local day in IST.
    ///
    /// 20:30 UTC on June 1 is 02:00 IST on June 2; useful for proving that
    /// day and month attribution follow the reporting timezone, not UTC.
    pub fn late_utc_crossing_into_next_ist_day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 20, 30, 0).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a deterministic owner ID for testing
    pub fn owner_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// Creates a deterministic manager ID for testing
    pub fn manager_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    /// Creates a deterministic MR ID for testing
    pub fn mr_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }

    /// Creates a deterministic doctor ID for testing
    pub fn doctor_id() -> DoctorId {
        DoctorId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440004").unwrap())
    }

    /// Creates a deterministic visit ID for testing
    pub fn visit_id() -> VisitId {
        VisitId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440005").unwrap())
    }

    /// Creates a deterministic coverage plan ID for testing
    pub fn coverage_plan_id() -> CoveragePlanId {
        CoveragePlanId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440006").unwrap())
    }

    /// Creates a deterministic beat plan ID for testing
    pub fn beat_plan_id() -> BeatPlanId {
        BeatPlanId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440007").unwrap())
    }
}

/// Fixture for decimal test data around the classification boundaries
pub struct DecimalFixtures;

impl DecimalFixtures {
    /// A comfortably on-track percentage
    pub fn on_track() -> Decimal {
        dec!(90.00)
    }

    /// Exactly on the 80 boundary, which still classifies as at-risk
    pub fn at_risk_ceiling() -> Decimal {
        dec!(80.00)
    }

    /// Exactly on the 50 boundary, the lowest at-risk value
    pub fn at_risk_floor() -> Decimal {
        dec!(50.00)
    }

    /// A clearly missed percentage
    pub fn missed() -> Decimal {
        dec!(40.00)
    }

    /// An over-achieving percentage; compliance is never capped at 100
    pub fn overshoot() -> Decimal {
        dec!(120.00)
    }

    /// Small epsilon for approximate comparisons
    pub fn epsilon() -> Decimal {
        dec!(0.01)
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    /// Test owner name
    pub fn owner_name() -> &'static str {
        "Priya Nair"
    }

    /// Test manager name
    pub fn manager_name() -> &'static str {
        "Asha Patel"
    }

    /// Test MR name
    pub fn mr_name() -> &'static str {
        "Ravi Kumar"
    }

    /// Test doctor name
    pub fn doctor_name() -> &'static str {
        "Dr. Mehta"
    }

    /// Standard specialization
    pub fn specialization() -> &'static str {
        "Cardiology"
    }

    /// Standard clinic name
    pub fn clinic_name() -> &'static str {
        "Sunrise Clinic"
    }

    /// Standard city of practice
    pub fn city() -> &'static str {
        "Pune"
    }

    /// Test email address
    pub fn email() -> &'static str {
        "ravi.kumar@example.com"
    }

    /// Test phone number
    pub fn phone() -> &'static str {
        "+91-9820012345"
    }

    /// Standard order line product
    pub fn product() -> &'static str {
        "Amoxicillin 500mg"
    }

    /// Standard reason for a not-met outcome
    pub fn not_met_reason() -> &'static str {
        "Doctor on leave"
    }
}
