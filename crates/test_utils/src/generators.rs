//! Property-Based Test Generators
//!
//! Proptest strategies for data that keeps domain invariants: counting
//! visits, plausible coordinates, month keys, and planned/actual pairs that
//! straddle the compliance classification boundaries.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, DoctorId, Money, MonthKey, UserId};
use domain_visit::{GeoPoint, OrderLine, Visit, VisitOutcome, VisitStatus};

use crate::builders::TestVisitBuilder;

/// Strategy for generating valid Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::INR),
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
    ]
}

/// Strategy for generating positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for generating positive Money values
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for generating positive INR Money values
pub fn inr_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(|amount| Money::from_minor(amount, Currency::INR))
}

/// Strategy for generating compliance percentages.
///
/// Goes above 100 on purpose; overshooting a target is a legal state.
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..15000u32).prop_map(|n| Decimal::new(i64::from(n), 2))
}

/// Strategy for generating planned visit targets
pub fn planned_visits_strategy() -> impl Strategy<Value = u32> {
    1u32..=40u32
}

/// Strategy for generating arbitrary planned/actual pairs
pub fn planned_actual_pair_strategy() -> impl Strategy<Value = (u32, u32)> {
    (planned_visits_strategy(), 0u32..=60u32)
}

/// Strategy for planned/actual pairs whose ratio lands near the 50 and 80
/// classification boundaries, where off-by-one rounding bugs live
pub fn boundary_pair_strategy() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=30u32, prop_oneof![Just(50i64), Just(80i64)], -2i64..=2i64).prop_map(
        |(planned, boundary, jitter)| {
            let exact = i64::from(planned) * boundary / 100;
            let actual = (exact + jitter).clamp(0, 2 * i64::from(planned));
            (planned, actual as u32)
        },
    )
}

/// Strategy for generating valid month keys
pub fn month_key_strategy() -> impl Strategy<Value = MonthKey> {
    (2020i32..2031i32, 1u32..=12u32)
        .prop_map(|(year, month)| MonthKey::new(year, month).expect("generated month is valid"))
}

/// Strategy for instants during June 2024, mid-morning to evening IST so the
/// local calendar day matches the UTC day number used to build them
pub fn june_day_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (1u32..=30u32, 4u32..=16u32)
        .prop_map(|(day, hour)| Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap())
}

/// Strategy for generating timestamps within 2024
pub fn timestamp_2024_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365i64).prop_map(|days| {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    })
}

/// Strategy for generating visit outcomes
pub fn visit_outcome_strategy() -> impl Strategy<Value = VisitOutcome> {
    prop_oneof![
        Just(VisitOutcome::MetDoctor),
        Just(VisitOutcome::DoctorNotAvailable),
        Just(VisitOutcome::ClinicClosed),
        Just(VisitOutcome::DoctorBusy),
        Just(VisitOutcome::Other),
    ]
}

/// Strategy for the outcomes that require a not-met reason
pub fn not_met_outcome_strategy() -> impl Strategy<Value = VisitOutcome> {
    prop_oneof![
        Just(VisitOutcome::DoctorNotAvailable),
        Just(VisitOutcome::ClinicClosed),
        Just(VisitOutcome::DoctorBusy),
        Just(VisitOutcome::Other),
    ]
}

/// Strategy for generating visit statuses
pub fn visit_status_strategy() -> impl Strategy<Value = VisitStatus> {
    prop_oneof![
        Just(VisitStatus::Completed),
        Just(VisitStatus::Cancelled),
        Just(VisitStatus::Rescheduled),
    ]
}

/// Strategy for coordinates inside the India service territory
pub fn india_geo_strategy() -> impl Strategy<Value = GeoPoint> {
    (60i64..=376i64, 680i64..=975i64)
        .prop_map(|(lat, lon)| GeoPoint::new(Decimal::new(lat, 1), Decimal::new(lon, 1)))
}

/// Strategy for generating valid order lines
pub fn order_line_strategy() -> impl Strategy<Value = OrderLine> {
    (
        prop_oneof![
            Just("Amoxicillin 500mg"),
            Just("Azithromycin 250mg"),
            Just("Vitamin D3"),
            Just("Paracetamol 650mg"),
            Just("Omeprazole 20mg"),
        ],
        1u32..=100u32,
        100i64..=1_000_000i64,
    )
        .prop_map(|(product, quantity, minor)| {
            OrderLine::new(product, quantity, Money::from_minor(minor, Currency::INR))
        })
}

/// Strategy for generating met visits for one MR-doctor pair, spread across
/// June 2024
pub fn met_visit_strategy(mr_id: UserId, doctor_id: DoctorId) -> impl Strategy<Value = Visit> {
    june_day_strategy().prop_map(move |when| {
        TestVisitBuilder::new()
            .for_mr(mr_id)
            .to_doctor(doctor_id)
            .on(when)
            .build()
    })
}

/// Strategy for generating UserId values
pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    any::<[u8; 16]>().prop_map(|bytes| UserId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for generating DoctorId values
pub fn doctor_id_strategy() -> impl Strategy<Value = DoctorId> {
    any::<[u8; 16]>().prop_map(|bytes| DoctorId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for generating person names
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10} [A-Z][a-z]{2,10}".prop_map(|s| s)
}

/// Strategy for generating Indian mobile numbers
pub fn phone_strategy() -> impl Strategy<Value = String> {
    (6u64..=9u64, 100_000_000u64..=999_999_999u64)
        .prop_map(|(lead, rest)| format!("+91-{}{}", lead, rest))
}

/// Strategy for generating email addresses
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{5,10}", "[a-z]{3,8}").prop_map(|(local, domain)| format!("{}@{}.com", local, domain))
}

/// Strategy for generating medical specializations
pub fn specialization_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Cardiology".to_string()),
        Just("Dermatology".to_string()),
        Just("Orthopedics".to_string()),
        Just("Pediatrics".to_string()),
        Just("General Medicine".to_string()),
        Just("ENT".to_string()),
    ]
}
