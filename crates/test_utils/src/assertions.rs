//! Custom Test Assertions
//!
//! Assertion helpers for domain types that produce more meaningful failure
//! messages than a bare `assert_eq`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{DayWindow, Money, MonthWindow};
use domain_coverage::{ComplianceStatus, CoverageStats};

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than
/// tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value is strictly positive
pub fn assert_money_positive(money: &Money) {
    assert!(
        money.amount() > Decimal::ZERO,
        "Expected positive money, got {}",
        money
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that money values sum to a total
///
/// # Panics
///
/// Panics if the sum doesn't equal the total or a currency differs
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum = parts.iter().fold(Money::zero(total.currency()), |acc, m| {
        acc.checked_add(m).expect("Currency mismatch in sum")
    });

    assert_eq!(
        sum.amount(),
        total.amount(),
        "Sum of parts ({}) doesn't equal total ({})",
        sum.amount(),
        total.amount()
    );
}

/// Asserts the full derived compliance triple in one call
pub fn assert_compliance(
    stats: &CoverageStats,
    expected_actual: u32,
    expected_percentage: Decimal,
    expected_status: ComplianceStatus,
) {
    assert_eq!(
        stats.actual_visits, expected_actual,
        "Actual visits: expected {}, got {}",
        expected_actual, stats.actual_visits
    );
    assert_eq!(
        stats.compliance_percentage, expected_percentage,
        "Compliance percentage: expected {}, got {}",
        expected_percentage, stats.compliance_percentage
    );
    assert_eq!(
        stats.status, expected_status,
        "Status: expected {} at {}%, got {}",
        expected_status, stats.compliance_percentage, stats.status
    );
}

/// Asserts that a percentage classifies to the expected status
pub fn assert_classifies_as(percentage: Decimal, expected: ComplianceStatus) {
    let actual = ComplianceStatus::classify(percentage);
    assert_eq!(
        actual, expected,
        "{}% classified as {}, expected {}",
        percentage, actual, expected
    );
}

/// Asserts that a month window contains a UTC instant
pub fn assert_window_contains(window: &MonthWindow, timestamp: DateTime<Utc>) {
    assert!(
        window.contains(timestamp),
        "Window for {} [{} .. {}] does not contain {}",
        window.key,
        window.start,
        window.end,
        timestamp
    );
}

/// Asserts that a month window excludes a UTC instant
pub fn assert_window_excludes(window: &MonthWindow, timestamp: DateTime<Utc>) {
    assert!(
        !window.contains(timestamp),
        "Window for {} [{} .. {}] unexpectedly contains {}",
        window.key,
        window.start,
        window.end,
        timestamp
    );
}

/// Asserts that a day window contains a UTC instant
pub fn assert_day_contains(window: &DayWindow, timestamp: DateTime<Utc>) {
    assert!(
        window.contains(timestamp),
        "Day window for {} [{} .. {}] does not contain {}",
        window.date,
        window.start,
        window.end,
        timestamp
    );
}

/// Asserts that a decimal value is within a range
pub fn assert_decimal_in_range(value: Decimal, min: Decimal, max: Decimal) {
    assert!(
        value >= min && value <= max,
        "Decimal {} is not in range [{}, {}]",
        value,
        min,
        max
    );
}

/// Asserts that a decimal value is approximately equal to another
pub fn assert_decimal_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Decimals differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that a result is Err and returns the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => panic!("{}: got Ok({:?})", $msg, value),
            Err(e) => e,
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!(
                "Expected Err matching {}, got Ok({:?})",
                stringify!($pattern),
                value
            ),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}
