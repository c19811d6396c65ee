//! Reporting-calendar types
//!
//! Coverage targets and visit uniqueness are defined against calendar months
//! and days in the configured reporting timezone, while all stored instants
//! are UTC. This module owns that conversion: month keys, and the closed
//! UTC windows a local month or day expands to.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the reporting calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Converts a UTC datetime to the local timezone
    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.0)
    }

    /// Returns the local calendar date of a UTC instant
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        self.to_local(utc).date_naive()
    }

    /// Gets the start of day (00:00:00) in this timezone as UTC
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        self.resolve_local(midnight)
    }

    /// Gets the end of day (23:59:59.999999999) in this timezone as UTC
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let last_nano = date
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or_default();
        self.resolve_local(last_nano)
    }

    /// The closed UTC window covering one local calendar day
    pub fn day_window(&self, date: NaiveDate) -> DayWindow {
        DayWindow {
            date,
            start: self.start_of_day(date),
            end: self.end_of_day(date),
        }
    }

    /// Resolves a local wall-clock time to UTC.
    ///
    /// Ambiguous times (DST fold) resolve to the earlier instant; times
    /// inside a DST gap are pushed forward in one-hour steps until they
    /// exist. No real offset transition exceeds a few hours, so the loop is
    /// bounded; if it somehow fails the wall-clock time is read as UTC.
    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let mut candidate = local;
        for _ in 0..4 {
            if let Some(resolved) = candidate.and_local_timezone(self.0).earliest() {
                return resolved.with_timezone(&Utc);
            }
            candidate += Duration::hours(1);
        }
        Utc.from_utc_datetime(&local)
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid month key '{0}': expected YYYY-MM")]
    InvalidMonthKey(String),

    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// A calendar month key in `YYYY-MM` form
///
/// Coverage plans are keyed by these. Parsing is strict: four-digit year,
/// zero-padded two-digit month, nothing else. `2024-6` and `2024-13` are
/// both rejected so plan keys stay canonical and sortable as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1970..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidMonthKey(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing a UTC instant, read in the reporting timezone
    pub fn from_datetime(utc: DateTime<Utc>, tz: &Timezone) -> Self {
        let local = tz.to_local(utc);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        // Validated at construction, so the date always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Last calendar day of the month
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap_or_default()
            .pred_opt()
            .unwrap_or_default()
    }

    /// The closed UTC window covering this month in the given timezone
    pub fn window(&self, tz: &Timezone) -> MonthWindow {
        MonthWindow {
            key: *self,
            start: tz.start_of_day(self.first_day()),
            end: tz.end_of_day(self.last_day()),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TemporalError::InvalidMonthKey(s.to_string());
        let (year_str, month_str) = s.split_once('-').ok_or_else(invalid)?;
        if year_str.len() != 4
            || month_str.len() != 2
            || !year_str.bytes().all(|b| b.is_ascii_digit())
            || !month_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let year: i32 = year_str.parse().map_err(|_| invalid())?;
        let month: u32 = month_str.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Closed UTC range covering one reporting-calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthWindow {
    pub key: MonthKey,
    /// First instant of the month (inclusive)
    pub start: DateTime<Utc>,
    /// Last instant of the month (inclusive)
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Closed UTC range covering one reporting-calendar day
///
/// Visit uniqueness is per local day, so duplicate checks query this window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    /// First instant of the day (inclusive)
    pub start: DateTime<Utc>,
    /// Last instant of the day (inclusive)
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ist() -> Timezone {
        Timezone(chrono_tz::Asia::Kolkata)
    }

    #[test]
    fn test_month_key_parse_and_display() {
        let key: MonthKey = "2024-06".parse().unwrap();
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 6);
        assert_eq!(key.to_string(), "2024-06");
    }

    #[test]
    fn test_month_key_rejects_loose_formats() {
        for bad in ["2024-6", "2024-13", "2024-00", "202406", "24-06", "2024-06-01", "abcd-ef"] {
            assert!(bad.parse::<MonthKey>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_month_key_ordering() {
        let a: MonthKey = "2023-12".parse().unwrap();
        let b: MonthKey = "2024-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_last_day_handles_leap_and_december() {
        assert_eq!(
            MonthKey::new(2024, 2).unwrap().last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            MonthKey::new(2024, 12).unwrap().last_day(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_month_window_in_ist() {
        let window = MonthKey::new(2024, 6).unwrap().window(&ist());
        // IST is UTC+5:30, so local June starts at May 31 18:30 UTC
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 5, 31, 18, 30, 0).unwrap()
        );
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 6, 30, 18, 30, 0).unwrap()));
    }

    #[test]
    fn test_month_attribution_follows_local_calendar() {
        // 19:00 UTC on June 30 is already July 1 in IST
        let utc = Utc.with_ymd_and_hms(2024, 6, 30, 19, 0, 0).unwrap();
        let key = MonthKey::from_datetime(utc, &ist());
        assert_eq!(key.to_string(), "2024-07");
    }

    #[test]
    fn test_day_window_in_ist() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let window = ist().day_window(date);
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 6, 14, 18, 30, 0).unwrap()
        );
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 6, 15, 18, 30, 0).unwrap()));
    }

    #[test]
    fn test_midnight_in_dst_gap_does_not_panic() {
        // Azores springs forward at local midnight, so 00:00 does not exist
        // on the transition day and resolution moves to the next valid hour.
        let azores = Timezone(chrono_tz::Atlantic::Azores);
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let window = azores.day_window(date);
        assert!(window.start < window.end);
        assert_eq!(window.start.hour(), 1);
    }

    #[test]
    fn test_local_date() {
        let utc = Utc.with_ymd_and_hms(2024, 6, 14, 20, 0, 0).unwrap();
        assert_eq!(
            ist().local_date(utc),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
    }
}
