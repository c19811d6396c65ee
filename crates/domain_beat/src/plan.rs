//! Beat plan aggregate
//!
//! A beat plan is an MR's itinerary for one local calendar day: the doctors
//! they intend to call on, each tracked as an entry. Entries start out
//! Planned and flip to Visited when a counting visit lands on that day.
//!
//! # Invariants
//!
//! - At most one plan per (mr_id, plan_date).
//! - One entry per doctor within a plan.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{BeatPlanId, DoctorId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a single itinerary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeatEntryStatus {
    Planned,
    Visited,
    Skipped,
}

impl BeatEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeatEntryStatus::Planned => "PLANNED",
            BeatEntryStatus::Visited => "VISITED",
            BeatEntryStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for BeatEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BeatEntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(BeatEntryStatus::Planned),
            "VISITED" => Ok(BeatEntryStatus::Visited),
            "SKIPPED" => Ok(BeatEntryStatus::Skipped),
            other => Err(format!("Unknown beat entry status: {}", other)),
        }
    }
}

/// One doctor on the day's itinerary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatEntry {
    pub doctor_id: DoctorId,
    pub status: BeatEntryStatus,
}

impl BeatEntry {
    pub fn planned(doctor_id: DoctorId) -> Self {
        Self {
            doctor_id,
            status: BeatEntryStatus::Planned,
        }
    }
}

/// An MR's itinerary for a single local calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatPlan {
    pub id: BeatPlanId,
    pub mr_id: UserId,
    /// Local calendar date in the reporting timezone
    pub plan_date: NaiveDate,
    pub entries: Vec<BeatEntry>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BeatPlan {
    /// Creates a plan with every doctor entry in the Planned state
    pub fn new(
        mr_id: UserId,
        plan_date: NaiveDate,
        doctor_ids: Vec<DoctorId>,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BeatPlanId::new(),
            mr_id,
            plan_date,
            entries: doctor_ids.into_iter().map(BeatEntry::planned).collect(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains_doctor(&self, doctor_id: DoctorId) -> bool {
        self.entries.iter().any(|e| e.doctor_id == doctor_id)
    }

    /// Marks the matching entry Visited; returns false when the doctor is
    /// not on this itinerary. Already-visited entries are left alone.
    pub fn mark_visited(&mut self, doctor_id: DoctorId) -> bool {
        match self.entries.iter_mut().find(|e| e.doctor_id == doctor_id) {
            Some(entry) => {
                entry.status = BeatEntryStatus::Visited;
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn visited_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == BeatEntryStatus::Visited)
            .count()
    }
}
