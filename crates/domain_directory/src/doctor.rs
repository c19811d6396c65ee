//! Doctor entity
//!
//! A doctor is the target of field visits and coverage plans. Each doctor is
//! assigned to at most one MR at a time; coverage plans and visit permissions
//! follow that assignment. Doctors created by an MR enter the directory
//! unapproved and become visible to planning only once an owner or manager
//! approves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DoctorId, UserId};

/// A doctor in the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    /// Unique doctor identifier
    pub id: DoctorId,
    /// Doctor's name
    pub name: String,
    /// Medical specialization (e.g., "Cardiology")
    pub specialization: Option<String>,
    /// Clinic or hospital name
    pub clinic_name: Option<String>,
    /// City of practice
    pub city: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// The MR currently responsible for this doctor
    pub assigned_mr: Option<UserId>,
    /// Whether an owner or manager has approved this doctor
    pub is_approved: bool,
    /// Whether this doctor is active (soft delete)
    pub is_active: bool,
    /// The user who created this record
    pub created_by: UserId,
    /// When this doctor was created
    pub created_at: DateTime<Utc>,
    /// When this doctor was last updated
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Creates a new unapproved, active doctor
    pub fn new(name: impl Into<String>, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: DoctorId::new_v7(),
            name: name.into(),
            specialization: None,
            clinic_name: None,
            city: None,
            phone: None,
            assigned_mr: None,
            is_approved: false,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Approved and active, the state in which MRs see this doctor in
    /// directory listings by default
    pub fn is_plannable(&self) -> bool {
        self.is_active && self.is_approved
    }

    /// True if this doctor is currently assigned to the given MR
    pub fn is_assigned_to(&self, mr_id: UserId) -> bool {
        self.assigned_mr == Some(mr_id)
    }

    /// Assigns this doctor to an MR
    pub fn assign_to(&mut self, mr_id: UserId) {
        self.assigned_mr = Some(mr_id);
        self.updated_at = Utc::now();
    }

    /// Marks this doctor approved
    pub fn approve(&mut self) {
        self.is_approved = true;
        self.updated_at = Utc::now();
    }

    /// Deactivates this doctor (soft delete)
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_doctor_starts_unapproved() {
        let doctor = Doctor::new("Dr. Mehta", UserId::new_v7());
        assert!(!doctor.is_approved);
        assert!(doctor.is_active);
        assert!(!doctor.is_plannable());
    }

    #[test]
    fn test_approval_makes_doctor_plannable() {
        let mut doctor = Doctor::new("Dr. Mehta", UserId::new_v7());
        doctor.approve();
        assert!(doctor.is_plannable());
        doctor.deactivate();
        assert!(!doctor.is_plannable());
    }

    #[test]
    fn test_assignment() {
        let mr = UserId::new_v7();
        let mut doctor = Doctor::new("Dr. Mehta", mr);
        assert!(!doctor.is_assigned_to(mr));
        doctor.assign_to(mr);
        assert!(doctor.is_assigned_to(mr));
    }
}
