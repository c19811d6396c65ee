//! Coverage domain errors

use thiserror::Error;

use core_kernel::PortError;
use domain_directory::DirectoryError;

/// Errors from coverage plan operations
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Coverage plan not found: {0}")]
    PlanNotFound(String),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Invalid coverage data: {0}")]
    InvalidData(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("An active coverage plan already exists for doctor {doctor_id} in {month}")]
    DuplicatePlan { doctor_id: String, month: String },

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl CoverageError {
    pub fn plan_not_found(id: impl std::fmt::Display) -> Self {
        Self::PlanNotFound(id.to_string())
    }

    pub fn doctor_not_found(id: impl std::fmt::Display) -> Self {
        Self::DoctorNotFound(id.to_string())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::NotAuthorized(message.into())
    }

    pub fn duplicate_plan(doctor_id: impl std::fmt::Display, month: impl std::fmt::Display) -> Self {
        Self::DuplicatePlan {
            doctor_id: doctor_id.to_string(),
            month: month.to_string(),
        }
    }
}
