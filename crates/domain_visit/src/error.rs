//! Visit domain errors

use thiserror::Error;

use core_kernel::PortError;
use domain_directory::DirectoryError;

use crate::visit::Visit;

/// Errors from visit operations
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("Visit not found: {0}")]
    VisitNotFound(String),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Invalid visit data: {0}")]
    InvalidData(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// A non-cancelled visit already exists for the same MR, doctor and day.
    /// Carries the existing visit so callers can redirect to an update flow.
    #[error("A visit for this doctor is already recorded on this day")]
    DuplicateVisit { existing: Box<Visit> },

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl VisitError {
    pub fn visit_not_found(id: impl std::fmt::Display) -> Self {
        Self::VisitNotFound(id.to_string())
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

    pub fn duplicate(existing: Visit) -> Self {
        Self::DuplicateVisit {
            existing: Box::new(existing),
        }
    }
}
