//! Directory domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the directory domain
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Doctor with the given ID was not found
    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    /// User with the given ID was not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Invalid directory data provided
    #[error("Invalid directory data: {0}")]
    InvalidData(String),

    /// The actor is not allowed to perform this operation
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Storage-level failure
    #[error(transparent)]
    Port(#[from] PortError),
}

impl DirectoryError {
    /// Creates a DoctorNotFound error from any ID type
    pub fn doctor_not_found(id: impl std::fmt::Display) -> Self {
        DirectoryError::DoctorNotFound(id.to_string())
    }

    /// Creates a UserNotFound error from any ID type
    pub fn user_not_found(id: impl std::fmt::Display) -> Self {
        DirectoryError::UserNotFound(id.to_string())
    }

    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        DirectoryError::InvalidData(message.into())
    }

    /// Creates a NotAuthorized error with a message
    pub fn unauthorized(message: impl Into<String>) -> Self {
        DirectoryError::NotAuthorized(message.into())
    }
}
