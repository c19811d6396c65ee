//! API error handling
//!
//! Every failure leaves the API in one response shape. Domain errors map
//! onto four client categories (validation 400, authorization 403, not
//! found 404, conflict 409); storage and internal failures collapse to 500
//! without leaking details. A duplicate-visit conflict additionally carries
//! the visit already occupying the day, so clients can redirect to an
//! update flow instead of guessing.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use core_kernel::PortError;
use domain_beat::BeatError;
use domain_coverage::CoverageError;
use domain_directory::DirectoryError;
use domain_visit::VisitError;

use crate::dto::visit::VisitResponse;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Duplicate-visit conflict carrying the visit already on the day
    #[error("{message}")]
    DuplicateVisit {
        message: String,
        existing: Box<VisitResponse>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_visit: Option<Box<VisitResponse>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, existing_visit) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::DuplicateVisit { message, existing } => {
                (StatusCode::CONFLICT, "conflict", message, Some(existing))
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
            existing_visit,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        let message = err.to_string();
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(message),
            PortError::Validation { .. } => ApiError::Validation(message),
            PortError::Conflict { .. } => ApiError::Conflict(message),
            PortError::Unauthorized { .. } => ApiError::Forbidden(message),
            PortError::Connection { .. } | PortError::Internal { .. } => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::DoctorNotFound(_) | DirectoryError::UserNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            DirectoryError::InvalidData(_) => ApiError::Validation(err.to_string()),
            DirectoryError::NotAuthorized(_) => ApiError::Forbidden(err.to_string()),
            DirectoryError::Port(e) => e.into(),
        }
    }
}

impl From<VisitError> for ApiError {
    fn from(err: VisitError) -> Self {
        match err {
            VisitError::VisitNotFound(_) | VisitError::DoctorNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            VisitError::InvalidData(_) => ApiError::Validation(err.to_string()),
            VisitError::NotAuthorized(_) => ApiError::Forbidden(err.to_string()),
            VisitError::DuplicateVisit { existing } => ApiError::DuplicateVisit {
                message: "A visit for this doctor is already recorded on this day".to_string(),
                existing: Box::new(VisitResponse::from(*existing)),
            },
            VisitError::Directory(e) => e.into(),
            VisitError::Port(e) => e.into(),
        }
    }
}

impl From<CoverageError> for ApiError {
    fn from(err: CoverageError) -> Self {
        match err {
            CoverageError::PlanNotFound(_) | CoverageError::DoctorNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            CoverageError::InvalidData(_) => ApiError::Validation(err.to_string()),
            CoverageError::NotAuthorized(_) => ApiError::Forbidden(err.to_string()),
            CoverageError::DuplicatePlan { .. } => ApiError::Conflict(err.to_string()),
            CoverageError::Directory(e) => e.into(),
            CoverageError::Port(e) => e.into(),
        }
    }
}

impl From<BeatError> for ApiError {
    fn from(err: BeatError) -> Self {
        match err {
            BeatError::PlanNotFound(_) => ApiError::NotFound(err.to_string()),
            BeatError::InvalidData(_) => ApiError::Validation(err.to_string()),
            BeatError::NotAuthorized(_) => ApiError::Forbidden(err.to_string()),
            BeatError::DuplicatePlan { .. } => ApiError::Conflict(err.to_string()),
            BeatError::Directory(e) => e.into(),
            BeatError::Port(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_errors_map_onto_the_four_client_categories() {
        let cases = [
            (PortError::not_found("Visit", "abc"), StatusCode::NOT_FOUND),
            (PortError::validation("bad"), StatusCode::BAD_REQUEST),
            (PortError::conflict("taken"), StatusCode::CONFLICT),
            (
                PortError::internal("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let api: ApiError = err.into();
            let response = api.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_coverage_duplicate_is_a_conflict() {
        let err = CoverageError::DuplicatePlan {
            doctor_id: "d".to_string(),
            month: "2024-06".to_string(),
        };
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::Conflict(_)));
    }
}
